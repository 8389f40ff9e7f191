use std::time::Duration;

use axum::{
    extract::{
        State,
        ws::{CloseFrame, Message as WsMessage, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt, stream::SplitSink};

use crate::{
    realtime::{Connection, ConnectionId, Outbound, OutboundReceiver},
    state::AppState,
};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// GET /ws
///
/// Upgrades without any authentication; the connection has to complete the
/// `authenticate` handshake before it may send.
pub async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (id, rx) = state.hub.attach().await;
    tracing::info!(connection_id = id, "Realtime connection opened");

    let (ws_sender, mut ws_receiver) = socket.split();
    let mut send_task = tokio::spawn(write_loop(ws_sender, rx, id));
    let mut connection = Connection::new(id, state);

    loop {
        tokio::select! {
            _ = &mut send_task => {
                tracing::debug!(connection_id = id, "Writer finished, closing reader");
                break;
            }
            frame = ws_receiver.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => connection.handle_text(text.as_str()).await,
                Some(Ok(WsMessage::Close(frame))) => {
                    tracing::debug!(connection_id = id, reason = ?frame, "Client initiated close");
                    break;
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    tracing::warn!(connection_id = id, error = %e, "WebSocket receive error");
                    break;
                }
                None => break,
            },
        }
    }

    send_task.abort();
    connection.disconnect().await;
}

/// Drains the outbound queue into the socket and keeps the peer alive with pings.
async fn write_loop(
    mut ws_sender: SplitSink<WebSocket, WsMessage>,
    mut rx: OutboundReceiver,
    id: ConnectionId,
) {
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    // first tick fires immediately
    heartbeat.tick().await;

    loop {
        tokio::select! {
            outbound = rx.recv() => match outbound {
                Some(Outbound::Text(frame)) => {
                    if ws_sender.send(WsMessage::Text(frame.to_string().into())).await.is_err() {
                        break;
                    }
                }
                Some(Outbound::Close { code, reason }) => {
                    tracing::info!(connection_id = id, code, reason, "Closing connection");
                    let _ = ws_sender
                        .send(WsMessage::Close(Some(CloseFrame {
                            code,
                            reason: reason.into(),
                        })))
                        .await;
                    break;
                }
                None => break,
            },
            _ = heartbeat.tick() => {
                if ws_sender.send(WsMessage::Ping(Default::default())).await.is_err() {
                    break;
                }
            }
        }
    }
}
