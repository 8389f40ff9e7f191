//! Per-connection handshake state machine.
//!
//! A connection starts out `Connected` and can only authenticate. Sending is
//! accepted only once it is `Authenticated` and still the registered
//! connection for its user.

use super::{
    CLOSE_SUPERSEDED, CLOSE_SUPERSEDED_REASON, ConnectionId,
    protocol::{self, AuthenticateRequest, ClientEvent, ServerEvent},
};
use crate::{error::AppError, services::chat as chat_service, state::AppState};

/// The identity a connection proved during its handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    pub username: String,
}

impl Identity {
    fn from_request(request: AuthenticateRequest) -> Option<Self> {
        let user_id = request.user_id.filter(|id| *id > 0)?;
        let username = request.username.filter(|name| !name.trim().is_empty())?;
        Some(Self { user_id, username })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Authenticated(Identity),
}

/// One live realtime connection.
pub struct Connection {
    id: ConnectionId,
    state: ConnectionState,
    app: AppState,
}

impl Connection {
    /// Wraps a connection id previously handed out by the hub.
    pub fn new(id: ConnectionId, app: AppState) -> Self {
        Self {
            id,
            state: ConnectionState::Connected,
            app,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Handles one text frame from the client.
    pub async fn handle_text(&mut self, text: &str) {
        match protocol::decode(text) {
            Ok(event) => self.handle_event(event).await,
            Err(e) => {
                tracing::debug!(connection_id = self.id, error = %e, "Malformed realtime event");
                self.reply(&ServerEvent::error("Malformed event")).await;
            }
        }
    }

    pub async fn handle_event(&mut self, event: ClientEvent) {
        match event {
            ClientEvent::Authenticate(request) => match &self.state {
                ConnectionState::Connected => self.authenticate(request).await,
                ConnectionState::Authenticated(identity) => {
                    tracing::debug!(
                        connection_id = self.id,
                        user_id = identity.user_id,
                        "Repeated handshake ignored"
                    );
                    self.reply(&ServerEvent::auth_error("Already authenticated"))
                        .await;
                }
            },
            ClientEvent::SendMessage(request) => match &self.state {
                ConnectionState::Connected => {
                    tracing::warn!(connection_id = self.id, "send_message before handshake rejected");
                    self.reply(&ServerEvent::error("Not authenticated")).await;
                }
                ConnectionState::Authenticated(identity) => {
                    let identity = identity.clone();
                    self.send_message(&identity, &request.message).await;
                }
            },
        }
    }

    async fn authenticate(&mut self, request: AuthenticateRequest) {
        let Some(identity) = Identity::from_request(request) else {
            tracing::warn!(connection_id = self.id, "Handshake with missing identity");
            self.reply(&ServerEvent::auth_error("Invalid authentication data"))
                .await;
            return;
        };

        if let Some(superseded) = self
            .app
            .registry
            .register(identity.user_id, self.id)
            .await
        {
            tracing::info!(
                user_id = identity.user_id,
                connection_id = self.id,
                superseded,
                "Newer handshake supersedes previous connection"
            );
            self.app
                .hub
                .terminate(superseded, CLOSE_SUPERSEDED, CLOSE_SUPERSEDED_REASON)
                .await;
        }

        tracing::info!(
            user_id = identity.user_id,
            username = %identity.username,
            connection_id = self.id,
            "✅ Realtime connection authenticated"
        );

        self.state = ConnectionState::Authenticated(identity);
        self.reply(&ServerEvent::Authenticated { success: true }).await;
    }

    async fn send_message(&self, identity: &Identity, text: &str) {
        if self.app.registry.lookup(identity.user_id).await != Some(self.id) {
            tracing::warn!(
                user_id = identity.user_id,
                connection_id = self.id,
                "Send from superseded connection rejected"
            );
            self.reply(&ServerEvent::error("Connection superseded")).await;
            return;
        }

        match chat_service::post_message(
            self.app.store.as_ref(),
            identity.user_id,
            &identity.username,
            text,
        )
        .await
        {
            Ok(message) => {
                let delivered = self
                    .app
                    .hub
                    .broadcast(&ServerEvent::NewMessage(message.into()))
                    .await;
                tracing::debug!(user_id = identity.user_id, delivered, "Message broadcast");
            }
            Err(AppError::Validation(msg)) => {
                self.reply(&ServerEvent::error(msg)).await;
            }
            Err(e) => {
                if e.is_infrastructure() {
                    tracing::error!(user_id = identity.user_id, error = %e, "❌ Failed to store message");
                } else {
                    tracing::warn!(user_id = identity.user_id, error = %e, "Message rejected");
                }
                self.reply(&ServerEvent::error("Failed to send message")).await;
            }
        }
    }

    /// Releases everything this connection holds. Only removes the registry
    /// binding if it still points at this connection.
    pub async fn disconnect(self) {
        if let ConnectionState::Authenticated(identity) = &self.state {
            let removed = self
                .app
                .registry
                .unregister(identity.user_id, self.id)
                .await;
            if !removed {
                tracing::debug!(
                    user_id = identity.user_id,
                    connection_id = self.id,
                    "Stale disconnect left newer binding in place"
                );
            }
        }
        self.app.hub.detach(self.id).await;
        tracing::info!(connection_id = self.id, "Realtime connection closed");
    }

    async fn reply(&self, event: &ServerEvent) {
        self.app.hub.send(self.id, event).await;
    }
}
