use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{
    Mutex,
    mpsc::{self, error::TrySendError},
};

use super::{ConnectionId, protocol::ServerEvent};

/// Frames a connection may have queued before it is treated as stalled.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;

/// Instructions for a connection's writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// An encoded event to send as a text frame.
    Text(Arc<str>),
    /// Send a close frame and stop writing.
    Close { code: u16, reason: &'static str },
}

pub type OutboundReceiver = mpsc::Receiver<Outbound>;

type Connections = HashMap<ConnectionId, mpsc::Sender<Outbound>>;

/// Every open transport connection, authenticated or not.
///
/// Broadcasts go to all of them; reading the chat does not require the
/// realtime handshake, only sending does. A connection whose queue is full
/// is dropped from the hub, which ends its writer once the queue drains.
#[derive(Clone)]
pub struct Hub {
    next_id: Arc<AtomicU64>,
    connections: Arc<Mutex<Connections>>,
    capacity: usize,
}

impl Default for Hub {
    fn default() -> Self {
        Self::with_capacity(OUTBOUND_QUEUE_CAPACITY)
    }
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            next_id: Arc::new(AtomicU64::new(0)),
            connections: Arc::new(Mutex::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Allocates a connection id and the queue its writer drains.
    pub async fn attach(&self) -> (ConnectionId, OutboundReceiver) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = mpsc::channel(self.capacity);
        self.connections.lock().await.insert(id, tx);
        (id, rx)
    }

    pub async fn detach(&self, id: ConnectionId) {
        self.connections.lock().await.remove(&id);
    }

    /// Sends `event` to one connection. Returns `false` if it is gone or stalled.
    pub async fn send(&self, id: ConnectionId, event: &ServerEvent) -> bool {
        let Some(frame) = encode(event) else {
            return false;
        };
        let mut connections = self.connections.lock().await;
        let result = match connections.get(&id) {
            Some(tx) => tx.try_send(Outbound::Text(frame)),
            None => return false,
        };
        match result {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                drop_stalled(&mut connections, id);
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Sends `event` to every open connection and returns how many accepted it.
    pub async fn broadcast(&self, event: &ServerEvent) -> usize {
        let Some(frame) = encode(event) else {
            return 0;
        };
        let mut connections = self.connections.lock().await;
        let mut delivered = 0;
        let mut stalled = Vec::new();

        for (id, tx) in connections.iter() {
            match tx.try_send(Outbound::Text(frame.clone())) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => stalled.push(*id),
                Err(TrySendError::Closed(_)) => {}
            }
        }
        for id in stalled {
            drop_stalled(&mut connections, id);
        }

        delivered
    }

    /// Forcibly closes a connection. It stops receiving broadcasts immediately;
    /// its own disconnect handling runs once the socket is torn down.
    pub async fn terminate(&self, id: ConnectionId, code: u16, reason: &'static str) -> bool {
        match self.connections.lock().await.remove(&id) {
            // a full queue still ends the writer once the sender is dropped
            Some(tx) => tx.try_send(Outbound::Close { code, reason }).is_ok(),
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.connections.lock().await.len()
    }
}

fn drop_stalled(connections: &mut Connections, id: ConnectionId) {
    if connections.remove(&id).is_some() {
        tracing::warn!(connection_id = id, "Outbound queue full, dropping slow connection");
    }
}

fn encode(event: &ServerEvent) -> Option<Arc<str>> {
    match event.encode() {
        Ok(frame) => Some(Arc::from(frame)),
        Err(e) => {
            tracing::error!("Failed to encode server event: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(outbound: Outbound) -> String {
        match outbound {
            Outbound::Text(frame) => frame.to_string(),
            other => panic!("expected text frame, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn attach_allocates_unique_ids() {
        let hub = Hub::new();
        let (a, _rx_a) = hub.attach().await;
        let (b, _rx_b) = hub.attach().await;
        assert_ne!(a, b);
        assert_eq!(hub.len().await, 2);

        hub.detach(a).await;
        assert_eq!(hub.len().await, 1);
    }

    #[tokio::test]
    async fn broadcast_reaches_every_connection() {
        let hub = Hub::new();
        let (_a, mut rx_a) = hub.attach().await;
        let (_b, mut rx_b) = hub.attach().await;

        let delivered = hub.broadcast(&ServerEvent::error("hello")).await;
        assert_eq!(delivered, 2);

        let expected = r#"{"event":"error","data":{"message":"hello"}}"#;
        assert_eq!(text(rx_a.recv().await.unwrap()), expected);
        assert_eq!(text(rx_b.recv().await.unwrap()), expected);
    }

    #[tokio::test]
    async fn send_targets_one_connection() {
        let hub = Hub::new();
        let (a, mut rx_a) = hub.attach().await;
        let (_b, mut rx_b) = hub.attach().await;

        assert!(hub.send(a, &ServerEvent::error("only a")).await);
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());

        assert!(!hub.send(999, &ServerEvent::error("nobody")).await);
    }

    #[tokio::test]
    async fn stalled_reader_is_dropped() {
        let hub = Hub::with_capacity(2);
        let (_slow, mut rx_slow) = hub.attach().await;
        let (_fast, mut rx_fast) = hub.attach().await;

        for n in 0..2 {
            assert_eq!(hub.broadcast(&ServerEvent::error(format!("m{}", n))).await, 2);
            rx_fast.recv().await.unwrap();
        }

        // the slow reader's queue is full now
        assert_eq!(hub.broadcast(&ServerEvent::error("m2")).await, 1);
        assert_eq!(hub.len().await, 1);

        // it still drains what was queued, then sees the end of the stream
        assert!(rx_slow.recv().await.is_some());
        assert!(rx_slow.recv().await.is_some());
        assert!(rx_slow.recv().await.is_none());
        assert!(rx_fast.recv().await.is_some());
    }

    #[tokio::test]
    async fn terminate_closes_and_stops_broadcasts() {
        let hub = Hub::new();
        let (a, mut rx_a) = hub.attach().await;
        let (_b, _rx_b) = hub.attach().await;

        assert!(hub.terminate(a, 4000, "superseded").await);
        assert_eq!(
            rx_a.recv().await,
            Some(Outbound::Close {
                code: 4000,
                reason: "superseded"
            })
        );

        assert_eq!(hub.broadcast(&ServerEvent::error("after")).await, 1);
        assert!(rx_a.try_recv().is_err());

        // already gone
        assert!(!hub.terminate(a, 4000, "superseded").await);
    }
}
