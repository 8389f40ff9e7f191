use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use super::ConnectionId;

/// Maps each user to the one live connection that currently speaks for them.
///
/// Cloning is cheap and every clone sees the same map. All mutations go
/// through a single lock so two handshakes for the same user can never both
/// end up registered.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    bindings: Arc<Mutex<HashMap<i64, ConnectionId>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `user_id` to `connection_id`.
    ///
    /// Returns the connection this one replaced, if any; the caller is
    /// responsible for terminating it. Re-registering the connection that is
    /// already bound is a no-op and returns `None`.
    pub async fn register(&self, user_id: i64, connection_id: ConnectionId) -> Option<ConnectionId> {
        let mut bindings = self.bindings.lock().await;
        match bindings.insert(user_id, connection_id) {
            Some(previous) if previous != connection_id => Some(previous),
            _ => None,
        }
    }

    /// Removes the binding for `user_id`, but only while it still names
    /// `connection_id`. A disconnect from a superseded connection must not
    /// evict the connection that replaced it.
    pub async fn unregister(&self, user_id: i64, connection_id: ConnectionId) -> bool {
        let mut bindings = self.bindings.lock().await;
        if bindings.get(&user_id) == Some(&connection_id) {
            bindings.remove(&user_id);
            true
        } else {
            false
        }
    }

    pub async fn lookup(&self, user_id: i64) -> Option<ConnectionId> {
        self.bindings.lock().await.get(&user_id).copied()
    }

    /// Number of users with a bound connection.
    pub async fn len(&self) -> usize {
        self.bindings.lock().await.len()
    }
}
