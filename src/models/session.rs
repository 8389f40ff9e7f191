use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents an HTTP session.
///
/// Carries just enough identity for the realtime handshake: the browser reads
/// `user_id` and `username` from `/check-auth` and presents them over the socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// The ID of the user this session belongs to.
    pub user_id: i64,
    /// The username at login time.
    pub username: String,
    /// The timestamp when the session was created.
    pub created_at: DateTime<Utc>,
    /// The timestamp when the session expires.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Starts a session for `user_id` that lasts `duration_days`.
    pub fn new(user_id: i64, username: String, duration_days: i64) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            username,
            created_at: now,
            expires_at: now + chrono::Duration::days(duration_days),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}
