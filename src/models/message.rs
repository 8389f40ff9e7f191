use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;

use crate::error::{AppError, Result};

/// A persisted chat message.
#[derive(Debug, Clone)]
pub struct Message {
    /// The unique identifier for the message.
    pub id: i64,
    /// The ID of the author.
    pub user_id: i64,
    /// The author's username at send time.
    pub username: String,
    /// The message text.
    pub message: String,
    /// The timestamp when the message was stored.
    pub created_at: DateTime<Utc>,
}

impl TryFrom<&Row> for Message {
    type Error = AppError;

    fn try_from(row: &Row) -> Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            username: row.try_get("username")?,
            message: row.try_get("message")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// The shape clients see, both in history and in `new_message` broadcasts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicMessage {
    pub username: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl From<Message> for PublicMessage {
    fn from(message: Message) -> Self {
        Self {
            username: message.username,
            message: message.message,
            created_at: message.created_at,
        }
    }
}
