use chrono::{DateTime, Utc};
use tokio_postgres::Row;

use crate::error::{AppError, Result};

/// Represents a registered account.
#[derive(Clone, Debug)]
pub struct User {
    /// The unique identifier for the user.
    pub id: i64,
    /// The user's username.
    pub username: String,
    /// The user's hashed password (PHC string).
    pub password_hash: String,
    /// The timestamp when the user was created.
    pub created_at: DateTime<Utc>,
}

impl TryFrom<&Row> for User {
    type Error = AppError;

    fn try_from(row: &Row) -> Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            password_hash: row.try_get("password")?,
            created_at: row.try_get("created_at")?,
        })
    }
}
