//! Durable users and messages.
//!
//! Handlers and the realtime layer only see [`ChatStore`]; the PostgreSQL
//! implementation is used in production and [`MemoryStore`] when no
//! `DATABASE_URL` is configured (and in tests).

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;

use crate::{
    error::Result,
    models::{message::Message, user::User},
};

/// Append/query store for accounts and the message log.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Creates a user. Fails with `AppError::Conflict` if the username is taken.
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Appends a message stamped with the current time.
    async fn append_message(&self, user_id: i64, username: &str, text: &str) -> Result<Message>;

    /// The `limit` most recent messages in ascending creation order.
    async fn recent_messages(&self, limit: usize) -> Result<Vec<Message>>;
}
