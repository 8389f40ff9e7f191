use async_trait::async_trait;
use deadpool_postgres::Pool;

use super::ChatStore;
use crate::{
    error::Result,
    models::{message::Message, user::User},
    repositories::{message as message_repo, user as user_repo},
};

/// [`ChatStore`] backed by PostgreSQL.
#[derive(Clone)]
pub struct PgStore {
    pool: Pool,
}

impl PgStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatStore for PgStore {
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User> {
        user_repo::create_user(&self.pool, username, password_hash).await
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        user_repo::find_by_username(&self.pool, username).await
    }

    async fn append_message(&self, user_id: i64, username: &str, text: &str) -> Result<Message> {
        message_repo::insert_message(&self.pool, user_id, username, text).await
    }

    async fn recent_messages(&self, limit: usize) -> Result<Vec<Message>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        message_repo::list_recent(&self.pool, limit).await
    }
}
