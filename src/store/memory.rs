use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::ChatStore;
use crate::{
    error::{AppError, Result},
    models::{message::Message, user::User},
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    messages: Vec<Message>,
}

/// In-process [`ChatStore`]. Ids start at 1 and follow insertion order.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChatStore for MemoryStore {
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User> {
        let mut tables = self.tables.lock().await;

        if tables.users.iter().any(|u| u.username == username) {
            return Err(AppError::Conflict("Username already exists".to_string()));
        }

        let user = User {
            id: tables.users.len() as i64 + 1,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.username == username).cloned())
    }

    async fn append_message(&self, user_id: i64, username: &str, text: &str) -> Result<Message> {
        let mut tables = self.tables.lock().await;

        let message = Message {
            id: tables.messages.len() as i64 + 1,
            user_id,
            username: username.to_string(),
            message: text.to_string(),
            created_at: Utc::now(),
        };
        tables.messages.push(message.clone());
        Ok(message)
    }

    async fn recent_messages(&self, limit: usize) -> Result<Vec<Message>> {
        let tables = self.tables.lock().await;

        let mut recent: Vec<Message> = tables.messages.clone();
        recent.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        let skip = recent.len().saturating_sub(limit);
        Ok(recent.split_off(skip))
    }
}
