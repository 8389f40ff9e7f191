use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::SessionStore;
use crate::{error::Result, models::session::Session};

/// In-process [`SessionStore`]. Expiry is enforced by `Session::expires_at`
/// when the session is read, not by a background sweep.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<Uuid, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn save(&self, id: Uuid, session: &Session, _ttl_secs: u64) -> Result<()> {
        self.sessions.lock().await.insert(id, session.clone());
        Ok(())
    }

    async fn load(&self, id: Uuid) -> Result<Option<Session>> {
        Ok(self.sessions.lock().await.get(&id).cloned())
    }

    async fn destroy(&self, id: Uuid) -> Result<()> {
        self.sessions.lock().await.remove(&id);
        Ok(())
    }
}
