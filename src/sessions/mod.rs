//! Server-side storage for HTTP sessions keyed by the `session_id` cookie.

mod memory;
mod redis_store;

pub use self::memory::MemorySessionStore;
pub use self::redis_store::RedisSessionStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{error::Result, models::session::Session};

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Saves `session` under `id` for `ttl_secs` seconds.
    async fn save(&self, id: Uuid, session: &Session, ttl_secs: u64) -> Result<()>;

    async fn load(&self, id: Uuid) -> Result<Option<Session>>;

    /// Removes the session. Unknown ids are not an error.
    async fn destroy(&self, id: Uuid) -> Result<()>;
}
