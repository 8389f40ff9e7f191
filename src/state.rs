use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::realtime::{ConnectionRegistry, Hub};
use crate::sessions::{MemorySessionStore, RedisSessionStore, SessionStore};
use crate::store::{ChatStore, MemoryStore, PgStore};

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// Users and the message log.
    pub store: Arc<dyn ChatStore>,
    /// HTTP sessions.
    pub sessions: Arc<dyn SessionStore>,
    /// Which live connection speaks for each user.
    pub registry: ConnectionRegistry,
    /// All open realtime connections.
    pub hub: Hub,
    /// The application's configuration.
    pub config: Config,
}

impl AppState {
    /// Creates a new `AppState`, connecting to PostgreSQL and Redis when they
    /// are configured and falling back to in-memory stores otherwise.
    ///
    /// # Arguments
    ///
    /// * `config` - The application's configuration.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `AppState`.
    pub async fn new(config: &Config) -> Result<Self> {
        let store: Arc<dyn ChatStore> = match &config.database_url {
            Some(url) => {
                let pool = crate::db::create_pool(url)?;
                crate::db::ensure_schema(&pool).await?;
                tracing::info!("✅ PostgreSQL Pool initialized with deadpool-postgres");
                Arc::new(PgStore::new(pool))
            }
            None => {
                tracing::warn!("⚠️ DATABASE_URL not set, users and messages are kept in memory");
                Arc::new(MemoryStore::new())
            }
        };

        let sessions: Arc<dyn SessionStore> = match &config.redis_url {
            Some(url) => {
                let sessions = RedisSessionStore::connect(url).await?;
                tracing::info!("✅ Redis Connection Manager initialized");
                Arc::new(sessions)
            }
            None => {
                tracing::warn!("⚠️ REDIS_URL not set, sessions are kept in memory");
                Arc::new(MemorySessionStore::new())
            }
        };

        Ok(Self::with_stores(config.clone(), store, sessions))
    }

    /// Builds the state around already constructed stores.
    pub fn with_stores(
        config: Config,
        store: Arc<dyn ChatStore>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        AppState {
            store,
            sessions,
            registry: ConnectionRegistry::new(),
            hub: Hub::new(),
            config,
        }
    }
}
