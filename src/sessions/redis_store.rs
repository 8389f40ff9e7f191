use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};
use uuid::Uuid;

use super::SessionStore;
use crate::{
    error::{AppError, Result},
    models::session::Session,
};

/// [`SessionStore`] keeping `session:{id}` keys in Redis with an expiry.
#[derive(Clone)]
pub struct RedisSessionStore {
    redis: ConnectionManager,
}

impl RedisSessionStore {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let redis = ConnectionManager::new(client).await?;
        Ok(Self { redis })
    }
}

fn key(id: Uuid) -> String {
    format!("session:{}", id)
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn save(&self, id: Uuid, session: &Session, ttl_secs: u64) -> Result<()> {
        let session_json = sonic_rs::to_string(session)
            .map_err(|e| AppError::Internal(format!("Session serialization failed: {}", e)))?;

        let mut redis = self.redis.clone();
        let _: () = redis
            .set_ex(key(id), &session_json, ttl_secs)
            .await
            .map_err(|e| {
                tracing::error!("❌ Redis set_ex failed: {}", e);
                AppError::Redis(e)
            })?;

        tracing::debug!("✅ Session saved to Redis: session:{}", id);
        Ok(())
    }

    async fn load(&self, id: Uuid) -> Result<Option<Session>> {
        let mut redis = self.redis.clone();
        let session_json: Option<String> = redis.get(key(id)).await?;

        match session_json {
            Some(json) => match sonic_rs::from_str::<Session>(&json) {
                Ok(session) => Ok(Some(session)),
                Err(e) => {
                    tracing::warn!("❌ Invalid session JSON for session:{}: {}", id, e);
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    async fn destroy(&self, id: Uuid) -> Result<()> {
        let mut redis = self.redis.clone();
        let _: () = redis.del(key(id)).await?;
        tracing::debug!("✅ Session deleted from Redis: session:{}", id);
        Ok(())
    }
}
