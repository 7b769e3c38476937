//! Redis-backed session store.
//!
//! Sessions are stored as JSON strings under `<prefix>:session:<id>` with a
//! TTL refreshed on every save (sliding expiry via `SETEX`).

use crate::store::{Session, SessionError, SessionStore};
use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use std::time::Duration;
use tracing::{debug, instrument};

/// Session store backed by Redis with automatic reconnection.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    key_prefix: String,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Connects to Redis.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Backend` if the connection cannot be
    /// established.
    pub async fn connect(
        redis_url: &str,
        key_prefix: impl Into<String>,
    ) -> Result<Self, SessionError> {
        let client = Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;

        Ok(Self {
            conn,
            key_prefix: key_prefix.into(),
        })
    }

    fn key(&self, id: &str) -> String {
        format!("{}:session:{}", self.key_prefix, id)
    }
}

#[async_trait]
impl SessionStore for RedisStore {
    #[instrument(skip(self), fields(session.op = "GET"))]
    async fn load(&self, id: &str) -> Result<Option<Session>, SessionError> {
        let mut conn = self.conn.clone();

        let raw: Option<String> = conn.get(self.key(id)).await?;
        match raw {
            Some(json) => {
                let data = serde_json::from_str(&json)?;
                debug!(session.id = %id, "session loaded");
                Ok(Some(Session {
                    id: id.to_string(),
                    data,
                }))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self, session), fields(session.op = "SETEX"))]
    async fn save(&self, session: &Session, ttl: Duration) -> Result<(), SessionError> {
        let mut conn = self.conn.clone();
        let json = serde_json::to_string(&session.data)?;

        conn.set_ex::<_, _, ()>(self.key(&session.id), json, ttl.as_secs())
            .await?;

        debug!(session.id = %session.id, session.ttl_secs = %ttl.as_secs(), "session saved");

        Ok(())
    }

    #[instrument(skip(self), fields(session.op = "DEL"))]
    async fn delete(&self, id: &str) -> Result<(), SessionError> {
        let mut conn = self.conn.clone();

        conn.del::<_, ()>(self.key(id)).await?;

        debug!(session.id = %id, "session deleted");

        Ok(())
    }
}
