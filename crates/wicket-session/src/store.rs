//! The session store contract.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::time::Duration;

/// A single browser session: an opaque id plus a free-form JSON data bag.
///
/// The authentication middleware keeps its durable record under a reserved
/// key inside `data`; everything else in the bag belongs to the application.
#[derive(Clone, Debug)]
pub struct Session {
    pub id: String,
    pub data: Map<String, Value>,
}

impl Session {
    /// Creates an empty session with a fresh random id.
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            data: Map::new(),
        }
    }

    /// Creates an empty session bound to an existing id.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data: Map::new(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Error type for session store operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session backend error: {0}")]
    Backend(#[from] redis::RedisError),

    #[error("session serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Durable storage for session data, keyed by session id.
///
/// Implementations are shared across requests behind an `Arc`. Serializing
/// read-modify-write cycles for a single session id is the caller's job, via
/// [`crate::SessionLocks`]; stores only guarantee that individual operations
/// are atomic.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Loads a session by id. `Ok(None)` when the id is unknown or expired.
    async fn load(&self, id: &str) -> Result<Option<Session>, SessionError>;

    /// Persists the session, refreshing its TTL.
    async fn save(&self, session: &Session, ttl: Duration) -> Result<(), SessionError>;

    /// Removes the session entirely.
    async fn delete(&self, id: &str) -> Result<(), SessionError>;
}
