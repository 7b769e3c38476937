//! In-memory session store.
//!
//! Suitable for tests and single-process deployments. Entries expire lazily:
//! a lookup past the deadline reads as absent, and saves sweep expired
//! entries out of the map.

use crate::store::{Session, SessionError, SessionStore};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Process-local session store backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

#[derive(Debug)]
struct Entry {
    data: Map<String, Value>,
    expires_at: Instant,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sweep(entries: &mut HashMap<String, Entry>) {
        let now = Instant::now();
        entries.retain(|_, entry| entry.expires_at > now);
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load(&self, id: &str) -> Result<Option<Session>, SessionError> {
        let entries = self.entries.read().expect("session map poisoned");

        Ok(entries
            .get(id)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| Session {
                id: id.to_string(),
                data: entry.data.clone(),
            }))
    }

    async fn save(&self, session: &Session, ttl: Duration) -> Result<(), SessionError> {
        let mut entries = self.entries.write().expect("session map poisoned");
        Self::sweep(&mut entries);

        entries.insert(
            session.id.clone(),
            Entry {
                data: session.data.clone(),
                expires_at: Instant::now() + ttl,
            },
        );

        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), SessionError> {
        self.entries
            .write()
            .expect("session map poisoned")
            .remove(id);

        Ok(())
    }
}
