use crate::registry::AuthRegistry;
use std::sync::Arc;
use std::time::Duration;
use wicket_session::{SessionConfig, SessionLocks, SessionStore};

/// Shared state for the enforcement middleware: the provider registry plus
/// an optional session collaborator.
#[derive(Clone)]
pub struct AuthState {
    pub registry: Arc<AuthRegistry>,
    pub sessions: Option<Sessions>,
}

impl AuthState {
    /// State without session persistence; every request re-validates.
    pub fn new(registry: Arc<AuthRegistry>) -> Self {
        Self {
            registry,
            sessions: None,
        }
    }

    /// Attaches a session store so authenticated principals survive across
    /// requests.
    pub fn with_sessions(mut self, store: Arc<dyn SessionStore>, config: SessionConfig) -> Self {
        self.sessions = Some(Sessions::new(store, config));
        self
    }
}

/// A session store plus the bookkeeping the middleware needs around it.
#[derive(Clone)]
pub struct Sessions {
    pub store: Arc<dyn SessionStore>,
    pub config: SessionConfig,
    pub(crate) locks: SessionLocks,
}

impl Sessions {
    pub fn new(store: Arc<dyn SessionStore>, config: SessionConfig) -> Self {
        Self {
            store,
            config,
            locks: SessionLocks::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.config.ttl()
    }
}
