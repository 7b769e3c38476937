//! Session configuration.
//!
//! Settings for the session collaborator, loaded from environment variables.

use std::env;
use std::time::Duration;

/// Session configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `REDIS_URL`: Redis connection URL (default: `redis://127.0.0.1:6379`)
/// - `SESSION_TTL_SECONDS`: sliding session lifetime in seconds (default: `1800`)
/// - `SESSION_COOKIE`: name of the cookie carrying the session id (default: `wicket_session`)
/// - `SESSION_PREFIX`: key prefix for the Redis store (default: `wicket`)
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Redis connection URL.
    pub redis_url: String,

    /// Sliding time-to-live for sessions in seconds. Refreshed on every save.
    pub ttl_seconds: u64,

    /// Name of the cookie carrying the session id.
    pub cookie_name: String,

    /// Prefix for session keys to avoid collisions with other tenants.
    pub key_prefix: String,
}

impl SessionConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            redis_url: env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into()),
            ttl_seconds: env::var("SESSION_TTL_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1800),
            cookie_name: env::var("SESSION_COOKIE").unwrap_or_else(|_| "wicket_session".into()),
            key_prefix: env::var("SESSION_PREFIX").unwrap_or_else(|_| "wicket".into()),
        }
    }

    /// The session lifetime as a [`Duration`].
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379".into(),
            ttl_seconds: 1800,
            cookie_name: "wicket_session".into(),
            key_prefix: "wicket".into(),
        }
    }
}
