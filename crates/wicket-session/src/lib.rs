//! # Wicket Session
//!
//! Session persistence for the wicket authentication middleware.
//!
//! This crate provides:
//! - The [`SessionStore`] contract the middleware talks to
//! - An in-memory store for tests and single-process deployments
//! - A Redis-backed store for anything else
//! - Session cookie helpers (read, set, clear)
//! - Per-session-id locking so concurrent requests for the same browser
//!   session cannot race each other's writes
//! - Session configuration from environment variables
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use wicket_session::{RedisStore, SessionConfig, SessionStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = SessionConfig::from_env();
//!     let store = RedisStore::connect(&config.redis_url, &config.key_prefix)
//!         .await
//!         .unwrap();
//!
//!     let session = wicket_session::Session::new();
//!     store.save(&session, config.ttl()).await.unwrap();
//! }
//! ```

pub mod config;
pub mod cookie;
pub mod locks;
pub mod memory;
pub mod redis;
pub mod store;

pub use config::SessionConfig;
pub use locks::SessionLocks;
pub use memory::MemoryStore;
pub use redis::RedisStore;
pub use store::{Session, SessionError, SessionStore};
