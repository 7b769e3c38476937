//! Pluggable authentication middleware for axum.
//!
//! Providers pair a credential extractor (HTTP Basic, form fields, or a
//! custom [`providers::Extract`] impl) with an async validator, registered
//! by name in a process-wide [`registry::AuthRegistry`]. The [`check`]
//! middleware enforces a provider per route, optionally short-circuiting
//! through a session store so validators do not re-run on every request.
//!
//! ```no_run
//! use std::sync::Arc;
//! use wicket::{AuthProvider, AuthRegistry, AuthState, Validation, check, protect};
//!
//! # async fn handler() -> &'static str { "ok" }
//! let registry = Arc::new(AuthRegistry::new());
//! AuthProvider::builder("basic")
//!     .validator(|creds| async move {
//!         if creds.str(0) == Some("alice") && creds.str(1) == Some("secret") {
//!             let mut principal = serde_json::Map::new();
//!             principal.insert("user".into(), "alice".into());
//!             Ok(Validation::authenticated(principal))
//!         } else {
//!             Ok(Validation::denied())
//!         }
//!     })
//!     .register(&registry)
//!     .unwrap();
//! registry.freeze();
//!
//! let state = AuthState::new(registry);
//! let router = axum::Router::new().route("/private", axum::routing::get(handler));
//! let app: axum::Router = protect(router, state, check("basic"));
//! ```

pub mod error;
pub mod middleware;
pub mod outcome;
pub mod providers;
pub mod registry;
pub mod state;

pub use error::AuthError;
pub use middleware::{AuthSession, Check, check, protect};
pub use outcome::{Credentials, Extraction, Outcome, Principal, Validation};
pub use providers::{BasicOptions, Extract, FormOptions, RequestContext};
pub use registry::{AuthProvider, AuthRegistry, Strategy};
pub use state::AuthState;

pub use wicket_session;
