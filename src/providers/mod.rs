//! Credential extraction strategies.
//!
//! The built-in strategies decode `[username, password]` pairs out of the
//! `Authorization` header ([`basic`]) or the request body ([`form`]).
//! Anything else implements [`Extract`] and registers as a custom provider.

pub mod basic;
pub mod form;

pub use basic::BasicOptions;
pub use form::FormOptions;

use crate::outcome::Extraction;
use axum::http::{HeaderMap, Uri};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Everything an extractor may look at, passed explicitly per request.
pub struct RequestContext<'a> {
    pub headers: &'a HeaderMap,
    pub uri: &'a Uri,

    /// Parsed urlencoded body fields, when the request carried any.
    pub form: Option<&'a HashMap<String, String>>,

    /// Free-form options from [`crate::middleware::Check::extra`], for
    /// custom providers.
    pub extra: &'a Map<String, Value>,
}

/// A custom credential-extraction strategy.
///
/// Implementations must be cheap and non-blocking; anything that needs I/O
/// belongs in the validator. The registry checks only that an extractor is
/// present, never what it does.
pub trait Extract: Send + Sync {
    fn extract(&self, ctx: &RequestContext<'_>) -> Extraction;
}

impl<F> Extract for F
where
    F: Fn(&RequestContext<'_>) -> Extraction + Send + Sync,
{
    fn extract(&self, ctx: &RequestContext<'_>) -> Extraction {
        self(ctx)
    }
}
