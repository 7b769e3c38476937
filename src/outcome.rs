//! Extraction and validation results, and the response resolver.

use axum::Json;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::{Map, Value, json};

/// Authenticated identity data produced by a validator.
pub type Principal = Map<String, Value>;

/// Ordered credential values handed from an extractor to a validator.
///
/// The built-in strategies produce `[username, password]`; custom extractors
/// may produce any shape their validator understands.
#[derive(Clone, Debug, Default)]
pub struct Credentials(pub Vec<Value>);

impl Credentials {
    /// A `[username, password]` pair, the shape Basic and Form produce.
    pub fn pair(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self(vec![
            Value::String(username.into()),
            Value::String(password.into()),
        ])
    }

    /// The value at `index` as a string slice, if present and textual.
    pub fn str(&self, index: usize) -> Option<&str> {
        self.0.get(index).and_then(Value::as_str)
    }
}

/// What an extractor made of the raw request.
#[derive(Clone, Debug)]
pub enum Extraction {
    /// Credentials parsed; invoke the validator with them.
    Continue(Credentials),

    /// Credentials absent or malformed; the validator is never called.
    ///
    /// A `status` of `None` is a silent non-match (for Basic, a foreign
    /// scheme) as opposed to a malformed credential carrying 400/401. The
    /// distinction is preserved here; the resolver only falls back to 401
    /// when it has to build a response.
    Reject {
        status: Option<StatusCode>,
        message: Option<String>,
    },
}

impl Extraction {
    pub fn reject(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Reject {
            status: Some(status),
            message: Some(message.into()),
        }
    }

    /// A rejection with no status code attached.
    pub fn reject_silent(message: impl Into<String>) -> Self {
        Self::Reject {
            status: None,
            message: Some(message.into()),
        }
    }
}

/// The verdict of a user-supplied validator.
#[derive(Clone, Debug, Default)]
pub struct Validation {
    /// `None` means authentication failed, whatever else is set.
    pub principal: Option<Principal>,

    /// Failure status override; 401 when unset.
    pub status: Option<StatusCode>,

    pub message: Option<String>,
}

impl Validation {
    pub fn authenticated(principal: Principal) -> Self {
        Self {
            principal: Some(principal),
            status: None,
            message: None,
        }
    }

    /// Plain denial; resolves to 401.
    pub fn denied() -> Self {
        Self::default()
    }

    pub fn denied_with(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            principal: None,
            status: Some(status),
            message: Some(message.into()),
        }
    }
}

/// Net result of one enforcement pass, fed to [`resolve`].
#[derive(Clone, Debug)]
pub enum Outcome {
    Success,
    Failure {
        status: Option<StatusCode>,
        message: Option<String>,
    },
}

impl Outcome {
    /// A bare failure carrying neither status nor message.
    pub fn failure() -> Self {
        Self::Failure {
            status: None,
            message: None,
        }
    }
}

/// What the middleware should do with the request pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// 302 to the given location; the downstream handler never runs.
    Redirect(String),

    /// Respond with the status and optional message; the pipeline halts.
    Deny(StatusCode, Option<String>),

    /// Let the request continue to the protected handler.
    Continue,
}

/// Resolves an outcome against the configured redirect targets.
///
/// The asymmetry is deliberate: a redirect always halts the pipeline, a
/// status-only failure halts, and a status-only success continues to the
/// protected handler.
pub fn resolve(
    outcome: &Outcome,
    failure_url: Option<&str>,
    success_url: Option<&str>,
) -> Disposition {
    match outcome {
        Outcome::Success => match success_url {
            Some(url) => Disposition::Redirect(url.to_string()),
            None => Disposition::Continue,
        },
        Outcome::Failure { status, message } => match failure_url {
            Some(url) => Disposition::Redirect(url.to_string()),
            None => Disposition::Deny(status.unwrap_or(StatusCode::UNAUTHORIZED), message.clone()),
        },
    }
}

impl Disposition {
    /// Builds the halting response for `Redirect` and `Deny`. `Continue` has
    /// no response of its own; the caller runs the rest of the chain.
    ///
    /// Denials carry a JSON `{"error": …}` body, never a stack trace.
    pub fn into_response(self) -> Option<Response> {
        match self {
            Disposition::Redirect(url) => {
                Some((StatusCode::FOUND, [(header::LOCATION, url)]).into_response())
            }
            Disposition::Deny(status, message) => {
                let message = message.unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("Unauthorized")
                        .to_string()
                });
                Some((status, Json(json!({ "error": message }))).into_response())
            }
            Disposition::Continue => None,
        }
    }
}
