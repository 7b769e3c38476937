use axum::Router;
use axum::body::Body;
use axum::response::Response;
use axum::routing::get;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use http_body_util::BodyExt;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use wicket::{AuthProvider, AuthRegistry, AuthSession, AuthState, Check, Validation, protect};
use wicket_session::{MemoryStore, SessionConfig};

/// Registers `basic` and `form` providers that accept `alice/secret` and
/// `bob/hunter2`, counting validator invocations in `calls`.
pub fn registry(calls: Arc<AtomicUsize>) -> Arc<AuthRegistry> {
    let registry = Arc::new(AuthRegistry::new());

    for name in ["basic", "form"] {
        let calls = calls.clone();
        AuthProvider::builder(name)
            .validator(move |creds| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    let accepted = matches!(
                        (creds.str(0), creds.str(1)),
                        (Some("alice"), Some("secret")) | (Some("bob"), Some("hunter2"))
                    );
                    if accepted {
                        let mut principal = Map::new();
                        principal.insert(
                            "user".to_string(),
                            Value::String(creds.str(0).unwrap_or_default().to_string()),
                        );
                        Ok(Validation::authenticated(principal))
                    } else {
                        Ok(Validation::denied())
                    }
                }
            })
            .register(&registry)
            .unwrap();
    }

    registry.freeze();
    registry
}

pub fn state(calls: &Arc<AtomicUsize>) -> AuthState {
    AuthState::new(registry(calls.clone()))
}

pub fn session_state(calls: &Arc<AtomicUsize>) -> AuthState {
    state(calls).with_sessions(Arc::new(MemoryStore::new()), SessionConfig::default())
}

/// Protected handler echoing the authenticated user, or `anonymous` when the
/// gate let the request through without a principal.
pub async fn whoami(auth: AuthSession) -> String {
    auth.principal
        .as_ref()
        .and_then(|p| p.get("user"))
        .and_then(Value::as_str)
        .unwrap_or("anonymous")
        .to_string()
}

/// A router with `/private` guarded by the given check.
pub fn app(state: AuthState, check: Check) -> Router {
    protect(
        Router::new().route("/private", get(whoami).post(whoami)),
        state,
        check,
    )
}

pub fn basic_header(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

/// The session id pair (`name=value`) from the response's `Set-Cookie`.
pub fn session_cookie(response: &Response) -> String {
    let value = response
        .headers()
        .get(axum::http::header::SET_COOKIE)
        .expect("response carries no Set-Cookie")
        .to_str()
        .unwrap();
    value.split(';').next().unwrap().to_string()
}

pub async fn body_string(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn form_body(pairs: &[(&str, &str)]) -> Body {
    let encoded: String = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    Body::from(encoded)
}
