mod common;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::routing::get;
use common::*;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tower::ServiceExt;
use wicket::{check, protect};

fn get_private(auth: Option<&str>, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri("/private");
    if let Some(value) = auth {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    if let Some(value) = cookie {
        builder = builder.header(header::COOKIE, value);
    }
    builder.body(Body::empty()).unwrap()
}

fn post_form(pairs: &[(&str, &str)], cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/private")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(value) = cookie {
        builder = builder.header(header::COOKIE, value);
    }
    builder.body(form_body(pairs)).unwrap()
}

#[tokio::test]
async fn basic_credentials_reach_the_handler() {
    let calls = Arc::new(AtomicUsize::new(0));
    let app = app(state(&calls), check("basic"));

    let response = app
        .oneshot(get_private(Some(&basic_header("alice", "secret")), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "alice");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn missing_header_denies_with_401_json() {
    let calls = Arc::new(AtomicUsize::new(0));
    let app = app(state(&calls), check("basic"));

    let response = app.oneshot(get_private(None, None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["error"], "No Authorization header found");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn invalid_base64_denies_with_400() {
    let calls = Arc::new(AtomicUsize::new(0));
    let app = app(state(&calls), check("basic"));

    let response = app
        .oneshot(get_private(Some("Basic ???"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn foreign_scheme_denies_without_calling_the_validator() {
    let calls = Arc::new(AtomicUsize::new(0));
    let app = app(state(&calls), check("basic"));

    let response = app
        .oneshot(get_private(Some("Bearer abc123"), None))
        .await
        .unwrap();

    // The rejection itself carries no status; the resolver defaults to 401.
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["error"], "Header is not Basic Authorization");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn wrong_password_denies_after_one_validator_call() {
    let calls = Arc::new(AtomicUsize::new(0));
    let app = app(state(&calls), check("basic"));

    let response = app
        .oneshot(get_private(Some(&basic_header("alice", "wrong")), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unregistered_provider_denies_with_500() {
    let calls = Arc::new(AtomicUsize::new(0));
    let app = app(state(&calls), check("ldap"));

    let response = app
        .oneshot(get_private(Some(&basic_header("alice", "secret")), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn session_shortcut_skips_the_validator() {
    let calls = Arc::new(AtomicUsize::new(0));
    let state = session_state(&calls);

    let login = app(state.clone(), check("basic"))
        .oneshot(get_private(Some(&basic_header("alice", "secret")), None))
        .await
        .unwrap();
    assert_eq!(login.status(), StatusCode::OK);
    let cookie = session_cookie(&login);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Replay the cookie with no credentials at all.
    let replay = app(state, check("basic"))
        .oneshot(get_private(None, Some(&cookie)))
        .await
        .unwrap();

    assert_eq!(replay.status(), StatusCode::OK);
    assert_eq!(body_string(replay).await, "alice");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn without_session_revalidates_every_request() {
    let calls = Arc::new(AtomicUsize::new(0));
    let state = session_state(&calls);
    let auth = basic_header("alice", "secret");

    for _ in 0..2 {
        let response = app(state.clone(), check("basic").without_session())
            .oneshot(get_private(Some(&auth), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn failure_url_wins_over_the_default_status() {
    let calls = Arc::new(AtomicUsize::new(0));
    let app = app(state(&calls), check("basic").failure_url("/login"));

    let response = app.oneshot(get_private(None, None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/login"
    );
}

#[tokio::test]
async fn success_url_redirects_instead_of_running_the_handler() {
    let calls = Arc::new(AtomicUsize::new(0));
    let app = app(state(&calls), check("basic").success_url("/home"));

    let response = app
        .oneshot(get_private(Some(&basic_header("alice", "secret")), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/home");
    // The handler body never ran.
    assert_eq!(body_string(response).await, "");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn logout_clears_the_durable_principal() {
    let calls = Arc::new(AtomicUsize::new(0));
    let state = session_state(&calls);

    let login = app(state.clone(), check("basic"))
        .oneshot(get_private(Some(&basic_header("alice", "secret")), None))
        .await
        .unwrap();
    let cookie = session_cookie(&login);

    let logout_app = protect(
        Router::new().route("/logout", get(whoami)),
        state.clone(),
        check("basic").logout_route(),
    );
    let logout = logout_app
        .oneshot(
            Request::builder()
                .uri("/logout")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Logout always resolves as a failure and expires the cookie.
    assert_eq!(logout.status(), StatusCode::UNAUTHORIZED);
    assert!(
        logout
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .contains("Max-Age=0")
    );

    // The old cookie no longer short-circuits.
    let replay = app(state, check("basic"))
        .oneshot(get_private(None, Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn logout_with_failure_url_redirects() {
    let calls = Arc::new(AtomicUsize::new(0));
    let app = app(
        session_state(&calls),
        check("basic").logout_route().failure_url("/login"),
    );

    let response = app.oneshot(get_private(None, None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/login"
    );
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn login_gate_passes_unauthenticated_requests_through() {
    let calls = Arc::new(AtomicUsize::new(0));
    let app = app(session_state(&calls), check("basic").login_route());

    let response = app.oneshot(get_private(None, None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "anonymous");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn login_gate_with_authenticated_session_redirects() {
    let calls = Arc::new(AtomicUsize::new(0));
    let state = session_state(&calls);

    let login = app(state.clone(), check("basic"))
        .oneshot(get_private(Some(&basic_header("alice", "secret")), None))
        .await
        .unwrap();
    let cookie = session_cookie(&login);

    let response = app(state, check("basic").login_route().success_url("/home"))
        .oneshot(get_private(None, Some(&cookie)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/home");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn form_missing_field_denies_without_the_validator() {
    let calls = Arc::new(AtomicUsize::new(0));
    let app = app(state(&calls), check("form"));

    let response = app
        .oneshot(post_form(&[("username", "alice")], None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["error"], "Username or Password not supplied");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn form_credentials_reach_the_handler() {
    let calls = Arc::new(AtomicUsize::new(0));
    let app = app(state(&calls), check("form"));

    let response = app
        .oneshot(post_form(
            &[("username", "alice"), ("password", "secret")],
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "alice");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn distinct_sessions_never_cross_contaminate() {
    let calls = Arc::new(AtomicUsize::new(0));
    let state = session_state(&calls);

    let alice = app(state.clone(), check("basic"))
        .oneshot(get_private(Some(&basic_header("alice", "secret")), None))
        .await
        .unwrap();
    let alice_cookie = session_cookie(&alice);

    let bob = app(state.clone(), check("basic"))
        .oneshot(get_private(Some(&basic_header("bob", "hunter2")), None))
        .await
        .unwrap();
    let bob_cookie = session_cookie(&bob);

    let replay_alice = app(state.clone(), check("basic"))
        .oneshot(get_private(None, Some(&alice_cookie)))
        .await
        .unwrap();
    let replay_bob = app(state, check("basic"))
        .oneshot(get_private(None, Some(&bob_cookie)))
        .await
        .unwrap();

    assert_eq!(body_string(replay_alice).await, "alice");
    assert_eq!(body_string(replay_bob).await, "bob");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn custom_provider_runs_through_the_middleware() {
    use wicket::{
        AuthProvider, AuthRegistry, AuthState, Credentials, Extraction, RequestContext, Validation,
    };

    let registry = Arc::new(AuthRegistry::new());
    AuthProvider::builder("apikey")
        .custom(|ctx: &RequestContext<'_>| {
            // The header name comes through the check's extra bag.
            let name = ctx
                .extra
                .get("header")
                .and_then(Value::as_str)
                .unwrap_or("x-api-key");
            match ctx.headers.get(name).and_then(|v| v.to_str().ok()) {
                Some(key) => {
                    Extraction::Continue(Credentials(vec![Value::String(key.to_string())]))
                }
                None => Extraction::reject(StatusCode::UNAUTHORIZED, "No API key supplied"),
            }
        })
        .validator(|creds| async move {
            if creds.str(0) == Some("sk-live-1") {
                let mut principal = serde_json::Map::new();
                principal.insert("user".to_string(), Value::String("alice".into()));
                Ok(Validation::authenticated(principal))
            } else {
                Ok(Validation::denied())
            }
        })
        .register(&registry)
        .unwrap();
    registry.freeze();

    let app = app(
        AuthState::new(registry),
        check("apikey").extra("header", Value::String("x-token".into())),
    );

    let accepted = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/private")
                .header("x-token", "sk-live-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(accepted.status(), StatusCode::OK);
    assert_eq!(body_string(accepted).await, "alice");

    let rejected = app.oneshot(get_private(None, None)).await.unwrap();
    assert_eq!(rejected.status(), StatusCode::UNAUTHORIZED);
    let body: Value = serde_json::from_str(&body_string(rejected).await).unwrap();
    assert_eq!(body["error"], "No API key supplied");
}

#[tokio::test]
async fn stacked_checks_on_one_session_do_not_deadlock() {
    let calls = Arc::new(AtomicUsize::new(0));
    let state = session_state(&calls);

    let login = app(state.clone(), check("basic"))
        .oneshot(get_private(Some(&basic_header("alice", "secret")), None))
        .await
        .unwrap();
    let cookie = session_cookie(&login);

    // Both layers take the per-session lock in turn; the inner one must be
    // able to acquire it after the outer releases.
    let stacked = protect(
        protect(
            Router::new().route("/private", get(whoami)),
            state.clone(),
            check("basic"),
        ),
        state,
        check("basic"),
    );

    let response = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        stacked.oneshot(get_private(None, Some(&cookie))),
    )
    .await
    .expect("enforcement layers stalled on the session lock")
    .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "alice");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn corrupt_session_record_falls_through_to_validation() {
    use wicket::AuthState;
    use wicket_session::{MemoryStore, Session, SessionConfig, SessionStore};

    let calls = Arc::new(AtomicUsize::new(0));
    let store = Arc::new(MemoryStore::new());
    let config = SessionConfig::default();

    // Seed a session whose auth record is not the expected shape.
    let mut seeded = Session::with_id("corrupt-1");
    seeded
        .data
        .insert("__wicket_auth".to_string(), Value::String("garbage".into()));
    store.save(&seeded, config.ttl()).await.unwrap();

    let state = AuthState::new(registry(calls.clone())).with_sessions(store, config);
    let cookie = "wicket_session=corrupt-1".to_string();

    let response = app(state, check("basic"))
        .oneshot(get_private(
            Some(&basic_header("alice", "secret")),
            Some(&cookie),
        ))
        .await
        .unwrap();

    // No shortcut taken; the validator ran once and the request succeeded.
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "alice");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn panicking_validator_denies_with_500() {
    use wicket::{AuthProvider, AuthRegistry, AuthState, Validation};

    let registry = Arc::new(AuthRegistry::new());
    AuthProvider::builder("basic")
        .validator(|creds| async move {
            assert!(creds.str(0).is_none(), "boom");
            Ok(Validation::denied())
        })
        .register(&registry)
        .unwrap();

    let app = app(AuthState::new(registry), check("basic"));
    let response = app
        .oneshot(get_private(Some(&basic_header("alice", "secret")), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn erroring_validator_denies_with_500() {
    use wicket::{AuthProvider, AuthRegistry, AuthState, Validation};

    let registry = Arc::new(AuthRegistry::new());
    AuthProvider::builder("basic")
        .validator(|_creds| async move {
            let result: anyhow::Result<Validation> = Err(anyhow::anyhow!("backend offline"));
            result
        })
        .register(&registry)
        .unwrap();

    let app = app(AuthState::new(registry), check("basic"));
    let response = app
        .oneshot(get_private(Some(&basic_header("alice", "secret")), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["error"], "Authentication error");
}
