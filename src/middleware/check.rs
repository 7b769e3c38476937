//! The per-request authentication gate.
//!
//! One enforcement pass walks a fixed sequence: logout handling, then the
//! session shortcut, then the login gate, then extraction and validation,
//! and finally response resolution. No stage is re-entered within a pass.

use crate::outcome::{self, Extraction, Outcome, Principal, Validation};
use crate::providers::{self, RequestContext};
use crate::registry::Strategy;
use crate::state::{AuthState, Sessions};
use axum::Router;
use axum::body::Body;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::{StatusCode, header, request::Parts};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use http_body_util::BodyExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, error, warn};
use wicket_session::{Session, cookie};

/// Reserved key inside the session data bag holding the durable auth record.
const AUTH_KEY: &str = "__wicket_auth";

/// Per-request authentication state, attached as a request extension by the
/// middleware and read by handlers through its `FromRequestParts` impl.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AuthSession {
    pub principal: Option<Principal>,
    pub is_authenticated: bool,

    /// Whether this pass should copy the principal into the durable session.
    #[serde(skip)]
    pub persist: bool,
}

impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthSession>()
            .cloned()
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}

/// The shape persisted under [`AUTH_KEY`]. Kept separate from [`AuthSession`]
/// so the wire format never grows request-only fields.
#[derive(Debug, Serialize, Deserialize)]
struct DurableAuth {
    principal: Principal,
    is_authenticated: bool,
}

/// Per-route enforcement configuration.
///
/// Built once when the router is wired up, cloned per request. See [`check`]
/// for the usual entry point and [`protect`] for attaching it to a router.
#[derive(Clone, Debug)]
pub struct Check {
    provider: String,
    failure_url: Option<String>,
    success_url: Option<String>,
    use_session: bool,
    login_route: bool,
    logout_route: bool,
    extra: Map<String, Value>,
}

/// Starts a [`Check`] against the named provider, with session shortcutting
/// enabled.
pub fn check(provider: impl Into<String>) -> Check {
    Check {
        provider: provider.into(),
        failure_url: None,
        success_url: None,
        use_session: true,
        login_route: false,
        logout_route: false,
        extra: Map::new(),
    }
}

impl Check {
    /// Redirect here on any failure instead of answering with a status code.
    pub fn failure_url(mut self, url: impl Into<String>) -> Self {
        self.failure_url = Some(url.into());
        self
    }

    /// Redirect here on success instead of running the protected handler.
    pub fn success_url(mut self, url: impl Into<String>) -> Self {
        self.success_url = Some(url.into());
        self
    }

    /// Disables the session shortcut; every request re-runs the validator.
    pub fn without_session(mut self) -> Self {
        self.use_session = false;
        self
    }

    /// Marks the route as a login page: unauthenticated requests pass
    /// through without the validator running.
    pub fn login_route(mut self) -> Self {
        debug_assert!(!self.logout_route, "a route cannot be both login and logout");
        self.login_route = true;
        self
    }

    /// Marks the route as a logout action: the durable principal is cleared
    /// and the pass always resolves as a failure.
    pub fn logout_route(mut self) -> Self {
        debug_assert!(!self.login_route, "a route cannot be both login and logout");
        self.logout_route = true;
        self
    }

    /// Free-form options forwarded to custom extractors.
    pub fn extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Runs one enforcement pass. Usable directly with
    /// `middleware::from_fn_with_state`; [`protect`] does the wiring.
    pub async fn run(self, State(state): State<AuthState>, req: Request, next: Next) -> Response {
        let session_id = state
            .sessions
            .as_ref()
            .and_then(|s| cookie::session_id(req.headers(), &s.config.cookie_name));

        // Serialize read-modify-write cycles per session id so concurrent
        // requests for the same browser session observe each other's writes.
        // Released once the session phases are done, never held across the
        // downstream handler.
        let guard = match (&state.sessions, &session_id) {
            (Some(sessions), Some(id)) => Some(sessions.locks.acquire(id).await),
            _ => None,
        };

        if self.logout_route {
            if let (Some(sessions), Some(id)) = (&state.sessions, &session_id) {
                clear_durable_auth(sessions, id).await;
            }
            debug!(auth.provider = %self.provider, "logout, resolving as failure");
            let mut response = self.fail(None, None);
            if let Some(sessions) = &state.sessions {
                cookie::clear_session_cookie(response.headers_mut(), &sessions.config.cookie_name);
            }
            return response;
        }

        if self.use_session {
            if let (Some(sessions), Some(id)) = (&state.sessions, &session_id) {
                if let Some(principal) = durable_principal(sessions, id).await {
                    debug!(session.id = %id, "session shortcut, skipping validation");
                    return self
                        .succeed(principal, false, session_id, guard, &state, req, next)
                        .await;
                }
            }
        }

        if self.login_route {
            drop(guard);
            let mut req = req;
            req.extensions_mut().insert(AuthSession::default());
            let mut response = next.run(req).await;
            if let Some(sessions) = &state.sessions {
                cookie::clear_session_cookie(response.headers_mut(), &sessions.config.cookie_name);
            }
            return response;
        }

        let provider = match state.registry.lookup(&self.provider) {
            Ok(provider) => provider,
            Err(err) => {
                error!(auth.provider = %self.provider, error = %err, "provider lookup failed");
                return self.fail(
                    Some(StatusCode::INTERNAL_SERVER_ERROR),
                    Some("Authentication is not configured".to_string()),
                );
            }
        };

        // Built-in Form and custom extractors may need body fields; Basic
        // reads headers only, so the body stays untouched on that path.
        let (req, form) = match provider.strategy() {
            Strategy::Basic(_) => (req, None),
            Strategy::Form(_) | Strategy::Custom(_) => match buffer_form(req).await {
                Ok(parts) => parts,
                Err(response) => return response,
            },
        };

        let extraction = {
            let ctx = RequestContext {
                headers: req.headers(),
                uri: req.uri(),
                form: form.as_ref(),
                extra: &self.extra,
            };
            match provider.strategy() {
                Strategy::Basic(options) => providers::basic::extract(ctx.headers, options),
                Strategy::Form(options) => providers::form::extract(ctx.form, options),
                Strategy::Custom(extractor) => extractor.extract(&ctx),
            }
        };

        let credentials = match extraction {
            Extraction::Continue(credentials) => credentials,
            Extraction::Reject { status, message } => {
                debug!(auth.provider = %provider.name(), "extraction rejected");
                return self.fail(status, message);
            }
        };

        // The validator runs on its own task so a panic surfaces as a
        // JoinError instead of tearing down the connection.
        let validator = provider.validator();
        let validation = match tokio::spawn(validator(credentials)).await {
            Ok(Ok(validation)) => validation,
            Ok(Err(err)) => {
                error!(auth.provider = %provider.name(), error = %err, "validator failed");
                Validation::denied_with(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Authentication error",
                )
            }
            Err(err) => {
                error!(auth.provider = %provider.name(), error = %err, "validator panicked");
                Validation::denied_with(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Authentication error",
                )
            }
        };

        match validation.principal {
            Some(principal) => {
                self.succeed(
                    principal,
                    self.use_session,
                    session_id,
                    guard,
                    &state,
                    req,
                    next,
                )
                .await
            }
            None => self.fail(validation.status, validation.message),
        }
    }

    /// Finishes a successful pass: persist the principal when asked, attach
    /// the request-scoped [`AuthSession`], then resolve.
    async fn succeed(
        &self,
        principal: Principal,
        persist: bool,
        session_id: Option<String>,
        guard: Option<OwnedMutexGuard<()>>,
        state: &AuthState,
        mut req: Request,
        next: Next,
    ) -> Response {
        let mut new_cookie = None;

        if persist {
            if let Some(sessions) = &state.sessions {
                let id = match session_id {
                    Some(id) => id,
                    None => {
                        let id = Session::new().id;
                        new_cookie = Some(id.clone());
                        id
                    }
                };
                // Persist before resolving so a redirect already reflects
                // the authenticated state.
                write_durable_auth(sessions, &id, &principal).await;
            }
        }

        // Session writes are done; the downstream handler (and any further
        // enforcement layer on the same session) must not run under the lock.
        drop(guard);

        req.extensions_mut().insert(AuthSession {
            principal: Some(principal),
            is_authenticated: true,
            persist,
        });

        let mut response =
            match outcome::resolve(
                &Outcome::Success,
                self.failure_url.as_deref(),
                self.success_url.as_deref(),
            )
            .into_response()
            {
                Some(halted) => halted,
                None => next.run(req).await,
            };

        if let (Some(sessions), Some(id)) = (&state.sessions, &new_cookie) {
            cookie::set_session_cookie(response.headers_mut(), &sessions.config.cookie_name, id);
        }

        response
    }

    /// Resolves a failure outcome into its halting response.
    fn fail(&self, status: Option<StatusCode>, message: Option<String>) -> Response {
        outcome::resolve(
            &Outcome::Failure { status, message },
            self.failure_url.as_deref(),
            self.success_url.as_deref(),
        )
        .into_response()
        .unwrap_or_else(|| StatusCode::UNAUTHORIZED.into_response())
    }
}

/// Reads the durable principal for a session id, if one was stored and is
/// still marked authenticated. Corrupt records read as absent so the pass
/// falls through to full validation.
async fn durable_principal(sessions: &Sessions, id: &str) -> Option<Principal> {
    let session = match sessions.store.load(id).await {
        Ok(session) => session?,
        Err(err) => {
            warn!(session.id = %id, error = %err, "session load failed");
            return None;
        }
    };

    let record = session.data.get(AUTH_KEY)?;
    let auth: DurableAuth = match serde_json::from_value(record.clone()) {
        Ok(auth) => auth,
        Err(err) => {
            warn!(session.id = %id, error = %err, "malformed session auth data");
            return None;
        }
    };

    if !auth.is_authenticated {
        return None;
    }

    // Sliding expiry: a hit refreshes the TTL.
    if let Err(err) = sessions.store.save(&session, sessions.ttl()).await {
        warn!(session.id = %id, error = %err, "session refresh failed");
    }

    Some(auth.principal)
}

/// Writes the durable auth record under the reserved key, preserving any
/// application data already in the session.
async fn write_durable_auth(sessions: &Sessions, id: &str, principal: &Principal) {
    let mut session = match sessions.store.load(id).await {
        Ok(Some(session)) => session,
        Ok(None) => Session::with_id(id),
        Err(err) => {
            warn!(session.id = %id, error = %err, "session load failed, starting fresh");
            Session::with_id(id)
        }
    };

    let record = DurableAuth {
        principal: principal.clone(),
        is_authenticated: true,
    };
    match serde_json::to_value(&record) {
        Ok(value) => {
            session.data.insert(AUTH_KEY.to_string(), value);
        }
        Err(err) => {
            warn!(session.id = %id, error = %err, "auth record serialization failed");
            return;
        }
    }

    if let Err(err) = sessions.store.save(&session, sessions.ttl()).await {
        warn!(session.id = %id, error = %err, "session save failed");
    }
}

/// Removes the durable auth record, leaving other session data intact.
async fn clear_durable_auth(sessions: &Sessions, id: &str) {
    let mut session = match sessions.store.load(id).await {
        Ok(Some(session)) => session,
        Ok(None) => return,
        Err(err) => {
            warn!(session.id = %id, error = %err, "session load failed");
            return;
        }
    };

    if session.data.remove(AUTH_KEY).is_none() {
        return;
    }

    if let Err(err) = sessions.store.save(&session, sessions.ttl()).await {
        warn!(session.id = %id, error = %err, "session save failed");
    }
}

/// Buffers a urlencoded body into field pairs, handing back a request whose
/// body is replayable for the downstream handler. Non-form bodies pass
/// through unparsed.
async fn buffer_form(
    req: Request,
) -> Result<(Request, Option<HashMap<String, String>>), Response> {
    let is_form = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/x-www-form-urlencoded"));

    if !is_form {
        return Ok((req, None));
    }

    let (parts, body) = req.into_parts();
    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            warn!(error = %err, "request body read failed");
            return Err(StatusCode::BAD_REQUEST.into_response());
        }
    };

    let fields: HashMap<String, String> = url::form_urlencoded::parse(&bytes)
        .into_owned()
        .collect();

    Ok((
        Request::from_parts(parts, Body::from(bytes)),
        Some(fields),
    ))
}

/// Attaches `check` as a route layer over every route in `router`.
pub fn protect<S>(router: Router<S>, state: AuthState, check: Check) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.route_layer(middleware::from_fn_with_state(
        state,
        move |state: State<AuthState>, req: Request, next: Next| {
            let check = check.clone();
            async move { check.run(state, req, next).await }
        },
    ))
}
