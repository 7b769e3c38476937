//! Session cookie helpers.

use axum::http::{HeaderMap, HeaderValue, header::SET_COOKIE};
use axum_extra::headers::{Cookie, HeaderMapExt};

/// Reads the session id out of the request's `Cookie` header, if present.
pub fn session_id(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .typed_get::<Cookie>()?
        .get(cookie_name)
        .map(str::to_string)
}

/// Appends a `Set-Cookie` header carrying the session id.
pub fn set_session_cookie(headers: &mut HeaderMap, cookie_name: &str, id: &str) {
    let value = format!("{cookie_name}={id}; Path=/; HttpOnly; SameSite=Lax");
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.append(SET_COOKIE, value);
    }
}

/// Appends a `Set-Cookie` header that expires the session cookie immediately.
pub fn clear_session_cookie(headers: &mut HeaderMap, cookie_name: &str) {
    let value = format!("{cookie_name}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.append(SET_COOKIE, value);
    }
}
