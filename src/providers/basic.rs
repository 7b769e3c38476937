//! HTTP Basic credential extraction.

use crate::outcome::{Credentials, Extraction};
use axum::http::{HeaderMap, StatusCode, header};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Options for the Basic strategy.
#[derive(Clone, Debug)]
pub struct BasicOptions {
    /// Scheme token expected in the `Authorization` header, compared
    /// case-insensitively.
    pub scheme: String,

    /// Character encoding of the decoded credentials: `ISO-8859-1` (the
    /// historical default for Basic) or `UTF-8`. Any other name is rejected
    /// per request with a 400.
    pub charset: String,
}

impl Default for BasicOptions {
    fn default() -> Self {
        Self {
            scheme: "Basic".into(),
            charset: "ISO-8859-1".into(),
        }
    }
}

impl BasicOptions {
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }
}

pub(crate) fn extract(headers: &HeaderMap, options: &BasicOptions) -> Extraction {
    let Some(value) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    else {
        return Extraction::reject(StatusCode::UNAUTHORIZED, "No Authorization header found");
    };

    let mut tokens = value.split_whitespace();
    let scheme = tokens.next().unwrap_or("");
    if !scheme.eq_ignore_ascii_case(&options.scheme) {
        // Status-less on purpose: a foreign scheme is not an error, the
        // header just isn't ours.
        return Extraction::reject_silent(format!(
            "Header is not {} Authorization",
            options.scheme
        ));
    }

    let Some(decode) = decoder_for(&options.charset) else {
        return Extraction::reject(
            StatusCode::BAD_REQUEST,
            "Invalid encoding specified for Authorization",
        );
    };

    let decoded = tokens
        .next()
        .and_then(|payload| STANDARD.decode(payload).ok())
        .and_then(decode);
    let Some(decoded) = decoded else {
        return Extraction::reject(
            StatusCode::BAD_REQUEST,
            "Invalid Base64 string found in Authorization header",
        );
    };

    // Split at the first colon: the username may not contain one, the
    // password may.
    let (username, password) = match decoded.split_once(':') {
        Some((username, password)) => (username.to_string(), password.to_string()),
        None => (decoded, String::new()),
    };

    Extraction::Continue(Credentials::pair(username, password))
}

fn decoder_for(charset: &str) -> Option<fn(Vec<u8>) -> Option<String>> {
    match charset.to_ascii_lowercase().as_str() {
        "iso-8859-1" | "latin1" | "latin-1" => Some(latin1),
        "utf-8" | "utf8" => Some(utf8),
        _ => None,
    }
}

fn latin1(bytes: Vec<u8>) -> Option<String> {
    // ISO-8859-1 maps byte values directly onto the first 256 code points.
    Some(bytes.into_iter().map(char::from).collect())
}

fn utf8(bytes: Vec<u8>) -> Option<String> {
    String::from_utf8(bytes).ok()
}
