//! Form-field credential extraction.

use crate::outcome::{Credentials, Extraction};
use axum::http::StatusCode;
use std::collections::HashMap;

/// Options for the Form strategy.
#[derive(Clone, Debug)]
pub struct FormOptions {
    pub username_field: String,
    pub password_field: String,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            username_field: "username".into(),
            password_field: "password".into(),
        }
    }
}

impl FormOptions {
    pub fn username_field(mut self, name: impl Into<String>) -> Self {
        self.username_field = name.into();
        self
    }

    pub fn password_field(mut self, name: impl Into<String>) -> Self {
        self.password_field = name.into();
        self
    }
}

pub(crate) fn extract(form: Option<&HashMap<String, String>>, options: &FormOptions) -> Extraction {
    let field = |name: &str| {
        form.and_then(|fields| fields.get(name))
            .map(String::as_str)
            .unwrap_or("")
    };

    let username = field(&options.username_field);
    let password = field(&options.password_field);

    if username.is_empty() || password.is_empty() {
        return Extraction::reject(
            StatusCode::UNAUTHORIZED,
            "Username or Password not supplied",
        );
    }

    Extraction::Continue(Credentials::pair(username, password))
}
