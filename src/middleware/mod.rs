//! Request-time enforcement.

pub mod check;

pub use check::{AuthSession, Check, check, protect};
