//! Configuration-time error taxonomy.
//!
//! These errors surface while wiring providers at startup and should abort
//! the server with a descriptive message. Request-scoped authentication
//! failures never use this type; they are resolved into HTTP responses by
//! [`crate::outcome`].

/// Errors raised by provider registration and lookup.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// A provider with this name is already registered.
    #[error("authentication provider `{0}` is already registered")]
    DuplicateProvider(String),

    /// The provider definition is incomplete: no validator, or a custom
    /// provider without an extractor.
    #[error("authentication provider `{0}` is missing an extractor or validator")]
    InvalidProvider(String),

    /// A non-custom name that does not resolve to a built-in strategy.
    #[error(
        "`{0}` is not a built-in authentication strategy; supply an extractor and register it as custom"
    )]
    UnknownProvider(String),

    /// A `check` referenced a provider nobody registered.
    #[error("authentication provider `{0}` is not registered")]
    UndefinedProvider(String),

    /// Registration attempted after the registry was frozen for serving.
    #[error("provider registry is frozen; register providers before serving traffic")]
    RegistryFrozen,
}
