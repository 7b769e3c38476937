//! Provider registration and lookup.
//!
//! The registry is process-wide state: populated while the server is wired
//! up, then frozen before traffic starts. Lookups during request handling
//! take a read lock and clone an `Arc`, so readers always observe a complete
//! provider.

use crate::error::AuthError;
use crate::outcome::{Credentials, Validation};
use crate::providers::{BasicOptions, Extract, FormOptions};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// Boxed future returned by validators.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// User-supplied credential validator.
///
/// Returns [`Validation`] for both acceptance and explicit denial. `Err` is
/// reserved for bugs and infrastructure faults; the middleware converts those
/// to a 500 outcome instead of letting them propagate.
pub type Validator =
    Arc<dyn Fn(Credentials) -> BoxFuture<anyhow::Result<Validation>> + Send + Sync>;

/// The credential-extraction strategy a provider uses.
#[derive(Clone)]
pub enum Strategy {
    Basic(BasicOptions),
    Form(FormOptions),
    Custom(Arc<dyn Extract>),
}

impl std::fmt::Debug for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Basic(options) => f.debug_tuple("Basic").field(options).finish(),
            Strategy::Form(options) => f.debug_tuple("Form").field(options).finish(),
            Strategy::Custom(_) => f.debug_tuple("Custom").finish_non_exhaustive(),
        }
    }
}

/// A named authentication strategy paired with its validator.
///
/// Immutable after construction; the registry hands out `Arc`s.
#[derive(Clone)]
pub struct AuthProvider {
    name: String,
    strategy: Strategy,
    validator: Validator,
}

impl AuthProvider {
    /// Starts building a provider. Names are matched case-insensitively;
    /// `basic` and `form` resolve to the built-in strategies when no
    /// explicit extractor is configured.
    pub fn builder(name: impl Into<String>) -> ProviderBuilder {
        ProviderBuilder {
            name: name.into(),
            strategy: None,
            validator: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    pub(crate) fn validator(&self) -> Validator {
        self.validator.clone()
    }
}

impl std::fmt::Debug for AuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthProvider")
            .field("name", &self.name)
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

/// Builder for [`AuthProvider`].
pub struct ProviderBuilder {
    name: String,
    strategy: Option<Strategy>,
    validator: Option<Validator>,
}

impl ProviderBuilder {
    /// Use the Basic strategy with non-default options.
    pub fn basic(mut self, options: BasicOptions) -> Self {
        self.strategy = Some(Strategy::Basic(options));
        self
    }

    /// Use the Form strategy with non-default options.
    pub fn form(mut self, options: FormOptions) -> Self {
        self.strategy = Some(Strategy::Form(options));
        self
    }

    /// Attach a custom extractor. The provider may then carry any name.
    pub fn custom(mut self, extractor: impl Extract + 'static) -> Self {
        self.strategy = Some(Strategy::Custom(Arc::new(extractor)));
        self
    }

    /// Attach the validator: an async function from extracted credentials to
    /// a [`Validation`] verdict.
    pub fn validator<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Credentials) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Validation>> + Send + 'static,
    {
        self.validator = Some(Arc::new(move |creds| Box::pin(f(creds))));
        self
    }

    /// Finishes the provider, resolving built-in names when no explicit
    /// strategy was configured.
    pub fn build(self) -> Result<AuthProvider, AuthError> {
        let name = self.name.trim().to_ascii_lowercase();

        if name.is_empty() {
            return Err(AuthError::InvalidProvider(name));
        }
        let Some(validator) = self.validator else {
            return Err(AuthError::InvalidProvider(name));
        };

        let strategy = match self.strategy {
            Some(strategy) => strategy,
            None => match name.as_str() {
                "basic" => Strategy::Basic(BasicOptions::default()),
                "form" => Strategy::Form(FormOptions::default()),
                _ => return Err(AuthError::UnknownProvider(name)),
            },
        };

        Ok(AuthProvider {
            name,
            strategy,
            validator,
        })
    }

    /// Builds and registers in one step.
    pub fn register(self, registry: &AuthRegistry) -> Result<(), AuthError> {
        registry.register(self.build()?)
    }
}

/// Process-wide provider table.
///
/// Read-heavy once serving starts. [`freeze`](Self::freeze) makes the
/// write-once phase explicit so late registration fails loudly instead of
/// racing readers.
#[derive(Debug, Default)]
pub struct AuthRegistry {
    providers: RwLock<HashMap<String, Arc<AuthProvider>>>,
    frozen: AtomicBool,
}

impl AuthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider under its (lowercased) name.
    pub fn register(&self, provider: AuthProvider) -> Result<(), AuthError> {
        if self.frozen.load(Ordering::Acquire) {
            return Err(AuthError::RegistryFrozen);
        }

        let mut providers = self.providers.write().expect("provider table poisoned");
        let name = provider.name.clone();
        if providers.contains_key(&name) {
            return Err(AuthError::DuplicateProvider(name));
        }

        tracing::debug!(auth.provider = %name, "provider registered");
        providers.insert(name, Arc::new(provider));

        Ok(())
    }

    /// Case-insensitive lookup.
    pub fn lookup(&self, name: &str) -> Result<Arc<AuthProvider>, AuthError> {
        let key = name.trim().to_ascii_lowercase();

        self.providers
            .read()
            .expect("provider table poisoned")
            .get(&key)
            .cloned()
            .ok_or(AuthError::UndefinedProvider(key))
    }

    /// Ends the registration phase; further `register` calls fail with
    /// [`AuthError::RegistryFrozen`].
    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::Release);
    }
}
