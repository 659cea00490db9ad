use std::{fmt, sync::Arc};

use indexmap::IndexMap;
use logctx_types::{FieldValue, IdentityResolver, RequestAccessor, SessionAccessor, TokenSource};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{BuiltinField, FieldBindings, FieldContext, FieldError, FieldProvider, identity::IdentityChain};

/// Field name to JSON value, in binding order. Absent fields are omitted.
pub type FieldRecord = IndexMap<String, Value>;

/// Registry mapping field names to providers, plus the host context those
/// providers read from.
///
/// ## Lifecycle
///
/// A registry is built once per logical scope (a request, or the process for
/// process-level fields). Construction binds every [`BuiltinField`]; callers
/// may then [`register`](Self::register) extra providers or replace built-ins,
/// and inject accessors as the corresponding host resources become available.
/// Nothing is cached: every [`evaluate`](Self::evaluate) recomputes live state.
///
/// ## Dispatch
///
/// All evaluation goes through the name → provider map. Registering under an
/// existing name replaces the earlier binding, so overrides always win over
/// the defaults.
///
/// The registry performs no locking. Wrap it in
/// [`SharedFieldRegistry`](crate::SharedFieldRegistry) when it must outlive a
/// single task.
#[derive(Clone)]
pub struct FieldRegistry {
    providers: IndexMap<String, Arc<dyn FieldProvider>>,
    pub(crate) context: FieldContext,
}

impl fmt::Debug for FieldRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldRegistry")
            .field("fields", &self.providers.keys().collect::<Vec<_>>())
            .field("context", &self.context)
            .finish()
    }
}

impl Default for FieldRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldRegistry {
    /// Creates a registry with every built-in provider bound and no identity backends.
    pub fn new() -> Self {
        let mut registry = Self {
            providers: IndexMap::new(),
            context: FieldContext::default(),
        };
        for field in BuiltinField::ALL {
            registry.providers.insert(field.name().to_string(), Arc::new(field));
        }
        registry
    }

    /// Creates a registry whose `userId` field consults `resolvers` in order.
    pub fn with_identity_resolvers(resolvers: Vec<Arc<dyn IdentityResolver>>) -> Self {
        let mut registry = Self::new();
        registry.context.identity = IdentityChain::new(resolvers);
        registry
    }

    /// Appends an identity backend after those already configured.
    pub fn push_identity_resolver(&mut self, resolver: Arc<dyn IdentityResolver>) {
        self.context.identity.push(resolver);
    }

    /// Binds `name` to `provider`, replacing any existing binding.
    pub fn register(&mut self, name: impl Into<String>, provider: impl FieldProvider + 'static) {
        self.register_shared(name, Arc::new(provider));
    }

    /// Closure form of [`register`](Self::register).
    pub fn register_fn<F>(&mut self, name: impl Into<String>, provider: F)
    where
        F: Fn(&FieldContext, &[Value]) -> anyhow::Result<FieldValue> + Send + Sync + 'static,
    {
        self.register_shared(name, Arc::new(provider));
    }

    pub(crate) fn register_shared(&mut self, name: impl Into<String>, provider: Arc<dyn FieldProvider>) {
        let name = name.into();
        if name.is_empty() {
            warn!("registering a field provider under an empty name");
        }
        let replaced = self.providers.insert(name.clone(), provider).is_some();
        debug!(field = %name, replaced, "field provider registered");
    }

    /// Evaluates `name` with `args`.
    ///
    /// # Errors
    ///
    /// - [`FieldError::UnknownField`] when nothing is registered under `name`.
    /// - Any error the provider reports; typed [`FieldError`]s pass through
    ///   unchanged, everything else is wrapped in [`FieldError::Provider`].
    pub fn evaluate(&self, name: &str, args: &[Value]) -> Result<FieldValue, FieldError> {
        let provider = self.provider(name)?;
        evaluate_with(name, provider.as_ref(), &self.context, args)
    }

    /// Evaluates every binding in order, omitting absent values.
    pub fn evaluate_record(&self, bindings: &FieldBindings) -> Result<FieldRecord, FieldError> {
        let mut record = FieldRecord::new();
        for (key, binding) in bindings.iter() {
            if let Some(value) = self.evaluate(binding.field(), binding.args())?.into_json() {
                record.insert(key.clone(), value);
            }
        }
        Ok(record)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Registered names in registration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    pub fn context(&self) -> &FieldContext {
        &self.context
    }

    pub fn set_session_accessor(&mut self, session: Arc<dyn SessionAccessor>) {
        self.context.session = Some(session);
    }

    pub fn set_request_accessor(&mut self, request: Arc<dyn RequestAccessor>) {
        self.context.request = Some(request);
    }

    pub fn set_environment(&mut self, environment: impl Into<String>) {
        self.context.environment = Some(environment.into());
    }

    pub fn set_token_accessor(&mut self, token_source: Arc<dyn TokenSource>) {
        self.context.token_source = Some(token_source);
    }

    pub(crate) fn provider(&self, name: &str) -> Result<Arc<dyn FieldProvider>, FieldError> {
        self.providers
            .get(name)
            .cloned()
            .ok_or_else(|| FieldError::UnknownField { name: name.to_string() })
    }
}

pub(crate) fn evaluate_with(name: &str, provider: &dyn FieldProvider, context: &FieldContext, args: &[Value]) -> Result<FieldValue, FieldError> {
    match provider.provide(context, args) {
        Ok(value) => {
            debug!(field = %name, absent = value.is_absent(), "field evaluated");
            Ok(value)
        }
        Err(error) => {
            let error = FieldError::from_provider(name, error);
            debug!(field = %name, error = %error, "field evaluation failed");
            Err(error)
        }
    }
}
