use std::sync::{Arc, Mutex, MutexGuard};

use logctx_types::{FieldValue, RequestAccessor, SessionAccessor, TokenSource};
use serde_json::Value;

use crate::{FieldContext, FieldError, FieldProvider, FieldRegistry, registry::evaluate_with};

/// Process-wide registry that many tasks may evaluate and extend concurrently.
///
/// Mutations take the lock for the duration of a map insert. Evaluation holds
/// the lock only long enough to clone the provider and the context, so slow
/// host accessors never block registration.
#[derive(Debug, Clone, Default)]
pub struct SharedFieldRegistry {
    inner: Arc<Mutex<FieldRegistry>>,
}

impl SharedFieldRegistry {
    pub fn new(registry: FieldRegistry) -> Self {
        Self {
            inner: Arc::new(Mutex::new(registry)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FieldRegistry> {
        self.inner.lock().expect("field registry lock")
    }

    pub fn register(&self, name: impl Into<String>, provider: impl FieldProvider + 'static) {
        self.lock().register(name, provider);
    }

    pub fn register_fn<F>(&self, name: impl Into<String>, provider: F)
    where
        F: Fn(&FieldContext, &[Value]) -> anyhow::Result<FieldValue> + Send + Sync + 'static,
    {
        self.lock().register_fn(name, provider);
    }

    pub fn evaluate(&self, name: &str, args: &[Value]) -> Result<FieldValue, FieldError> {
        let (provider, context) = {
            let registry = self.lock();
            (registry.provider(name)?, registry.context.clone())
        };
        evaluate_with(name, provider.as_ref(), &context, args)
    }

    pub fn set_session_accessor(&self, session: Arc<dyn SessionAccessor>) {
        self.lock().set_session_accessor(session);
    }

    pub fn set_request_accessor(&self, request: Arc<dyn RequestAccessor>) {
        self.lock().set_request_accessor(request);
    }

    pub fn set_environment(&self, environment: impl Into<String>) {
        self.lock().set_environment(environment);
    }

    pub fn set_token_accessor(&self, token_source: Arc<dyn TokenSource>) {
        self.lock().set_token_accessor(token_source);
    }

    /// Copy of the current registry state.
    pub fn snapshot(&self) -> FieldRegistry {
        self.lock().clone()
    }
}
