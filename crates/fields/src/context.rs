use std::sync::Arc;

use logctx_types::{RequestAccessor, SessionAccessor, TokenSource};

use crate::identity::IdentityChain;

/// Host-owned handles visible to every provider.
///
/// Any handle may be missing; providers decide whether that means
/// `Absent` or a [`crate::FieldError::MissingRequiredContext`].
#[derive(Debug, Clone, Default)]
pub struct FieldContext {
    pub(crate) session: Option<Arc<dyn SessionAccessor>>,
    pub(crate) request: Option<Arc<dyn RequestAccessor>>,
    pub(crate) environment: Option<String>,
    pub(crate) token_source: Option<Arc<dyn TokenSource>>,
    pub(crate) identity: IdentityChain,
}

impl FieldContext {
    pub fn session(&self) -> Option<&dyn SessionAccessor> {
        self.session.as_deref()
    }

    pub fn request(&self) -> Option<&dyn RequestAccessor> {
        self.request.as_deref()
    }

    pub fn environment(&self) -> Option<&str> {
        self.environment.as_deref()
    }

    pub fn token_source(&self) -> Option<&dyn TokenSource> {
        self.token_source.as_deref()
    }

    pub fn identity(&self) -> &IdentityChain {
        &self.identity
    }
}
