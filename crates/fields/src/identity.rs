//! Ordered fallback across pluggable authentication backends.
//!
//! A host may ship with zero, one, or several auth integrations. Each is
//! wrapped in an [`IdentityResolver`] and tried in the order the host
//! supplied them. Unavailable or failing backends are skipped, never
//! propagated.

use std::{env, sync::Arc};

use logctx_types::{IdentityResolver, PrincipalId, SessionAccessor};
use tracing::{debug, warn};

/// Ordered list of identity resolvers.
#[derive(Debug, Clone, Default)]
pub struct IdentityChain {
    resolvers: Vec<Arc<dyn IdentityResolver>>,
}

impl IdentityChain {
    pub fn new(resolvers: Vec<Arc<dyn IdentityResolver>>) -> Self {
        Self { resolvers }
    }

    pub fn push(&mut self, resolver: Arc<dyn IdentityResolver>) {
        self.resolvers.push(resolver);
    }

    /// Returns the first principal any backend reports, or `None`.
    ///
    /// `session` is the registry's current session handle, if any.
    pub fn resolve(&self, session: Option<&dyn SessionAccessor>) -> Option<PrincipalId> {
        for resolver in &self.resolvers {
            let backend = resolver.backend();
            if !resolver.is_available(session) {
                debug!(backend = %backend, "identity backend unavailable");
                continue;
            }
            match resolver.current_principal(session) {
                Ok(Some(principal)) => {
                    debug!(backend = %backend, principal = %principal, "identity resolved");
                    return Some(principal);
                }
                Ok(None) => debug!(backend = %backend, "identity backend has no authenticated principal"),
                Err(error) => warn!(backend = %backend, error = %error, "identity backend failed; trying next"),
            }
        }
        None
    }
}

/// Reads the principal id that session-guard authentication stored in the session.
///
/// Unavailable while the registry holds no session.
#[derive(Debug, Clone)]
pub struct SessionPrincipal {
    key: String,
}

impl SessionPrincipal {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl IdentityResolver for SessionPrincipal {
    fn backend(&self) -> &str {
        "session"
    }

    fn is_available(&self, session: Option<&dyn SessionAccessor>) -> bool {
        session.is_some()
    }

    fn current_principal(&self, session: Option<&dyn SessionAccessor>) -> anyhow::Result<Option<PrincipalId>> {
        let Some(session) = session else {
            return Ok(None);
        };
        match session.get(&self.key) {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(serde_json::Value::String(raw)) => Ok(PrincipalId::parse(&raw)),
            Some(value) => Ok(Some(serde_json::from_value(value.clone()).map_err(|error| {
                anyhow::anyhow!("session key '{}' holds an unsupported principal value {}: {}", self.key, value, error)
            })?)),
        }
    }
}

/// Reads the principal from an environment variable, for batch jobs and CLIs.
#[derive(Debug, Clone)]
pub struct EnvPrincipal {
    var: String,
}

impl EnvPrincipal {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl IdentityResolver for EnvPrincipal {
    fn backend(&self) -> &str {
        "env"
    }

    fn is_available(&self, _session: Option<&dyn SessionAccessor>) -> bool {
        env::var_os(&self.var).is_some()
    }

    fn current_principal(&self, _session: Option<&dyn SessionAccessor>) -> anyhow::Result<Option<PrincipalId>> {
        match env::var(&self.var) {
            Ok(raw) => Ok(PrincipalId::parse(&raw)),
            Err(env::VarError::NotPresent) => Ok(None),
            Err(error) => Err(anyhow::anyhow!("{}: {}", self.var, error)),
        }
    }
}

/// Always resolves to the same principal. Useful for service accounts.
#[derive(Debug, Clone)]
pub struct StaticPrincipal(pub PrincipalId);

impl IdentityResolver for StaticPrincipal {
    fn backend(&self) -> &str {
        "static"
    }

    fn is_available(&self, _session: Option<&dyn SessionAccessor>) -> bool {
        true
    }

    fn current_principal(&self, _session: Option<&dyn SessionAccessor>) -> anyhow::Result<Option<PrincipalId>> {
        Ok(Some(self.0.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logctx_util::MemorySession;
    use serde_json::json;

    #[derive(Debug)]
    struct Failing;

    impl IdentityResolver for Failing {
        fn backend(&self) -> &str {
            "failing"
        }
        fn is_available(&self, _session: Option<&dyn SessionAccessor>) -> bool {
            true
        }
        fn current_principal(&self, _session: Option<&dyn SessionAccessor>) -> anyhow::Result<Option<PrincipalId>> {
            anyhow::bail!("backend exploded")
        }
    }

    fn session(values: serde_json::Value) -> MemorySession {
        serde_json::from_value(json!({ "id": "s", "values": values })).expect("session")
    }

    #[test]
    fn empty_chain_resolves_nothing() {
        assert_eq!(IdentityChain::default().resolve(None), None);
    }

    #[test]
    fn failing_backend_is_skipped() {
        let chain = IdentityChain::new(vec![Arc::new(Failing), Arc::new(StaticPrincipal(PrincipalId::Numeric(7)))]);
        assert_eq!(chain.resolve(None), Some(PrincipalId::Numeric(7)));
    }

    #[test]
    fn first_success_wins() {
        let chain = IdentityChain::new(vec![
            Arc::new(StaticPrincipal(PrincipalId::Text("first".into()))),
            Arc::new(StaticPrincipal(PrincipalId::Text("second".into()))),
        ]);
        assert_eq!(chain.resolve(None), Some(PrincipalId::Text("first".into())));
    }

    #[test]
    fn session_principal_reads_numeric_and_string_ids() {
        let resolver = SessionPrincipal::new("auth_id");
        let numeric = session(json!({ "auth_id": 42 }));
        assert_eq!(resolver.current_principal(Some(&numeric)).expect("resolve"), Some(PrincipalId::Numeric(42)));

        let text = session(json!({ "auth_id": "17" }));
        assert_eq!(resolver.current_principal(Some(&text)).expect("resolve"), Some(PrincipalId::Numeric(17)));
    }

    #[test]
    fn session_principal_follows_the_session_it_is_given() {
        let chain = IdentityChain::new(vec![Arc::new(SessionPrincipal::new("auth_id"))]);
        assert_eq!(chain.resolve(None), None);

        let first = session(json!({ "auth_id": 1 }));
        let second = session(json!({ "auth_id": 2 }));
        assert_eq!(chain.resolve(Some(&first)), Some(PrincipalId::Numeric(1)));
        assert_eq!(chain.resolve(Some(&second)), Some(PrincipalId::Numeric(2)));
    }

    #[test]
    fn session_principal_without_session_is_unavailable() {
        let resolver = SessionPrincipal::new("auth_id");
        assert!(!resolver.is_available(None));
        assert!(resolver.is_available(Some(&session(json!({})))));
    }

    #[test]
    fn session_principal_rejects_compound_values() {
        let resolver = SessionPrincipal::new("auth_id");
        let compound = session(json!({ "auth_id": { "id": 1 } }));
        assert!(resolver.current_principal(Some(&compound)).is_err());
    }

    #[test]
    fn env_principal_follows_variable() {
        temp_env::with_var("LOGCTX_TEST_PRINCIPAL", Some("alice"), || {
            let resolver = EnvPrincipal::new("LOGCTX_TEST_PRINCIPAL");
            assert!(resolver.is_available(None));
            assert_eq!(resolver.current_principal(None).expect("resolve"), Some(PrincipalId::Text("alice".into())));
        });
        temp_env::with_var("LOGCTX_TEST_PRINCIPAL", None::<&str>, || {
            assert!(!EnvPrincipal::new("LOGCTX_TEST_PRINCIPAL").is_available(None));
        });
    }
}
