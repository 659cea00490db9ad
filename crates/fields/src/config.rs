//! Configuration of which fields end up in a record.
//!
//! The file maps output keys to field bindings, sets the environment label,
//! and lists identity backends in the order `userId` should try them:
//!
//! ```json
//! {
//!   "environment": "production",
//!   "fields": {
//!     "session_id": "sessionId",
//!     "cart": "fromSession:cart_id",
//!     "user_id": "userId"
//!   },
//!   "identity": [
//!     { "kind": "session", "key": "auth_user_id" },
//!     { "kind": "env", "var": "LOGCTX_USER_ID" }
//!   ]
//! }
//! ```
//!
//! YAML is accepted for files ending in `.yaml` or `.yml`.

use std::{fmt, fs, path::Path, path::PathBuf, str::FromStr, sync::Arc};

use heck::ToSnakeCase;
use indexmap::IndexMap;
use logctx_types::{IdentityResolver, PrincipalId};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::{
    BuiltinField, FieldRegistry,
    identity::{EnvPrincipal, SessionPrincipal, StaticPrincipal},
};

/// Environment variable overriding the configuration file location.
pub const CONFIG_PATH_ENV: &str = "LOGCTX_CONFIG_PATH";

/// Default configuration file name under `<config_dir>/logctx/`.
pub const CONFIG_FILE_NAME: &str = "fields.json";

static FIELD_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("field name pattern"));

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid field binding '{binding}': {reason}")]
    InvalidBinding { binding: String, reason: &'static str },
}

/// A field name plus the arguments to evaluate it with.
///
/// String form: `name` or `name:arg1,arg2`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldBinding {
    field: String,
    args: Vec<Value>,
}

impl FieldBinding {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            args: Vec::new(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }
}

impl FromStr for FieldBinding {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| ConfigError::InvalidBinding {
            binding: raw.to_string(),
            reason,
        };
        let (field, args) = match raw.split_once(':') {
            Some((field, args)) => (field.trim(), Some(args)),
            None => (raw.trim(), None),
        };
        if !FIELD_NAME.is_match(field) {
            return Err(invalid("field name must be an identifier"));
        }
        let args = match args {
            Some(args) => {
                let parsed: Vec<&str> = args.split(',').map(str::trim).collect();
                if parsed.iter().any(|arg| arg.is_empty()) {
                    return Err(invalid("arguments must not be empty"));
                }
                parsed.into_iter().map(|arg| Value::String(arg.to_string())).collect()
            }
            None => Vec::new(),
        };
        Ok(Self {
            field: field.to_string(),
            args,
        })
    }
}

impl TryFrom<String> for FieldBinding {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FieldBinding> for String {
    fn from(binding: FieldBinding) -> Self {
        binding.to_string()
    }
}

impl fmt::Display for FieldBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.field)?;
        let args: Vec<String> = self
            .args
            .iter()
            .map(|arg| arg.as_str().map(str::to_string).unwrap_or_else(|| arg.to_string()))
            .collect();
        if !args.is_empty() {
            write!(f, ":{}", args.join(","))?;
        }
        Ok(())
    }
}

/// Ordered mapping from record key to binding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldBindings(IndexMap<String, FieldBinding>);

impl FieldBindings {
    /// Every argument-free built-in, keyed by the snake_case form of its name.
    pub fn defaults() -> Self {
        BuiltinField::ALL
            .into_iter()
            .filter(|field| !field.takes_arguments())
            .map(|field| (field.name().to_snake_case(), FieldBinding::new(field.name())))
            .collect()
    }

    pub fn insert(&mut self, key: impl Into<String>, binding: FieldBinding) {
        self.0.insert(key.into(), binding);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldBinding)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, FieldBinding)> for FieldBindings {
    fn from_iter<I: IntoIterator<Item = (String, FieldBinding)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Identity backend declared in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IdentitySource {
    /// Principal id stored in the session under `key`.
    Session { key: String },
    /// Principal id read from the environment variable `var`.
    Env { var: String },
    /// Fixed principal.
    Static { id: PrincipalId },
}

impl IdentitySource {
    fn build(&self) -> Arc<dyn IdentityResolver> {
        match self {
            IdentitySource::Session { key } => Arc::new(SessionPrincipal::new(key.clone())),
            IdentitySource::Env { var } => Arc::new(EnvPrincipal::new(var.clone())),
            IdentitySource::Static { id } => Arc::new(StaticPrincipal(id.clone())),
        }
    }
}

/// Top-level configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldsConfig {
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub fields: FieldBindings,
    #[serde(default)]
    pub identity: Vec<IdentitySource>,
}

impl FieldsConfig {
    /// Configured bindings, or [`FieldBindings::defaults`] when none are listed.
    pub fn bindings(&self) -> FieldBindings {
        if self.fields.is_empty() {
            FieldBindings::defaults()
        } else {
            self.fields.clone()
        }
    }

    /// Applies the environment label and appends the identity backends, in
    /// declared order, to `registry`. Session backends read whichever session
    /// the registry holds when `userId` is evaluated.
    pub fn apply(&self, registry: &mut FieldRegistry) {
        if let Some(environment) = &self.environment {
            registry.set_environment(environment.clone());
        }
        for source in &self.identity {
            registry.push_identity_resolver(source.build());
        }
    }
}

/// Returns the default path for the configuration file.
pub fn default_config_path() -> PathBuf {
    logctx_util::config_file_path(CONFIG_PATH_ENV, CONFIG_FILE_NAME)
}

/// Loads configuration from the default path.
pub fn load_config() -> Result<FieldsConfig, ConfigError> {
    load_config_from_path(&default_config_path())
}

/// Loads configuration from `path`. A missing file yields the defaults.
pub fn load_config_from_path(path: &Path) -> Result<FieldsConfig, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no field configuration found; using defaults");
            return Ok(FieldsConfig::default());
        }
        Err(error) => return Err(ConfigError::Io(error)),
    };

    let is_yaml = matches!(path.extension().and_then(|ext| ext.to_str()), Some("yaml" | "yml"));
    let config = if is_yaml {
        serde_yaml::from_str(&content)?
    } else {
        serde_json::from_str(&content)?
    };
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use logctx_types::FieldValue;
    use logctx_util::MemorySession;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn binding_parses_name_and_arguments() {
        let binding: FieldBinding = " fromSession : cart_id , locale ".parse().expect("binding");
        assert_eq!(binding.field(), "fromSession");
        assert_eq!(binding.args(), &[json!("cart_id"), json!("locale")]);
        assert_eq!(binding.to_string(), "fromSession:cart_id,locale");
    }

    #[test]
    fn binding_rejects_bad_names_and_empty_arguments() {
        assert!(matches!("".parse::<FieldBinding>(), Err(ConfigError::InvalidBinding { .. })));
        assert!(matches!("user-id".parse::<FieldBinding>(), Err(ConfigError::InvalidBinding { .. })));
        assert!(matches!("fromSession:".parse::<FieldBinding>(), Err(ConfigError::InvalidBinding { .. })));
        assert!(matches!("fromSession:a,,b".parse::<FieldBinding>(), Err(ConfigError::InvalidBinding { .. })));
    }

    #[test]
    fn defaults_use_snake_case_keys_and_skip_argument_fields() {
        let defaults = FieldBindings::defaults();
        let keys: Vec<_> = defaults.iter().map(|(key, _)| key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "session_id",
                "url",
                "request_method",
                "server_ip",
                "client_ip",
                "client_user_agent",
                "environment",
                "user_id",
                "process_identifier",
            ]
        );
    }

    #[test]
    fn deserializes_full_document() {
        let json = r#"{
          "environment": "production",
          "fields": { "sid": "sessionId", "cart": "fromSession:cart_id" },
          "identity": [
            { "kind": "session", "key": "auth_user_id" },
            { "kind": "env", "var": "APP_USER" },
            { "kind": "static", "id": 42 }
          ]
        }"#;
        let config: FieldsConfig = serde_json::from_str(json).expect("config");
        assert_eq!(config.environment.as_deref(), Some("production"));
        assert_eq!(config.bindings().len(), 2);
        assert_eq!(
            config.identity[2],
            IdentitySource::Static {
                id: PrincipalId::Numeric(42)
            }
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(serde_json::from_str::<FieldsConfig>(r#"{ "environmnet": "prod" }"#).is_err());
    }

    #[test]
    fn invalid_binding_fails_deserialization() {
        assert!(serde_json::from_str::<FieldsConfig>(r#"{ "fields": { "x": "not a name" } }"#).is_err());
    }

    #[test]
    fn apply_sets_environment_and_identity_order() {
        let config: FieldsConfig = serde_json::from_value(json!({
            "environment": "staging",
            "identity": [
                { "kind": "session", "key": "auth_user_id" },
                { "kind": "static", "id": "fallback" }
            ]
        }))
        .expect("config");

        let mut registry = FieldRegistry::new();
        config.apply(&mut registry);
        assert_eq!(registry.evaluate("environment", &[]).expect("environment"), FieldValue::from("staging"));
        assert_eq!(registry.evaluate("userId", &[]).expect("user"), FieldValue::from("fallback"));

        registry.set_session_accessor(Arc::new(MemorySession::new("s").with_value("auth_user_id", 9)));
        assert_eq!(registry.evaluate("userId", &[]).expect("user"), FieldValue::Integer(9));
    }

    #[test]
    fn session_identity_follows_sessions_set_after_apply() {
        let config: FieldsConfig = serde_json::from_value(json!({
            "identity": [{ "kind": "session", "key": "auth_user_id" }]
        }))
        .expect("config");
        let mut registry = FieldRegistry::new();
        config.apply(&mut registry);
        assert_eq!(registry.evaluate("userId", &[]).expect("no session"), FieldValue::Absent);

        registry.set_session_accessor(Arc::new(MemorySession::new("a").with_value("auth_user_id", 42)));
        assert_eq!(registry.evaluate("userId", &[]).expect("first session"), FieldValue::Integer(42));

        registry.set_session_accessor(Arc::new(MemorySession::new("b").with_value("auth_user_id", 2)));
        assert_eq!(registry.evaluate("userId", &[]).expect("replaced session"), FieldValue::Integer(2));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = load_config_from_path(&dir.path().join("absent.json")).expect("defaults");
        assert!(config.environment.is_none());
        assert_eq!(config.bindings(), FieldBindings::defaults());
    }

    #[test]
    fn loads_yaml_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().expect("tempfile");
        writeln!(file, "environment: production\nfields:\n  url: url\n  cart: \"fromSession:cart\"").expect("write");
        let config = load_config_from_path(file.path()).expect("yaml config");
        assert_eq!(config.environment.as_deref(), Some("production"));
        let keys: Vec<_> = config.bindings().iter().map(|(key, _)| key.clone()).collect();
        assert_eq!(keys, vec!["url".to_string(), "cart".to_string()]);
    }

    #[test]
    fn default_path_honors_environment_override() {
        temp_env::with_var(CONFIG_PATH_ENV, Some("/tmp/logctx-test/fields.json"), || {
            assert_eq!(default_config_path(), PathBuf::from("/tmp/logctx-test/fields.json"));
        });
    }
}
