//! # Logctx Fields
//!
//! A registry of named field providers that compute contextual metadata
//! (hashed session id, request URL, client address, authenticated user,
//! process token, ...) for log and event records.
//!
//! The host application owns the session store, the request, the token
//! source, and any authentication backends; it hands them to the registry
//! through accessors. The logging pipeline then asks the registry for field
//! values, one name at a time or through a configured set of bindings.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use logctx_fields::{FieldRegistry, FieldValue};
//! use logctx_util::{ProcessToken, RequestSnapshot};
//!
//! let mut registry = FieldRegistry::new();
//! registry.set_request_accessor(Arc::new(RequestSnapshot::new("GET", "orders").with_query("page=2")));
//! registry.set_token_accessor(Arc::new(ProcessToken::from_token("run-1")));
//! registry.register_fn("service", |_, _| Ok(FieldValue::from("billing")));
//!
//! assert_eq!(registry.evaluate("url", &[])?, FieldValue::from("/orders?page=2"));
//! assert_eq!(registry.evaluate("service", &[])?, FieldValue::from("billing"));
//! assert!(registry.evaluate("sessionId", &[])?.is_absent());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - **`registry`**: name → provider map, accessor injection, dispatch
//! - **`builtin`**: the providers every registry starts with
//! - **`identity`**: ordered fallback across optional auth backends
//! - **`config`**: record bindings, environment label, identity sources
//! - **`shared`**: lock-protected registry for process-wide use

mod builtin;
pub mod config;
mod context;
mod error;
pub mod identity;
mod provider;
mod registry;
mod shared;

pub use builtin::{BuiltinField, build_url, hash_session_id};
pub use config::{ConfigError, FieldBinding, FieldBindings, FieldsConfig, IdentitySource, load_config, load_config_from_path};
pub use context::FieldContext;
pub use error::FieldError;
pub use identity::IdentityChain;
pub use logctx_types::{FieldValue, PrincipalId};
pub use provider::FieldProvider;
pub use registry::{FieldRecord, FieldRegistry};
pub use shared::SharedFieldRegistry;
