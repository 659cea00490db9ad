//! Contracts the host application implements to feed raw context into the
//! field registry.
//!
//! Every accessor is owned by the host and shared with the registry behind an
//! `Arc`. Implementations must be read-only from the registry's point of view.

use std::fmt::Debug;

use serde_json::Value;

use crate::PrincipalId;

/// Read access to the active session store.
pub trait SessionAccessor: Send + Sync + Debug {
    /// Raw session identifier. Never written to records unhashed.
    fn id(&self) -> String;

    /// Value stored under `key`, or `None` when the key is not present.
    fn get(&self, key: &str) -> Option<Value>;
}

/// Read access to the inbound request.
pub trait RequestAccessor: Send + Sync + Debug {
    /// Request path, with or without a leading slash.
    fn path(&self) -> String;

    /// Raw query string without the leading `?`.
    fn query_string(&self) -> Option<String>;

    /// HTTP method token, e.g. `GET`.
    fn method(&self) -> String;

    /// Address of the server socket the request arrived on (`SERVER_ADDR`).
    fn server_addr(&self) -> Option<String>;

    /// Client address after applying the host's proxy-forwarding rules.
    fn client_ip(&self) -> Option<String>;

    /// Raw `User-Agent` header.
    fn user_agent(&self) -> Option<String>;
}

/// Source of the process (or request) correlation token.
pub trait TokenSource: Send + Sync + Debug {
    fn token(&self) -> String;
}

/// One pluggable authentication backend that may or may not be installed in
/// the host application.
///
/// Both queries receive the session the registry holds at evaluation time, so
/// session-backed resolvers follow later `set_session_accessor` calls.
pub trait IdentityResolver: Send + Sync + Debug {
    /// Short backend name used in diagnostics.
    fn backend(&self) -> &str;

    /// Whether the backend is present and usable right now.
    fn is_available(&self, session: Option<&dyn SessionAccessor>) -> bool;

    /// Identifier of the currently authenticated principal, if any.
    ///
    /// Errors are treated by callers as "try the next backend".
    fn current_principal(&self, session: Option<&dyn SessionAccessor>) -> anyhow::Result<Option<PrincipalId>>;
}
