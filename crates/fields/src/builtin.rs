//! Built-in field providers bound by every new registry.

use std::fmt;

use logctx_types::FieldValue;
use serde_json::Value;
use sha1::{Digest, Sha1};

use crate::{FieldContext, FieldError, FieldProvider};

/// The fixed set of providers every registry starts with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BuiltinField {
    SessionId,
    Url,
    RequestMethod,
    ServerIp,
    ClientIp,
    ClientUserAgent,
    Environment,
    FromSession,
    UserId,
    ProcessIdentifier,
}

impl BuiltinField {
    pub const ALL: [BuiltinField; 10] = [
        BuiltinField::SessionId,
        BuiltinField::Url,
        BuiltinField::RequestMethod,
        BuiltinField::ServerIp,
        BuiltinField::ClientIp,
        BuiltinField::ClientUserAgent,
        BuiltinField::Environment,
        BuiltinField::FromSession,
        BuiltinField::UserId,
        BuiltinField::ProcessIdentifier,
    ];

    /// Registered name of the field.
    pub const fn name(self) -> &'static str {
        match self {
            BuiltinField::SessionId => "sessionId",
            BuiltinField::Url => "url",
            BuiltinField::RequestMethod => "requestMethod",
            BuiltinField::ServerIp => "serverIp",
            BuiltinField::ClientIp => "clientIp",
            BuiltinField::ClientUserAgent => "clientUserAgent",
            BuiltinField::Environment => "environment",
            BuiltinField::FromSession => "fromSession",
            BuiltinField::UserId => "userId",
            BuiltinField::ProcessIdentifier => "processIdentifier",
        }
    }

    /// Whether the provider needs call arguments.
    pub const fn takes_arguments(self) -> bool {
        matches!(self, BuiltinField::FromSession)
    }

    fn evaluate(self, context: &FieldContext, args: &[Value]) -> Result<FieldValue, FieldError> {
        let value: FieldValue = match self {
            BuiltinField::SessionId => context.session().map(|session| hash_session_id(&session.id())).into(),
            BuiltinField::Url => context.request().map(|request| build_url(&request.path(), request.query_string().as_deref())).into(),
            BuiltinField::RequestMethod => context.request().map(|request| request.method()).into(),
            BuiltinField::ServerIp => context.request().and_then(|request| request.server_addr()).into(),
            BuiltinField::ClientIp => context.request().and_then(|request| request.client_ip()).into(),
            BuiltinField::ClientUserAgent => context.request().and_then(|request| request.user_agent()).into(),
            BuiltinField::Environment => context.environment().into(),
            BuiltinField::FromSession => {
                let Some(session) = context.session() else {
                    return Ok(FieldValue::Absent);
                };
                let key = session_key_argument(args)?;
                session.get(key).map(FieldValue::from_json).unwrap_or_default()
            }
            BuiltinField::UserId => context.identity().resolve(context.session()).into(),
            BuiltinField::ProcessIdentifier => {
                let token_source = context.token_source().ok_or_else(|| FieldError::MissingRequiredContext {
                    field: self.name().to_string(),
                    context: "token accessor",
                })?;
                FieldValue::Text(token_source.token())
            }
        };
        Ok(value)
    }
}

impl fmt::Display for BuiltinField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FieldProvider for BuiltinField {
    fn provide(&self, context: &FieldContext, args: &[Value]) -> anyhow::Result<FieldValue> {
        Ok(self.evaluate(context, args)?)
    }
}

/// Lowercase hex SHA-1 of the session identifier. The raw id never reaches a record.
pub fn hash_session_id(session_id: &str) -> String {
    hex::encode(Sha1::digest(session_id.as_bytes()))
}

/// Joins a request path and optional query string into a rooted URL.
pub fn build_url(path: &str, query_string: Option<&str>) -> String {
    let mut url = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    if let Some(query) = query_string.filter(|query| !query.is_empty()) {
        url.push('?');
        url.push_str(query);
    }
    url
}

fn session_key_argument(args: &[Value]) -> Result<&str, FieldError> {
    match args {
        [Value::String(key), ..] => Ok(key.as_str()),
        _ => Err(FieldError::InvalidArguments {
            field: BuiltinField::FromSession.name().to_string(),
            expected: "a session key string",
            received: args.len(),
        }),
    }
}
