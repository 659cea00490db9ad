use thiserror::Error;

/// Errors surfaced by [`crate::FieldRegistry::evaluate`].
///
/// A missing value is not an error; providers report it as
/// [`logctx_types::FieldValue::Absent`].
#[derive(Debug, Error)]
pub enum FieldError {
    /// No provider is registered under the requested name.
    #[error("field '{name}' does not exist")]
    UnknownField { name: String },

    /// A mandatory accessor was never injected before evaluation.
    #[error("field '{field}' requires the {context} to be set before evaluation")]
    MissingRequiredContext { field: String, context: &'static str },

    /// The provider was invoked with arguments it cannot use.
    #[error("field '{field}' expects {expected}, received {received} argument(s)")]
    InvalidArguments {
        field: String,
        expected: &'static str,
        received: usize,
    },

    /// The provider itself failed.
    #[error("field '{field}' provider failed: {source}")]
    Provider {
        field: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

impl FieldError {
    /// Name of the field the error refers to.
    pub fn field(&self) -> &str {
        match self {
            FieldError::UnknownField { name } => name,
            FieldError::MissingRequiredContext { field, .. }
            | FieldError::InvalidArguments { field, .. }
            | FieldError::Provider { field, .. } => field,
        }
    }

    /// Wraps an arbitrary provider failure, passing typed field errors through unchanged.
    pub(crate) fn from_provider(field: &str, error: anyhow::Error) -> Self {
        match error.downcast::<FieldError>() {
            Ok(field_error) => field_error,
            Err(source) => FieldError::Provider {
                field: field.to_string(),
                source: source.into(),
            },
        }
    }
}
