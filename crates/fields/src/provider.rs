use logctx_types::FieldValue;
use serde_json::Value;

use crate::FieldContext;

/// A named unit of logic that computes one field.
///
/// Providers read from the [`FieldContext`] and must not mutate host state.
/// Arity is not checked at registration; providers validate `args` when
/// invoked and report [`crate::FieldError::InvalidArguments`] themselves.
pub trait FieldProvider: Send + Sync {
    fn provide(&self, context: &FieldContext, args: &[Value]) -> anyhow::Result<FieldValue>;
}

impl<F> FieldProvider for F
where
    F: Fn(&FieldContext, &[Value]) -> anyhow::Result<FieldValue> + Send + Sync,
{
    fn provide(&self, context: &FieldContext, args: &[Value]) -> anyhow::Result<FieldValue> {
        self(context, args)
    }
}
