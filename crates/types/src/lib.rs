//! Shared types for the logctx workspace: the values field providers produce
//! and the accessor contracts through which the host supplies raw context.

mod accessor;
mod value;

pub use accessor::{IdentityResolver, RequestAccessor, SessionAccessor, TokenSource};
pub use value::{FieldValue, PrincipalId};
