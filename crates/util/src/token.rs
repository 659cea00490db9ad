//! Per-process correlation token.

use logctx_types::TokenSource;
use uuid::Uuid;

/// Token generated once and reused for every record emitted by this process,
/// so records from one run can be grouped together downstream.
#[derive(Debug, Clone)]
pub struct ProcessToken {
    token: String,
}

impl ProcessToken {
    /// Generates a fresh random token.
    pub fn generate() -> Self {
        Self {
            token: Uuid::new_v4().to_string(),
        }
    }

    /// Uses a caller-supplied token, e.g. one propagated from an upstream service.
    pub fn from_token(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

impl Default for ProcessToken {
    fn default() -> Self {
        Self::generate()
    }
}

impl TokenSource for ProcessToken {
    fn token(&self) -> String {
        self.token.clone()
    }
}
