//! In-memory session snapshot.

use indexmap::IndexMap;
use logctx_types::SessionAccessor;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Session state captured from the host's session store.
///
/// Deserializes from `{"id": "...", "values": {...}}`.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct MemorySession {
    pub id: String,
    #[serde(default)]
    pub values: IndexMap<String, Value>,
}

impl MemorySession {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            values: IndexMap::new(),
        }
    }

    /// Builder-style insert.
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl SessionAccessor for MemorySession {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_snapshot_without_values() {
        let session: MemorySession = serde_json::from_str(r#"{"id": "abc"}"#).expect("session");
        assert_eq!(session.id(), "abc");
        assert!(session.get("anything").is_none());
    }

    #[test]
    fn get_returns_stored_value() {
        let session = MemorySession::new("abc").with_value("cart", json!({"items": 2}));
        assert_eq!(session.get("cart"), Some(json!({"items": 2})));
    }
}
