use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Symbolic model keys mapped to the asset URL they load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelRegistry {
    entries: HashMap<String, String>,
}

impl ModelRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry while building the registry.
    pub fn with_model(mut self, key: impl Into<String>, url: impl Into<String>) -> Self {
        self.entries.insert(key.into(), url.into());
        self
    }

    /// Returns the URL registered for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns all keys in lexical order.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_returns_registered_url() {
        let registry = ModelRegistry::new()
            .with_model("loving", "https://cdn/a.glb")
            .with_model("minimal", "https://cdn/b.glb");
        assert_eq!(registry.get("minimal"), Some("https://cdn/b.glb"));
        assert!(registry.get("bold").is_none());
        assert_eq!(registry.keys(), vec!["loving", "minimal"]);
    }

    #[test]
    fn deserializes_from_plain_object() {
        let registry: ModelRegistry =
            serde_json::from_str(r#"{"loving": "https://cdn/a.glb"}"#).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("loving"));
    }
}
