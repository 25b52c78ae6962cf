use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unknown model: {0}")]
    UnknownModel(String),
    #[error("duplicate model label: {0}")]
    DuplicateLabel(String),
}

/// A user-facing model label and the backend model it maps to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModelEntry {
    pub label: String,
    pub backend_id: String,
}

impl ModelEntry {
    pub fn new(label: impl Into<String>, backend_id: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            backend_id: backend_id.into(),
        }
    }
}

/// Static label → backend id table. Immutable once built.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    entries: Vec<ModelEntry>,
}

impl ModelRegistry {
    pub fn new(entries: Vec<ModelEntry>) -> Result<Self, RegistryError> {
        for (index, entry) in entries.iter().enumerate() {
            if entries[..index].iter().any(|e| e.label == entry.label) {
                return Err(RegistryError::DuplicateLabel(entry.label.clone()));
            }
        }
        Ok(Self { entries })
    }

    pub fn default_entries() -> Vec<ModelEntry> {
        vec![
            ModelEntry::new("GPT 4", "qwen3-max"),
            ModelEntry::new("Qwen 14B", "qwen3-max"),
            ModelEntry::new("Qwen Plus", "qwen3-max"),
        ]
    }

    /// Exact, case-sensitive lookup.
    pub fn resolve(&self, label: &str) -> Result<&str, RegistryError> {
        self.entries
            .iter()
            .find(|entry| entry.label == label)
            .map(|entry| entry.backend_id.as_str())
            .ok_or_else(|| RegistryError::UnknownModel(label.to_string()))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.label.as_str())
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self {
            entries: Self::default_entries(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_default_labels() {
        let registry = ModelRegistry::default();
        assert_eq!(registry.resolve("GPT 4"), Ok("qwen3-max"));
        assert_eq!(registry.resolve("Qwen Plus"), Ok("qwen3-max"));
    }

    #[test]
    fn lookup_is_case_sensitive_and_exact() {
        let registry = ModelRegistry::default();
        assert_eq!(
            registry.resolve("gpt 4"),
            Err(RegistryError::UnknownModel("gpt 4".to_string()))
        );
        assert!(registry.resolve("GPT 4 ").is_err());
        assert!(registry.resolve("").is_err());
    }

    #[test]
    fn rejects_duplicate_labels() {
        let result = ModelRegistry::new(vec![
            ModelEntry::new("a", "x"),
            ModelEntry::new("a", "y"),
        ]);
        assert_eq!(
            result.unwrap_err(),
            RegistryError::DuplicateLabel("a".to_string())
        );
    }

    #[test]
    fn labels_keep_configured_order() {
        let registry =
            ModelRegistry::new(vec![ModelEntry::new("b", "1"), ModelEntry::new("a", "2")]).unwrap();
        assert_eq!(registry.labels().collect::<Vec<_>>(), vec!["b", "a"]);
    }
}
