//! Personalization pipeline: the named values available to template tokens.
//!
//! A pipeline is created per composition, filled while binding, and read by
//! the template engine once composition starts.
//!
//! # Example
//!
//! ```ignore
//! let mut pipeline = PersonalizationPipeline::new();
//! pipeline
//!     .map("User", "John")?
//!     .map("Stats", json!({"Count": 42}))?;
//!
//! assert!(pipeline.has("User"));
//! ```

mod value;

use serde::Serialize;
use thiserror::Error;

pub use value::{canonical_string, PipelineValue, PropertyError, PropertyReadable, PropertyResult};

/// Pipeline-specific error type
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Pipeline entry not found: {0}")]
    KeyNotFound(String),

    #[error("Failed to serialize pipeline value '{name}': {source}")]
    Serialize {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// A named pipeline value
#[derive(Debug, Clone)]
pub struct PipelineEntry {
    name: String,
    value: PipelineValue,
}

impl PipelineEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &PipelineValue {
        &self.value
    }

    /// Read `property` from the entry's value
    pub fn read(&self, property: &str) -> PropertyResult<String> {
        self.value.read(property)
    }
}

/// Named-value registry used to resolve `{Entity.Property}` tokens.
///
/// Last write wins per name. Enumeration follows last-insertion order.
#[derive(Debug, Clone, Default)]
pub struct PersonalizationPipeline {
    entries: Vec<PipelineEntry>,
}

impl PersonalizationPipeline {
    /// Create an empty pipeline
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pipeline from name/value pairs, applied in order
    pub fn from_pairs<I, K, V>(pairs: I) -> PipelineResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<PipelineValue>,
    {
        let mut pipeline = Self::new();
        pipeline.map_range(pairs)?;
        Ok(pipeline)
    }

    /// Insert or overwrite the entry for `name`
    pub fn map(
        &mut self,
        name: impl Into<String>,
        value: impl Into<PipelineValue>,
    ) -> PipelineResult<&mut Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(PipelineError::InvalidArgument(
                "Pipeline entry name must not be empty".to_string(),
            ));
        }

        self.entries.retain(|entry| entry.name != name);
        self.entries.push(PipelineEntry {
            name,
            value: value.into(),
        });

        Ok(self)
    }

    /// Map any serializable value; its fields become readable properties
    pub fn map_serialized<T: Serialize + ?Sized>(
        &mut self,
        name: impl Into<String>,
        value: &T,
    ) -> PipelineResult<&mut Self> {
        let name = name.into();
        let structured = serde_json::to_value(value).map_err(|source| PipelineError::Serialize {
            name: name.clone(),
            source,
        })?;
        self.map(name, structured)
    }

    /// Apply `map` for each pair in order. Stops at the first invalid name.
    pub fn map_range<I, K, V>(&mut self, pairs: I) -> PipelineResult<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<PipelineValue>,
    {
        for (name, value) in pairs {
            self.map(name, value)?;
        }
        Ok(self)
    }

    /// Check if an entry exists
    pub fn has(&self, name: &str) -> bool {
        self.entries.iter().any(|entry| entry.name == name)
    }

    /// Get an entry by name
    pub fn get(&self, name: &str) -> PipelineResult<&PipelineEntry> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .ok_or_else(|| PipelineError::KeyNotFound(name.to_string()))
    }

    /// Entries in last-insertion order
    pub fn entries(&self) -> impl Iterator<Item = &PipelineEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove all entries
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    #[serde(rename_all = "PascalCase")]
    struct User {
        first_name: String,
        age: u32,
    }

    #[test]
    fn test_map_and_get() {
        let mut pipeline = PersonalizationPipeline::new();
        pipeline.map("User", "John").unwrap().map("Count", 3).unwrap();

        assert!(pipeline.has("User"));
        assert!(pipeline.has("Count"));
        assert_eq!(pipeline.get("User").unwrap().read("Value").unwrap(), "John");
        assert_eq!(pipeline.len(), 2);
    }

    #[test]
    fn test_map_last_write_wins() {
        let mut pipeline = PersonalizationPipeline::new();
        pipeline
            .map("User", "John")
            .unwrap()
            .map("Site", "example.com")
            .unwrap()
            .map("User", "Jane")
            .unwrap();

        assert_eq!(pipeline.len(), 2);
        assert_eq!(pipeline.get("User").unwrap().read("Value").unwrap(), "Jane");

        let names: Vec<_> = pipeline.entries().map(|e| e.name()).collect();
        assert_eq!(names, vec!["Site", "User"]);
    }

    #[test]
    fn test_map_empty_name_rejected() {
        let mut pipeline = PersonalizationPipeline::new();
        assert!(matches!(
            pipeline.map("", "value"),
            Err(PipelineError::InvalidArgument(_))
        ));
        assert!(pipeline.is_empty());
    }

    #[test]
    fn test_get_missing_key() {
        let pipeline = PersonalizationPipeline::new();
        assert!(!pipeline.has("User"));
        assert!(matches!(
            pipeline.get("User"),
            Err(PipelineError::KeyNotFound(name)) if name == "User"
        ));
    }

    #[test]
    fn test_map_range() {
        let mut pipeline = PersonalizationPipeline::new();
        pipeline
            .map_range(vec![("A", json!("1")), ("B", json!({"X": 2}))])
            .unwrap();
        assert!(pipeline.has("A"));
        assert_eq!(pipeline.get("B").unwrap().read("X").unwrap(), "2");

        let empty: Vec<(String, String)> = Vec::new();
        pipeline.map_range(empty).unwrap();
        assert_eq!(pipeline.len(), 2);
    }

    #[test]
    fn test_map_serialized() {
        let mut pipeline = PersonalizationPipeline::new();
        let user = User {
            first_name: "John".to_string(),
            age: 30,
        };
        pipeline.map_serialized("User", &user).unwrap();

        let entry = pipeline.get("User").unwrap();
        assert_eq!(entry.read("FirstName").unwrap(), "John");
        assert_eq!(entry.read("Age").unwrap(), "30");
    }

    #[test]
    fn test_from_pairs_and_clear() {
        let mut pipeline =
            PersonalizationPipeline::from_pairs([("MachineName", "host-1"), ("Port", "25")]).unwrap();
        assert_eq!(pipeline.len(), 2);

        pipeline.clear();
        assert!(pipeline.is_empty());
    }
}
