//! Values stored in a personalization pipeline and how their properties are read.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

/// Property lookup error.
///
/// Never surfaces past the template engine: a failed lookup renders as an
/// empty string.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PropertyError {
    #[error("Property not found: {0}")]
    NotFound(String),

    #[error("Property could not be read: {0}")]
    Unreadable(String),
}

/// Result type for property lookups
pub type PropertyResult<T> = Result<T, PropertyError>;

/// Capability for values that expose named properties to template tokens.
///
/// Implement this for domain types that should be addressable as
/// `{Entity.Property}` without going through serde.
pub trait PropertyReadable: Send + Sync {
    /// Whether the value exposes any named properties at all.
    ///
    /// When `false`, every token addressing the value renders [`render`](Self::render)
    /// regardless of the property name used.
    fn has_properties(&self) -> bool {
        true
    }

    /// Read a single property as its canonical string form.
    fn read_property(&self, name: &str) -> PropertyResult<String>;

    /// Whole-value string conversion.
    fn render(&self) -> String;
}

impl PropertyReadable for Value {
    fn has_properties(&self) -> bool {
        matches!(self, Value::Object(map) if !map.is_empty())
    }

    fn read_property(&self, name: &str) -> PropertyResult<String> {
        match self {
            Value::Object(map) => map
                .get(name)
                .map(canonical_string)
                .ok_or_else(|| PropertyError::NotFound(name.to_string())),
            _ => Err(PropertyError::NotFound(name.to_string())),
        }
    }

    fn render(&self) -> String {
        canonical_string(self)
    }
}

/// Canonical string form of a JSON value.
///
/// Booleans render as `True`/`False`, null as the empty string, nested
/// arrays and objects as compact JSON.
pub fn canonical_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Null => String::new(),
        _ => value.to_string(),
    }
}

/// A value bound to a pipeline name.
#[derive(Clone)]
pub enum PipelineValue {
    /// Plain string, rendered verbatim for any property name
    Text(String),

    /// Structured value read through its JSON shape
    Structured(Value),

    /// Custom value exposing properties through [`PropertyReadable`]
    Readable(Arc<dyn PropertyReadable>),
}

impl PipelineValue {
    /// Resolve `property` against this value.
    pub fn read(&self, property: &str) -> PropertyResult<String> {
        match self {
            PipelineValue::Text(s) => Ok(s.clone()),
            PipelineValue::Structured(Value::String(s)) => Ok(s.clone()),
            PipelineValue::Structured(value) => read_from(value, property),
            PipelineValue::Readable(readable) => read_from(readable.as_ref(), property),
        }
    }
}

fn read_from<R: PropertyReadable + ?Sized>(value: &R, property: &str) -> PropertyResult<String> {
    if value.has_properties() {
        value.read_property(property)
    } else {
        Ok(value.render())
    }
}

impl fmt::Debug for PipelineValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineValue::Text(s) => f.debug_tuple("Text").field(s).finish(),
            PipelineValue::Structured(v) => f.debug_tuple("Structured").field(v).finish(),
            PipelineValue::Readable(r) => f.debug_tuple("Readable").field(&r.render()).finish(),
        }
    }
}

impl From<&str> for PipelineValue {
    fn from(value: &str) -> Self {
        PipelineValue::Text(value.to_string())
    }
}

impl From<String> for PipelineValue {
    fn from(value: String) -> Self {
        PipelineValue::Text(value)
    }
}

impl From<&String> for PipelineValue {
    fn from(value: &String) -> Self {
        PipelineValue::Text(value.clone())
    }
}

impl From<Value> for PipelineValue {
    fn from(value: Value) -> Self {
        PipelineValue::Structured(value)
    }
}

impl From<Arc<dyn PropertyReadable>> for PipelineValue {
    fn from(value: Arc<dyn PropertyReadable>) -> Self {
        PipelineValue::Readable(value)
    }
}

macro_rules! scalar_into_pipeline_value {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for PipelineValue {
                fn from(value: $ty) -> Self {
                    PipelineValue::Structured(Value::from(value))
                }
            }
        )*
    };
}

scalar_into_pipeline_value!(bool, i32, i64, u16, u32, u64, usize, f64);
