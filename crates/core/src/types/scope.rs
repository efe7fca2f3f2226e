//! The structured key/value scope that pipeline components read from and write to

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::ops::{Deref, DerefMut};

/// Accumulating output scope of a pipeline run.
///
/// Later writes win on key collision, so merging step *i*'s output over the
/// scope of steps `0..i` gives the union with step *i* taking precedence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scope(Map<String, Value>);

impl Scope {
    /// Create a new empty scope
    #[must_use]
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Create from an existing JSON object
    #[must_use]
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Insert a value, returning the previous value if any
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Look a key up, first as a flat key and then as a dotted path into
    /// nested objects (`"db.host"`)
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<&Value> {
        if let Some(value) = self.0.get(key) {
            return Some(value);
        }
        if !key.contains('.') {
            return None;
        }

        let mut segments = key.split('.');
        let first = segments.next()?;
        let mut current = self.0.get(first)?;
        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Merge an object into this scope; keys in `other` overwrite existing ones
    pub fn merge(&mut self, other: Map<String, Value>) {
        self.0.extend(other);
    }

    /// Merge a JSON value into this scope if it is an object.
    ///
    /// Returns `false` (and leaves the scope untouched) for non-object values.
    pub fn merge_value(&mut self, value: &Value) -> bool {
        match value {
            Value::Object(map) => {
                self.0
                    .extend(map.iter().map(|(k, v)| (k.clone(), v.clone())));
                true
            }
            _ => false,
        }
    }

    /// Convert to the inner JSON object
    #[must_use]
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    /// Convert to a JSON value
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

impl Deref for Scope {
    type Target = Map<String, Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Scope {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Map<String, Value>> for Scope {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl IntoIterator for Scope {
    type Item = (String, Value);
    type IntoIter = serde_json::map::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
