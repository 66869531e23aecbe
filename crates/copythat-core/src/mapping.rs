//! Data mapping
//!
//! Variable key → replacement text, handed over fully materialized by
//! whatever fetched the records from the CMS.

use crate::config::EmptyValuePolicy;
use crate::error::SyncError;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Read-only key-value source for a sync
///
/// Values that came from JSON `0` or `false` keep their text (`"0"`,
/// `"false"`) but are remembered as falsy, so the default
/// [`EmptyValuePolicy::TreatAsMissing`] treats them like empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Value")]
pub struct DataMapping {
    values: HashMap<String, String>,
    falsy: HashSet<String>,
}

impl DataMapping {
    /// Create an empty mapping
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a flat JSON object
    ///
    /// Strings are kept, numbers and booleans are stringified; `null`,
    /// arrays and nested objects are dropped.
    ///
    /// # Errors
    /// - `SyncError::InvalidMapping` if the input is not a JSON object
    pub fn from_json_str(json: &str) -> Result<Self, SyncError> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| SyncError::InvalidMapping(e.to_string()))?;
        Self::from_json(value)
    }

    /// Convert an already-parsed JSON object
    ///
    /// # Errors
    /// - `SyncError::InvalidMapping` if `value` is not an object
    pub fn from_json(value: Value) -> Result<Self, SyncError> {
        let Value::Object(fields) = value else {
            return Err(SyncError::InvalidMapping(format!(
                "expected a JSON object, found {}",
                kind_of(&value)
            )));
        };

        let mut mapping = Self::new();
        for (key, value) in fields {
            let falsy = is_falsy(&value);
            let text = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                other => {
                    tracing::debug!("Dropping field {:?}: {} values are not text", key, kind_of(&other));
                    continue;
                }
            };
            if falsy {
                mapping.falsy.insert(key.clone());
            }
            mapping.values.insert(key, text);
        }
        Ok(mapping)
    }

    /// Add or replace an entry
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        self.falsy.remove(&key);
        self.values.insert(key, value.into());
    }

    /// Raw value for a key
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Check if a value is empty or came from JSON `0` / `false`
    #[must_use]
    pub fn is_falsy(&self, key: &str) -> bool {
        self.falsy.contains(key) || self.get(key).is_some_and(str::is_empty)
    }

    /// Replacement text for a key under an empty-value policy
    ///
    /// `None` means the key counts as absent.
    #[must_use]
    pub fn resolve(&self, key: &str, policy: EmptyValuePolicy) -> Option<&str> {
        let value = self.get(key)?;
        match policy {
            EmptyValuePolicy::TreatAsMissing if self.is_falsy(key) => None,
            _ => Some(value),
        }
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if mapping has no entries
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for DataMapping {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut mapping = Self::new();
        for (key, value) in iter {
            mapping.insert(key, value);
        }
        mapping
    }
}

impl TryFrom<Value> for DataMapping {
    type Error = SyncError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_json(value)
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
