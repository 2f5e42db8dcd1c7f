//! Redaction of sensitive fields in diagnostic records.
use std::collections::HashSet;

use serde_json::{Map, Value};

/// Replacement written over every masked value.
pub const MASK: &str = "XXXXX";

/// Keys masked by every [`FieldMasker`], compared case-insensitively.
pub const DEFAULT_MASKED_FIELDS: &[&str] = &["authorization", "proxy-authorization"];

/// Case-insensitive deny-list of keys whose values must never reach the logs.
///
/// Each admin client owns its own masker, so extra fields configured for one
/// instance do not leak into another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMasker {
    fields: HashSet<String>,
}

impl Default for FieldMasker {
    fn default() -> Self {
        Self::new(std::iter::empty::<&str>())
    }
}

impl FieldMasker {
    /// Build a masker from the default deny-list plus `extra` keys.
    pub fn new<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let fields = DEFAULT_MASKED_FIELDS
            .iter()
            .map(|field| field.to_string())
            .chain(extra.into_iter().map(|field| field.as_ref().to_lowercase()))
            .filter(|field| !field.is_empty())
            .collect();
        Self { fields }
    }

    pub fn is_masked(&self, key: &str) -> bool {
        self.fields.contains(&key.to_lowercase())
    }

    /// Deep copy of `value` with every matching key's value replaced by [`MASK`].
    ///
    /// Objects nested inside arrays are traversed as well. A matching key masks
    /// its whole value, even when that value is itself an object.
    pub fn mask(&self, value: &Value) -> Value {
        match value {
            Value::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(key, value)| {
                        let masked = if self.is_masked(key) {
                            Value::String(MASK.to_string())
                        } else {
                            self.mask(value)
                        };
                        (key.clone(), masked)
                    })
                    .collect::<Map<String, Value>>(),
            ),
            Value::Array(items) => Value::Array(items.iter().map(|item| self.mask(item)).collect()),
            other => other.clone(),
        }
    }
}
