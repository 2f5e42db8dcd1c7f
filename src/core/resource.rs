//! Admin API resources.
//!
//! APIs and plugins are free-form JSON objects on the Kong side; only a handful
//! of keys (`name`, `id`, `api_id`) carry meaning for reconciliation. Everything
//! else is passed through untouched.
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A single API or plugin object as sent to or received from the admin API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Resource(Map<String, Value>);

impl Resource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field setter.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.0
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
    }

    /// Server-assigned identifier. Numeric ids are rendered as strings.
    pub fn id(&self) -> Option<String> {
        identifier(self.0.get("id"))
    }

    /// Back-reference to the owning API on globally listed plugins.
    ///
    /// Kong omits the key (or sends a falsy value) for root plugins.
    pub fn owning_api(&self) -> Option<&Value> {
        self.0.get("api_id").filter(|value| is_truthy(value))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Shallow merge where `self` (the desired state) wins.
    ///
    /// Every top-level key of `existing` that `self` lacks is copied over, which
    /// is how the server `id` reaches the upsert body. Values are never merged
    /// recursively: a desired `config` object replaces the existing one whole.
    pub fn with_defaults_from(mut self, existing: &Resource) -> Self {
        for (key, value) in &existing.0 {
            if !self.0.contains_key(key) {
                self.0.insert(key.clone(), value.clone());
            }
        }
        self
    }
}

impl From<Map<String, Value>> for Resource {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

impl TryFrom<Value> for Resource {
    type Error = Value;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(other),
        }
    }
}

impl From<Resource> for Value {
    fn from(resource: Resource) -> Self {
        Value::Object(resource.0)
    }
}

/// Render an `id` value as a string; empty strings count as missing.
pub(crate) fn identifier(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(id)) if !id.is_empty() => Some(id.clone()),
        Some(Value::Number(id)) => Some(id.to_string()),
        _ => None,
    }
}

/// JavaScript-style truthiness, matching how Kong clients treat optional keys.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Desired API definition, optionally carrying the plugins to attach to it.
///
/// The `plugins` list is a client-side convenience and is never part of the
/// API body sent to Kong.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugins: Option<Vec<Resource>>,
    #[serde(flatten)]
    pub fields: Resource,
}

impl ApiDefinition {
    pub fn new(fields: Resource) -> Self {
        Self {
            plugins: None,
            fields,
        }
    }

    pub fn with_plugins(mut self, plugins: Vec<Resource>) -> Self {
        self.plugins = Some(plugins);
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.fields.name()
    }

    /// Split into the API body and its detached plugin list.
    pub fn into_parts(self) -> (Resource, Option<Vec<Resource>>) {
        (self.fields, self.plugins)
    }
}

/// One page of a plugin listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginPage {
    #[serde(default)]
    pub data: Vec<Resource>,
    /// Continuation token; `None` marks the last page.
    #[serde(
        default,
        deserialize_with = "deserialize_offset",
        skip_serializing_if = "Option::is_none"
    )]
    pub offset: Option<String>,
}

impl PluginPage {
    pub fn new(data: Vec<Resource>, offset: Option<String>) -> Self {
        Self { data, offset }
    }
}

fn deserialize_offset<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(offset)) if !offset.is_empty() => Some(offset),
        Some(Value::Number(offset)) => Some(offset.to_string()),
        _ => None,
    })
}
