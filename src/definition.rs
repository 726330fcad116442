//! Store and dataset definitions
//!
//! Definitions built in Rust are typed structs and need no runtime checks.
//! Definitions arriving as JSON (configuration files, other processes) go
//! through [`validate_definition`] first, which gates the shape against the
//! closed key set of the target entity kind:
//!
//! ```text
//! store:   type, initialParams, uri, actions, onlyActions, paramId
//! dataset: partial, fragments, uri, actions, onlyActions
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::{ResourceError, Result};

/// Entity kind a definition is validated for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefinitionKind {
    Store,
    Dataset,
}

impl DefinitionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DefinitionKind::Store => "store",
            DefinitionKind::Dataset => "dataset",
        }
    }

    /// Recognized keys and the one value kind each accepts
    pub fn recognized_keys(&self) -> &'static [(&'static str, ValueKind)] {
        match self {
            DefinitionKind::Store => STORE_KEYS,
            DefinitionKind::Dataset => DATASET_KEYS,
        }
    }
}

impl fmt::Display for DefinitionKind {
    // Capitalized so messages read `createStore` / `createDataset`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefinitionKind::Store => write!(f, "Store"),
            DefinitionKind::Dataset => write!(f, "Dataset"),
        }
    }
}

/// Value kind a recognized definition key accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    String,
    Map,
    StringList,
}

impl ValueKind {
    /// Find the first part of `value` that violates this kind
    fn mismatch(&self, value: &Value) -> Option<JsonKind> {
        match (self, value) {
            (ValueKind::String, Value::String(_)) => None,
            (ValueKind::Map, Value::Object(_)) => None,
            (ValueKind::StringList, Value::Array(items)) => items
                .iter()
                .find(|item| !item.is_string())
                .map(JsonKind::of),
            (_, other) => Some(JsonKind::of(other)),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::String => write!(f, "String"),
            ValueKind::Map => write!(f, "Object"),
            ValueKind::StringList => write!(f, "Array of String"),
        }
    }
}

/// JSON kind of a value, used in error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonKind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl JsonKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => JsonKind::Null,
            Value::Bool(_) => JsonKind::Bool,
            Value::Number(_) => JsonKind::Number,
            Value::String(_) => JsonKind::String,
            Value::Array(_) => JsonKind::Array,
            Value::Object(_) => JsonKind::Object,
        }
    }
}

impl fmt::Display for JsonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JsonKind::Null => "null",
            JsonKind::Bool => "boolean",
            JsonKind::Number => "number",
            JsonKind::String => "string",
            JsonKind::Array => "array",
            JsonKind::Object => "object",
        };
        write!(f, "{}", name)
    }
}

const STORE_KEYS: &[(&str, ValueKind)] = &[
    ("type", ValueKind::String),
    ("initialParams", ValueKind::Map),
    ("uri", ValueKind::String),
    ("actions", ValueKind::Map),
    ("onlyActions", ValueKind::Map),
    ("paramId", ValueKind::String),
];

const DATASET_KEYS: &[(&str, ValueKind)] = &[
    ("partial", ValueKind::String),
    ("fragments", ValueKind::StringList),
    ("uri", ValueKind::String),
    ("actions", ValueKind::Map),
    ("onlyActions", ValueKind::Map),
];

/// Validate the shape of a JSON definition for `kind`
///
/// Checks run in order: plain object, recognized keys, per-key value kinds.
/// A `null` value counts as an absent key. Returns the object unchanged.
pub fn validate_definition(kind: DefinitionKind, value: &Value) -> Result<&Map<String, Value>> {
    let object = value
        .as_object()
        .ok_or_else(|| ResourceError::InvalidDefinitionType {
            kind,
            found: JsonKind::of(value),
        })?;

    let schema = kind.recognized_keys();

    if let Some(key) = object
        .keys()
        .find(|key| !schema.iter().any(|(known, _)| known == key))
    {
        return Err(ResourceError::UnknownDefinitionKey {
            kind,
            key: key.clone(),
        });
    }

    for (key, expected) in schema {
        let Some(value) = object.get(*key) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        if let Some(found) = expected.mismatch(value) {
            return Err(ResourceError::InvalidDefinitionValueType {
                kind,
                key: (*key).to_string(),
                expected: *expected,
                found,
            });
        }
    }

    Ok(object)
}

/// Configuration of a store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StoreDefinition {
    /// Unique name of the objects this store manages
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    /// Default params while an object is being fetched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_params: Option<Map<String, Value>>,
    /// URI concatenated with the others in the action chain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Additional actions allowed on this store's data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Map<String, Value>>,
    /// Replacement base set of actions for the hierarchy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub only_actions: Option<Map<String, Value>>,
    /// Param holding the id of a given object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param_id: Option<String>,
    /// Placeholder created before the explicit definition arrived
    #[serde(skip)]
    pub(crate) shadow: bool,
}

impl StoreDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a JSON definition and convert it
    pub fn from_value(value: &Value) -> Result<Self> {
        validate_definition(DefinitionKind::Store, value)?;
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Placeholder definition for data that arrived before its store
    pub(crate) fn shadow(type_name: impl Into<String>) -> Self {
        Self {
            type_name: Some(type_name.into()),
            shadow: true,
            ..Self::default()
        }
    }

    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn with_param_id(mut self, param_id: impl Into<String>) -> Self {
        self.param_id = Some(param_id.into());
        self
    }

    pub fn with_action(mut self, name: impl Into<String>, action: Value) -> Self {
        self.actions
            .get_or_insert_with(Map::new)
            .insert(name.into(), action);
        self
    }

    pub fn is_shadow(&self) -> bool {
        self.shadow
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Configuration of a dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DatasetDefinition {
    /// Partial name objects fetched through this dataset are tagged with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial: Option<String>,
    /// Fragments composing objects until the complete data is fetched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fragments: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub only_actions: Option<Map<String, Value>>,
}

impl DatasetDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a JSON definition and convert it
    pub fn from_value(value: &Value) -> Result<Self> {
        validate_definition(DefinitionKind::Dataset, value)?;
        Ok(serde_json::from_value(value.clone())?)
    }

    pub fn with_partial(mut self, partial: impl Into<String>) -> Self {
        self.partial = Some(partial.into());
        self
    }

    pub fn with_fragments<I, S>(mut self, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fragments = Some(fragments.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}
