//! Error types for definitions, registry and normalization

use thiserror::Error;

use crate::definition::{DefinitionKind, JsonKind, ValueKind};
use crate::normalize::MetadataField;

/// Result type for resource operations
pub type Result<T> = std::result::Result<T, ResourceError>;

/// Resource registry errors
///
/// Every failure is synchronous and final; nothing in this crate retries.
#[derive(Error, Debug)]
pub enum ResourceError {
    #[error("create{kind}: invalid definition of type `{found}`, expected a plain object")]
    InvalidDefinitionType { kind: DefinitionKind, found: JsonKind },

    #[error("create{kind}: invalid definition option `{key}`")]
    UnknownDefinitionKey { kind: DefinitionKind, key: String },

    #[error("create{kind}: option `{key}` can only be of type {expected} but found `{found}`")]
    InvalidDefinitionValueType {
        kind: DefinitionKind,
        key: String,
        expected: ValueKind,
        found: JsonKind,
    },

    #[error("createStore: found existing store of type `{type_name}` while trying to redefine")]
    StoreAlreadyDefined { type_name: String },

    #[error("createStore: store type name must not be empty")]
    EmptyStoreType,

    #[error("normalize: found conflicting {field}s inside collection: `{first}` and `{second}`")]
    ConflictingEnvelopeMetadata {
        field: MetadataField,
        first: String,
        second: String,
    },

    #[error("normalize: envelope key `{key}` must be a string but found `{found}`")]
    InvalidEnvelopeMetadata { key: String, found: JsonKind },

    #[error("normalize: expected object payload but found `{found}`")]
    InvalidPayload { found: JsonKind },

    #[error("normalize: payload nesting exceeds {limit} levels")]
    NestingTooDeep { limit: usize },

    #[error("createDataset: at least one definition or resolvable is required")]
    EmptyDataset,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ResourceError {
    /// Whether this error came from definition validation
    pub fn is_definition_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidDefinitionType { .. }
                | Self::UnknownDefinitionKey { .. }
                | Self::InvalidDefinitionValueType { .. }
        )
    }
}
