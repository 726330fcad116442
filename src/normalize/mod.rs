//! Resource Normalizer
//!
//! Turns a raw server payload (one object, or an array of objects) into a
//! [`ResourceEnvelope`] ready for a store's fragment cache.
//!
//! Keys starting with `_` are envelope metadata: `_type` names the store
//! type, `_partial` the partial. Unknown `_` keys are reported and skipped.
//! Every other key is data, except objects and arrays, which are embedded
//! resources: they are normalized on their own and left out of the parent.
//!
//! ```text
//! [{"_type": "user", "id": 1}, {"id": 2}]
//!   => {"type": "user", "partial": null, "data": [{"id": 1}, {"id": 2}]}
//! ```

pub mod diagnostics;

pub use diagnostics::{DiagnosticCode, DiagnosticItem, Diagnostics, Severity};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use tracing::warn;

use crate::definition::JsonKind;
use crate::error::{ResourceError, Result};
use crate::store::ResourceDescriptor;

/// Marker character for envelope metadata keys
pub const METADATA_MARKER: char = '_';
pub const TYPE_KEY: &str = "_type";
pub const PARTIAL_KEY: &str = "_partial";

/// Deepest embedded-resource nesting the normalizer walks
pub const MAX_NESTING_DEPTH: usize = 128;

/// Envelope field two collection entries can disagree on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataField {
    Type,
    Partial,
}

impl fmt::Display for MetadataField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataField::Type => write!(f, "type"),
            MetadataField::Partial => write!(f, "partial"),
        }
    }
}

/// Data of a normalized payload
///
/// The shape follows the input: a single object gives its field map, a
/// collection gives one field map per element, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvelopeData {
    Single(Map<String, Value>),
    Collection(Vec<Map<String, Value>>),
}

impl EnvelopeData {
    pub fn is_collection(&self) -> bool {
        matches!(self, EnvelopeData::Collection(_))
    }

    pub fn as_single(&self) -> Option<&Map<String, Value>> {
        match self {
            EnvelopeData::Single(map) => Some(map),
            EnvelopeData::Collection(_) => None,
        }
    }

    pub fn as_collection(&self) -> Option<&[Map<String, Value>]> {
        match self {
            EnvelopeData::Collection(entries) => Some(entries),
            EnvelopeData::Single(_) => None,
        }
    }

    /// Number of entries (1 for a single object)
    pub fn len(&self) -> usize {
        match self {
            EnvelopeData::Single(_) => 1,
            EnvelopeData::Collection(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Normalized `{type, partial, data}` record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceEnvelope {
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    pub partial: Option<String>,
    pub data: EnvelopeData,
}

#[derive(Default)]
struct ParsedObject {
    type_name: Option<String>,
    partial: Option<String>,
    data: Map<String, Value>,
}

/// Normalize a payload, logging ignored metadata through `tracing`
pub fn normalize(payload: &Value, descriptor: Option<&ResourceDescriptor>) -> Result<ResourceEnvelope> {
    let mut diagnostics = Diagnostics::new();
    normalize_with_diagnostics(payload, descriptor, &mut diagnostics)
}

/// Normalize a payload and also collect non-fatal findings
///
/// The whole payload fails on the first error; nothing partial is returned.
pub fn normalize_with_diagnostics(
    payload: &Value,
    descriptor: Option<&ResourceDescriptor>,
    diagnostics: &mut Diagnostics,
) -> Result<ResourceEnvelope> {
    let span = tracing::debug_span!(
        "normalize",
        resource = descriptor.and_then(|d| d.id.as_deref()).unwrap_or("-")
    );
    let _enter = span.enter();

    normalize_at(payload, "$", 0, diagnostics)
}

fn normalize_at(
    payload: &Value,
    path: &str,
    depth: usize,
    diagnostics: &mut Diagnostics,
) -> Result<ResourceEnvelope> {
    if depth > MAX_NESTING_DEPTH {
        return Err(ResourceError::NestingTooDeep {
            limit: MAX_NESTING_DEPTH,
        });
    }

    match payload {
        Value::Array(items) => {
            let mut discovered_type = None;
            let mut discovered_partial = None;
            let mut data = Vec::with_capacity(items.len());

            for (index, item) in items.iter().enumerate() {
                let entry = parse_object(item, &format!("{}[{}]", path, index), depth, diagnostics)?;
                agree(&mut discovered_type, entry.type_name, MetadataField::Type)?;
                agree(&mut discovered_partial, entry.partial, MetadataField::Partial)?;
                data.push(entry.data);
            }

            Ok(ResourceEnvelope {
                type_name: discovered_type,
                partial: discovered_partial,
                data: EnvelopeData::Collection(data),
            })
        }
        other => {
            let entry = parse_object(other, path, depth, diagnostics)?;
            Ok(ResourceEnvelope {
                type_name: entry.type_name,
                partial: entry.partial,
                data: EnvelopeData::Single(entry.data),
            })
        }
    }
}

/// Fold one entry's declared value into the collection-wide value
fn agree(discovered: &mut Option<String>, declared: Option<String>, field: MetadataField) -> Result<()> {
    let Some(declared) = declared else {
        return Ok(());
    };

    match discovered {
        Some(existing) if *existing != declared => Err(ResourceError::ConflictingEnvelopeMetadata {
            field,
            first: existing.clone(),
            second: declared,
        }),
        _ => {
            *discovered = Some(declared);
            Ok(())
        }
    }
}

fn parse_object(
    value: &Value,
    path: &str,
    depth: usize,
    diagnostics: &mut Diagnostics,
) -> Result<ParsedObject> {
    let object = value.as_object().ok_or_else(|| ResourceError::InvalidPayload {
        found: JsonKind::of(value),
    })?;

    let mut parsed = ParsedObject::default();

    for (key, value) in object {
        if key.starts_with(METADATA_MARKER) {
            match key.as_str() {
                TYPE_KEY => parsed.type_name = metadata_string(key, value)?,
                PARTIAL_KEY => parsed.partial = metadata_string(key, value)?,
                _ => {
                    warn!(path, key = key.as_str(), "ignoring unknown object property");
                    diagnostics.unknown_envelope_key(path, key);
                }
            }
            continue;
        }

        if value.is_array() || value.is_object() {
            // Embedded resources are cached independently; only errors surface here
            let nested_path = format!("{}.{}", path, key);
            normalize_at(value, &nested_path, depth + 1, diagnostics)?;
            diagnostics.embedded_resource(&nested_path);
            continue;
        }

        parsed.data.insert(key.clone(), value.clone());
    }

    Ok(parsed)
}

/// Read `_type` / `_partial`; null and empty strings are "not declared"
fn metadata_string(key: &str, value: &Value) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        other => Err(ResourceError::InvalidEnvelopeMetadata {
            key: key.to_string(),
            found: JsonKind::of(other),
        }),
    }
}
