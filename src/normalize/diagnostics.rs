//! Normalizer findings
//!
//! Malformed payloads fail outright. What ends up here was harmless and got
//! skipped or split off, and is kept so callers can report it.

use serde::Serialize;
use std::fmt;

/// What the normalizer noticed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticCode {
    /// `_`-prefixed key other than `_type` / `_partial`
    UnknownEnvelopeKey,
    /// Object or array field normalized on its own, absent from the parent data
    EmbeddedResource,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownEnvelopeKey => "W001",
            Self::EmbeddedResource => "I001",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::UnknownEnvelopeKey => Severity::Warning,
            Self::EmbeddedResource => Severity::Info,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
}

/// One finding, located by a JSONPath-like pointer such as `$[2].owner`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticItem {
    pub path: String,
    pub code: DiagnosticCode,
    pub message: String,
}

impl DiagnosticItem {
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }
}

impl fmt::Display for DiagnosticItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity() {
            Severity::Info => "info",
            Severity::Warning => "warning",
        };
        write!(f, "[{}] {} at {}: {}", self.code.as_str(), level, self.path, self.message)
    }
}

/// Findings of one normalization pass, in discovery order
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    items: Vec<DiagnosticItem>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, path: &str, code: DiagnosticCode, message: String) {
        self.items.push(DiagnosticItem {
            path: path.to_string(),
            code,
            message,
        });
    }

    pub(crate) fn unknown_envelope_key(&mut self, path: &str, key: &str) {
        self.record(
            path,
            DiagnosticCode::UnknownEnvelopeKey,
            format!("ignoring unknown object property `{}`", key),
        );
    }

    pub(crate) fn embedded_resource(&mut self, path: &str) {
        self.record(
            path,
            DiagnosticCode::EmbeddedResource,
            "embedded data normalized as a separate resource".to_string(),
        );
    }

    pub fn all(&self) -> &[DiagnosticItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn warning_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.severity() == Severity::Warning)
            .count()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for item in &self.items {
            writeln!(f, "{}", item)?;
        }
        match self.warning_count() {
            0 => Ok(()),
            n => writeln!(f, "{} warning(s)", n),
        }
    }
}
