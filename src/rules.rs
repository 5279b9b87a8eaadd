//! Journal formatting rules.
//!
//! The rules document is loaded once at startup and served read-only for the
//! lifetime of the process. It is re-serialised compactly at load time so
//! every response is byte-identical.

use std::path::Path;

use bytes::Bytes;
use serde_json::Value;
use tracing::info;

use crate::error::RulesError;

/// The serialised journal rules document.
#[derive(Debug, Clone)]
pub struct JournalRules {
    document: Bytes,
    entry_count: usize,
}

impl JournalRules {
    /// Load and validate the rules file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RulesError> {
        let path = path.as_ref();
        let raw = std::fs::read(path).map_err(|e| RulesError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let rules = Self::from_slice(&raw)?;
        info!(
            path = %path.display(),
            entries = rules.entry_count,
            bytes = rules.document.len(),
            "Loaded journal rules"
        );
        Ok(rules)
    }

    /// Parse rules from raw JSON bytes.
    pub fn from_slice(raw: &[u8]) -> Result<Self, RulesError> {
        let value: Value =
            serde_json::from_slice(raw).map_err(|e| RulesError::Parse(e.to_string()))?;
        Self::from_value(value)
    }

    /// Build rules from an already parsed document.
    ///
    /// The document must be a JSON object (journal name to rules) or an
    /// array of rule entries.
    pub fn from_value(value: Value) -> Result<Self, RulesError> {
        let entry_count = match &value {
            Value::Object(map) => map.len(),
            Value::Array(items) => items.len(),
            Value::Null => return Err(RulesError::UnexpectedShape("null")),
            Value::Bool(_) => return Err(RulesError::UnexpectedShape("boolean")),
            Value::Number(_) => return Err(RulesError::UnexpectedShape("number")),
            Value::String(_) => return Err(RulesError::UnexpectedShape("string")),
        };

        let document =
            serde_json::to_vec(&value).map_err(|e| RulesError::Parse(e.to_string()))?;

        Ok(Self {
            document: Bytes::from(document),
            entry_count,
        })
    }

    /// Serialised document, ready to send.
    pub fn document(&self) -> Bytes {
        self.document.clone()
    }

    /// Number of top-level entries.
    pub fn entry_count(&self) -> usize {
        self.entry_count
    }
}
