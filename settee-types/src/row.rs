//! Iterator elements for multi-row results.

use crate::error::Error;
use serde_json::Value;

/// One element of a listing, view, find or changes iterator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    /// Document id the row refers to; empty for reduced rows.
    pub id: String,
    /// Row key. For the changes feed, the sequence marker.
    pub key: Value,
    /// Row value.
    pub value: Value,
    /// Embedded document, when requested.
    pub doc: Option<Value>,
    /// Per-row error, e.g. a missing key in a multi-key fetch.
    pub error: Option<Error>,
}

impl Row {
    /// Deserializes the embedded document.
    pub fn doc_as<T: serde::de::DeserializeOwned>(&self) -> crate::Result<Option<T>> {
        self.doc
            .as_ref()
            .map(|doc| serde_json::from_value(doc.clone()).map_err(Into::into))
            .transpose()
    }
}

/// The outcome of one document in a bulk write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkResult {
    /// Target document id.
    pub id: String,
    /// Resulting revision on success.
    pub rev: String,
    /// Per-item failure. Never aborts the rest of the batch.
    pub error: Option<Error>,
}

impl BulkResult {
    /// A successful write.
    pub fn ok(id: impl Into<String>, rev: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            rev: rev.into(),
            error: None,
        }
    }

    /// A failed write.
    pub fn failed(id: impl Into<String>, error: Error) -> Self {
        Self {
            id: id.into(),
            rev: String::new(),
            error: Some(error),
        }
    }
}
