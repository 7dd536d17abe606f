//! Versioned documents and their revision markers.

use crate::attachment::Checksum;
use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Id prefix of documents that are never replicated and carry no revision history.
pub const LOCAL_PREFIX: &str = "_local/";

/// Id prefix of design documents.
pub const DESIGN_PREFIX: &str = "_design/";

/// A document revision, rendered on the wire as `"<generation>-<hash>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Revision {
    generation: u64,
    hash: String,
}

impl Revision {
    /// Creates a revision from its parts.
    pub fn new(generation: u64, hash: impl Into<String>) -> Self {
        Self {
            generation,
            hash: hash.into(),
        }
    }

    /// Derives the revision that follows `previous` for the given content.
    ///
    /// The hash is the MD5 of the previous revision string, the deletion
    /// flag and the canonical JSON of the body, so identical writes on top
    /// of the same parent produce identical revisions.
    pub fn derive(previous: Option<&Revision>, deleted: bool, body: &Value) -> Self {
        let mut material = Vec::new();
        if let Some(prev) = previous {
            material.extend_from_slice(prev.to_string().as_bytes());
        }
        material.push(u8::from(deleted));
        material.extend_from_slice(body.to_string().as_bytes());
        Self {
            generation: previous.map_or(1, |p| p.generation + 1),
            hash: Checksum::compute(&material).to_hex(),
        }
    }

    /// The generation counter.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The content hash part.
    pub fn hash(&self) -> &str {
        &self.hash
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.generation, self.hash)
    }
}

impl FromStr for Revision {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (generation, hash) = s
            .split_once('-')
            .ok_or_else(|| Error::bad_request(format!("invalid rev format: {s}")))?;
        let generation = generation
            .parse::<u64>()
            .map_err(|_| Error::bad_request(format!("invalid rev format: {s}")))?;
        if hash.is_empty() || !hash.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::bad_request(format!("invalid rev format: {s}")));
        }
        Ok(Self::new(generation, hash))
    }
}

/// A document as read from a database.
///
/// Reserved (`_`-prefixed) top-level fields are lifted out of the body into
/// typed fields; everything else stays in `body` untouched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    /// Identifier, unique within a database.
    pub id: String,
    /// Current revision.
    pub rev: String,
    /// Deletion flag.
    pub deleted: bool,
    /// User fields.
    pub body: Map<String, Value>,
    /// Attachment stubs keyed by filename, in wire form.
    pub attachments: Map<String, Value>,
}

impl Document {
    /// Creates an empty document with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Splits a wire-form JSON object into a document.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut fields) = value else {
            return Err(Error::bad_request("document must be a JSON object"));
        };
        let mut doc = Document::default();
        if let Some(id) = fields.remove("_id") {
            doc.id = string_field("_id", id)?;
        }
        if let Some(rev) = fields.remove("_rev") {
            doc.rev = string_field("_rev", rev)?;
        }
        if let Some(deleted) = fields.remove("_deleted") {
            doc.deleted = deleted
                .as_bool()
                .ok_or_else(|| Error::bad_request("_deleted must be a boolean"))?;
        }
        if let Some(attachments) = fields.remove("_attachments") {
            let Value::Object(attachments) = attachments else {
                return Err(Error::bad_request("_attachments must be an object"));
            };
            doc.attachments = attachments;
        }
        doc.body = fields;
        Ok(doc)
    }

    /// Reassembles the wire-form JSON object.
    pub fn to_value(&self) -> Value {
        let mut out = Map::new();
        if !self.id.is_empty() {
            out.insert("_id".into(), Value::String(self.id.clone()));
        }
        if !self.rev.is_empty() {
            out.insert("_rev".into(), Value::String(self.rev.clone()));
        }
        if self.deleted {
            out.insert("_deleted".into(), Value::Bool(true));
        }
        if !self.attachments.is_empty() {
            out.insert("_attachments".into(), Value::Object(self.attachments.clone()));
        }
        for (k, v) in &self.body {
            out.insert(k.clone(), v.clone());
        }
        Value::Object(out)
    }

    /// Returns true for `_local/` documents.
    pub fn is_local(&self) -> bool {
        self.id.starts_with(LOCAL_PREFIX)
    }

    /// Returns true for `_design/` documents.
    pub fn is_design(&self) -> bool {
        self.id.starts_with(DESIGN_PREFIX)
    }
}

fn string_field(name: &str, value: Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s),
        _ => Err(Error::bad_request(format!("{name} must be a string"))),
    }
}
