//! Revision storage for one in-memory database.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};
use settee_types::{Checksum, Document, Error, Index, Options, Result, Revision, Security};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use tokio::sync::watch;

const DEFAULT_REVS_LIMIT: u64 = 1000;

#[derive(Debug, Clone)]
pub(crate) struct StoredAttachment {
    pub content_type: String,
    pub data: Arc<Vec<u8>>,
    pub md5: Checksum,
    pub revpos: u64,
}

#[derive(Debug, Clone)]
pub(crate) struct StoredRevision {
    pub rev: String,
    pub deleted: bool,
    pub body: Map<String, Value>,
    pub attachments: BTreeMap<String, StoredAttachment>,
}

#[derive(Debug)]
pub(crate) struct StoredDoc {
    /// Oldest first, trimmed to the revs limit.
    pub revisions: Vec<StoredRevision>,
    pub seq: u64,
}

impl StoredDoc {
    pub fn current(&self) -> &StoredRevision {
        self.revisions
            .last()
            .expect("stored documents hold at least one revision")
    }
}

/// An attachment as supplied by a write.
#[derive(Debug)]
pub(crate) enum IncomingAttachment {
    /// Keep the attachment of the same name from the parent revision.
    Stub,
    Data { content_type: String, data: Vec<u8> },
}

#[derive(Debug)]
pub(crate) struct State {
    pub docs: BTreeMap<String, StoredDoc>,
    /// Latest sequence of each document.
    pub by_seq: BTreeMap<u64, String>,
    pub update_seq: u64,
    pub security: Security,
    pub revs_limit: u64,
    pub indexes: Vec<Index>,
    pub options: Options,
}

pub(crate) struct Database {
    pub name: String,
    pub opened_at: DateTime<Utc>,
    state: RwLock<State>,
    seq_tx: watch::Sender<u64>,
}

impl Database {
    pub fn new(name: &str, defaults: Options) -> Self {
        let revs_limit = defaults
            .get("revs_limit")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_REVS_LIMIT);
        let (seq_tx, _) = watch::channel(0);
        Self {
            name: name.to_string(),
            opened_at: Utc::now(),
            state: RwLock::new(State {
                docs: BTreeMap::new(),
                by_seq: BTreeMap::new(),
                update_seq: 0,
                security: Security::default(),
                revs_limit,
                indexes: Vec::new(),
                options: defaults,
            }),
            seq_tx,
        }
    }

    pub fn read<R>(&self, f: impl FnOnce(&State) -> Result<R>) -> Result<R> {
        let state = self
            .state
            .read()
            .map_err(|_| Error::internal("database lock poisoned"))?;
        f(&state)
    }

    /// Runs a mutation and wakes changes-feed listeners if the sequence moved.
    pub fn write<R>(&self, f: impl FnOnce(&mut State) -> Result<R>) -> Result<R> {
        let (result, seq) = {
            let mut state = self
                .state
                .write()
                .map_err(|_| Error::internal("database lock poisoned"))?;
            let before = state.update_seq;
            let result = f(&mut state);
            (result, (state.update_seq != before).then_some(state.update_seq))
        };
        if let Some(seq) = seq {
            self.seq_tx.send_replace(seq);
        }
        result
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.seq_tx.subscribe()
    }
}

impl State {
    /// Looks up a revision for reading. Without `rev`, a deleted document
    /// is reported missing.
    pub fn revision(&self, id: &str, rev: Option<&str>) -> Result<&StoredRevision> {
        let doc = self.docs.get(id).ok_or_else(|| Error::not_found("missing"))?;
        match rev.filter(|r| !r.is_empty()) {
            Some(rev) => doc
                .revisions
                .iter()
                .find(|r| r.rev == rev)
                .ok_or_else(|| Error::not_found("missing")),
            None => {
                let current = doc.current();
                if current.deleted {
                    Err(Error::not_found("deleted"))
                } else {
                    Ok(current)
                }
            }
        }
    }

    /// Writes a wire-form document.
    pub fn write_doc(&mut self, id: &str, doc: Document) -> Result<String> {
        let attachments = parse_attachments(&doc.attachments)?;
        self.write_revision(id, &doc.rev, doc.deleted, doc.body, attachments)
    }

    /// Appends a revision on top of the current one.
    ///
    /// `rev` must name the current revision of a live document, may be empty
    /// or name the tombstone when recreating a deleted document, and must be
    /// empty for a new one.
    pub fn write_revision(
        &mut self,
        id: &str,
        rev: &str,
        deleted: bool,
        body: Map<String, Value>,
        attachments: BTreeMap<String, IncomingAttachment>,
    ) -> Result<String> {
        validate_id(id)?;
        let supplied = if rev.is_empty() {
            None
        } else {
            Some(rev.parse::<Revision>()?)
        };
        let parent = self.docs.get(id).map(StoredDoc::current);
        match (parent, &supplied) {
            (Some(p), Some(r)) if p.rev == r.to_string() => {}
            (Some(p), None) if p.deleted => {}
            (None, None) => {}
            _ => return Err(Error::conflict("document update conflict")),
        }

        let local = id.starts_with(settee_types::LOCAL_PREFIX);
        let new_rev = if local {
            let counter = parent
                .and_then(|p| p.rev.parse::<Revision>().ok())
                .and_then(|r| r.hash().parse::<u64>().ok())
                .unwrap_or(0);
            Revision::new(0, (counter + 1).to_string())
        } else {
            let parent_rev = parent.and_then(|p| p.rev.parse::<Revision>().ok());
            let digests: Map<String, Value> = attachments
                .iter()
                .map(|(name, att)| {
                    let digest = match att {
                        IncomingAttachment::Stub => Value::Null,
                        IncomingAttachment::Data { data, .. } => {
                            Value::String(Checksum::compute(data).to_digest())
                        }
                    };
                    (name.clone(), digest)
                })
                .collect();
            Revision::derive(
                parent_rev.as_ref(),
                deleted,
                &json!({"body": body, "attachments": digests}),
            )
        };

        let mut stored_attachments = BTreeMap::new();
        for (name, att) in attachments {
            let stored = match att {
                IncomingAttachment::Stub => parent
                    .and_then(|p| p.attachments.get(&name))
                    .cloned()
                    .ok_or_else(|| Error::bad_request(format!("missing attachment stub {name:?}")))?,
                IncomingAttachment::Data { content_type, data } => StoredAttachment {
                    content_type,
                    md5: Checksum::compute(&data),
                    data: Arc::new(data),
                    revpos: new_rev.generation(),
                },
            };
            stored_attachments.insert(name, stored);
        }

        let revision = StoredRevision {
            rev: new_rev.to_string(),
            deleted,
            body: if deleted { Map::new() } else { body },
            attachments: if deleted { BTreeMap::new() } else { stored_attachments },
        };

        let limit = usize::try_from(self.revs_limit.max(1)).unwrap_or(usize::MAX);
        let seq = if local { 0 } else { self.update_seq + 1 };
        let entry = self.docs.entry(id.to_string()).or_insert_with(|| StoredDoc {
            revisions: Vec::new(),
            seq: 0,
        });
        entry.revisions.push(revision);
        if entry.revisions.len() > limit {
            let excess = entry.revisions.len() - limit;
            entry.revisions.drain(..excess);
        }
        if !local {
            self.by_seq.remove(&entry.seq);
            entry.seq = seq;
            self.by_seq.insert(seq, id.to_string());
            self.update_seq = seq;
        }
        Ok(new_rev.to_string())
    }

    /// Documents visible to listings: live, not `_local/`.
    pub fn live_docs(&self) -> impl Iterator<Item = (&String, &StoredRevision)> {
        self.docs
            .iter()
            .filter(|(id, _)| !id.starts_with(settee_types::LOCAL_PREFIX))
            .map(|(id, doc)| (id, doc.current()))
            .filter(|(_, rev)| !rev.deleted)
    }
}

/// Renders a stored revision in wire form.
pub(crate) fn to_document(id: &str, revision: &StoredRevision, inline_attachments: bool) -> Document {
    let attachments = revision
        .attachments
        .iter()
        .map(|(name, att)| {
            let mut stub = Map::new();
            stub.insert("content_type".into(), json!(att.content_type));
            stub.insert("digest".into(), json!(att.md5.to_digest()));
            stub.insert("revpos".into(), json!(att.revpos));
            if inline_attachments {
                stub.insert("data".into(), json!(STANDARD.encode(att.data.as_slice())));
            } else {
                stub.insert("length".into(), json!(att.data.len()));
                stub.insert("stub".into(), json!(true));
            }
            (name.clone(), Value::Object(stub))
        })
        .collect();
    Document {
        id: id.to_string(),
        rev: revision.rev.clone(),
        deleted: revision.deleted,
        body: revision.body.clone(),
        attachments,
    }
}

/// Keeps every attachment of `revision` as a stub.
pub(crate) fn stubs_of(revision: &StoredRevision) -> BTreeMap<String, IncomingAttachment> {
    revision
        .attachments
        .keys()
        .map(|name| (name.clone(), IncomingAttachment::Stub))
        .collect()
}

pub(crate) fn parse_attachments(
    attachments: &Map<String, Value>,
) -> Result<BTreeMap<String, IncomingAttachment>> {
    let mut out = BTreeMap::new();
    for (name, value) in attachments {
        let incoming = if value.get("stub").and_then(Value::as_bool) == Some(true) {
            IncomingAttachment::Stub
        } else if let Some(data) = value.get("data").and_then(Value::as_str) {
            let data = STANDARD
                .decode(data)
                .map_err(|e| Error::bad_request(format!("invalid attachment data for {name:?}: {e}")))?;
            let content_type = value
                .get("content_type")
                .and_then(Value::as_str)
                .unwrap_or("application/octet-stream")
                .to_string();
            IncomingAttachment::Data { content_type, data }
        } else {
            return Err(Error::bad_request(format!(
                "attachment {name:?} must be a stub or carry data"
            )));
        };
        out.insert(name.clone(), incoming);
    }
    Ok(out)
}

fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(Error::bad_request("document id must not be empty"));
    }
    if id.starts_with('_')
        && !id.starts_with(settee_types::LOCAL_PREFIX)
        && !id.starts_with(settee_types::DESIGN_PREFIX)
    {
        return Err(Error::bad_request("only reserved document ids may start with underscore"));
    }
    Ok(())
}
