use crate::Capabilities;
use crate::changes::ChangesRows;
use crate::database::{
    Database, IncomingAttachment, State, StoredRevision, stubs_of, to_document,
};
use crate::find;
use crate::listing::{Entry, ListOptions, build_rows, flag};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};
use settee_driver::rows::buffered::BufferedBulkResults;
use settee_driver::{
    AttachmentMeta, AttachmentMetaer, BulkResults, CancellationToken, Copier, Db, Finder, Flusher,
    Rever, Rows,
};
use settee_types::{
    Attachment, BulkResult, DESIGN_PREFIX, DbInfo, Document, Error, Index, Options, Result,
    Security,
};
use std::sync::Arc;
use tracing::debug;

/// A handle to one in-memory database.
pub struct MemoryDb {
    db: Arc<Database>,
    caps: Capabilities,
}

impl MemoryDb {
    pub(crate) fn new(db: Arc<Database>, caps: Capabilities) -> Self {
        Self { db, caps }
    }

    /// The database name.
    pub fn name(&self) -> &str {
        &self.db.name
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn option_str<'a>(options: &'a Options, name: &str) -> Result<Option<&'a str>> {
    match options.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(Error::bad_request(format!("{name} must be a string, got {other}"))),
    }
}

/// The current revision of a live document.
fn live<'a>(state: &'a State, id: &str) -> Result<&'a StoredRevision> {
    state.revision(id, None)
}

fn body_size(revision: &StoredRevision) -> u64 {
    let body = serde_json::to_vec(&revision.body).map(|b| b.len()).unwrap_or(0);
    let attachments: usize = revision.attachments.values().map(|a| a.data.len()).sum();
    (body + attachments) as u64
}

fn view_path(state: &State, ddoc: &str, view: &str) -> Result<String> {
    let design = state
        .revision(&format!("{DESIGN_PREFIX}{ddoc}"), None)
        .map_err(|_| Error::not_found("missing design document"))?;
    design
        .body
        .get("views")
        .and_then(|views| views.get(view))
        .and_then(|v| v.get("map"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::not_found("missing_named_view"))
}

#[async_trait]
impl Db for MemoryDb {
    fn set_option(&self, key: &str, value: Value) -> Result<()> {
        self.db.write(|state| {
            if key == "revs_limit" {
                state.revs_limit = value
                    .as_u64()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| Error::bad_request("revs_limit must be a positive integer"))?;
            }
            state.options.insert(key.to_string(), value);
            Ok(())
        })
    }

    async fn all_docs(&self, options: &Options) -> Result<Box<dyn Rows>> {
        let opts = ListOptions::parse(options)?;
        let rows = self.db.read(|state| {
            let entries = state
                .live_docs()
                .map(|(id, revision)| Entry {
                    key: Value::String(id.clone()),
                    id: id.clone(),
                    value: json!({"rev": revision.rev}),
                    doc: opts
                        .include_docs
                        .then(|| to_document(id, revision, false).to_value()),
                })
                .collect();
            Ok(build_rows(entries, &opts, state.update_seq))
        })?;
        Ok(Box::new(rows))
    }

    async fn get(&self, id: &str, options: &Options) -> Result<Document> {
        let rev = option_str(options, "rev")?;
        let inline = flag(options, "attachments")?.unwrap_or(false);
        self.db.read(|state| {
            let revision = state.revision(id, rev)?;
            Ok(to_document(id, revision, inline))
        })
    }

    async fn create_doc(&self, doc: Value) -> Result<(String, String)> {
        let mut doc = Document::from_value(doc)?;
        if doc.id.is_empty() {
            doc.id = new_id();
        }
        let id = doc.id.clone();
        let rev = self.db.write(|state| state.write_doc(&id, doc))?;
        Ok((id, rev))
    }

    async fn put(&self, id: &str, doc: Value) -> Result<String> {
        let doc = Document::from_value(doc)?;
        if !doc.id.is_empty() && doc.id != id {
            return Err(Error::bad_request(format!(
                "document _id {:?} does not match target {:?}",
                doc.id, id
            )));
        }
        self.db.write(|state| state.write_doc(id, doc))
    }

    async fn delete(&self, id: &str, rev: &str) -> Result<String> {
        if rev.is_empty() {
            return Err(Error::bad_request("a revision is required to delete"));
        }
        self.db.write(|state| {
            live(state, id)?;
            state.write_revision(id, rev, true, Map::new(), Default::default())
        })
    }

    async fn info(&self) -> Result<DbInfo> {
        self.db.read(|state| {
            let mut info = DbInfo {
                name: self.db.name.clone(),
                update_seq: state.update_seq.to_string(),
                ..Default::default()
            };
            for (id, doc) in &state.docs {
                info.disk_size += doc.revisions.iter().map(body_size).sum::<u64>();
                if id.starts_with(settee_types::LOCAL_PREFIX) {
                    continue;
                }
                let current = doc.current();
                if current.deleted {
                    info.deleted_count += 1;
                } else {
                    info.doc_count += 1;
                    info.active_size += body_size(current);
                }
            }
            Ok(info)
        })
    }

    async fn compact(&self) -> Result<()> {
        debug!("Compacting {}", self.db.name);
        Ok(())
    }

    async fn compact_view(&self, ddoc: &str) -> Result<()> {
        self.db.read(|state| {
            live(state, &format!("{DESIGN_PREFIX}{ddoc}"))
                .map(|_| ())
                .map_err(|_| Error::not_found("missing design document"))
        })
    }

    async fn view_cleanup(&self) -> Result<()> {
        Ok(())
    }

    async fn security(&self) -> Result<Security> {
        self.db.read(|state| Ok(state.security.clone()))
    }

    async fn set_security(&self, security: &Security) -> Result<()> {
        self.db.write(|state| {
            state.security = security.clone();
            Ok(())
        })
    }

    async fn revs_limit(&self) -> Result<u64> {
        self.db.read(|state| Ok(state.revs_limit))
    }

    async fn set_revs_limit(&self, limit: u64) -> Result<()> {
        if limit == 0 {
            return Err(Error::bad_request("revs_limit must be a positive integer"));
        }
        self.db.write(|state| {
            state.revs_limit = limit;
            Ok(())
        })
    }

    async fn changes(
        &self,
        options: &Options,
        cancel: CancellationToken,
    ) -> Result<Box<dyn Rows>> {
        Ok(Box::new(ChangesRows::open(self.db.clone(), options, cancel)?))
    }

    async fn bulk_docs(&self, docs: Vec<Value>) -> Result<Box<dyn BulkResults>> {
        let results = self.db.write(|state| {
            Ok(docs
                .into_iter()
                .map(|value| {
                    let mut doc = match Document::from_value(value) {
                        Ok(doc) => doc,
                        Err(e) => return BulkResult::failed("", e),
                    };
                    if doc.id.is_empty() {
                        doc.id = new_id();
                    }
                    let id = doc.id.clone();
                    match state.write_doc(&id, doc) {
                        Ok(rev) => BulkResult::ok(id, rev),
                        Err(e) => BulkResult::failed(id, e),
                    }
                })
                .collect::<Vec<_>>())
        })?;
        Ok(Box::new(BufferedBulkResults::new(results)))
    }

    async fn put_attachment(&self, id: &str, rev: &str, mut attachment: Attachment) -> Result<String> {
        let data = attachment.bytes()?.to_vec();
        let filename = attachment.filename.clone();
        let content_type = attachment.content_type.clone();
        self.db.write(|state| {
            let (body, mut attachments) = match state.revision(id, None) {
                Ok(current) => (current.body.clone(), stubs_of(current)),
                Err(Error::NotFound(_)) => (Map::new(), Default::default()),
                Err(e) => return Err(e),
            };
            attachments.insert(filename, IncomingAttachment::Data { content_type, data });
            state.write_revision(id, rev, false, body, attachments)
        })
    }

    async fn get_attachment(&self, id: &str, rev: &str, filename: &str) -> Result<Attachment> {
        self.db.read(|state| {
            let revision = state.revision(id, Some(rev))?;
            let stored = revision
                .attachments
                .get(filename)
                .ok_or_else(|| Error::not_found("attachment not found"))?;
            Ok(Attachment::from_bytes(
                filename,
                stored.content_type.clone(),
                stored.data.as_ref().clone(),
            ))
        })
    }

    async fn delete_attachment(&self, id: &str, rev: &str, filename: &str) -> Result<String> {
        self.db.write(|state| {
            let current = live(state, id)?;
            if !current.attachments.contains_key(filename) {
                return Err(Error::not_found("attachment not found"));
            }
            let body = current.body.clone();
            let mut attachments = stubs_of(current);
            attachments.remove(filename);
            state.write_revision(id, rev, false, body, attachments)
        })
    }

    async fn query(&self, ddoc: &str, view: &str, options: &Options) -> Result<Box<dyn Rows>> {
        let opts = ListOptions::parse(options)?;
        let rows = self.db.read(|state| {
            let path = view_path(state, ddoc, view)?;
            let mut entries = Vec::new();
            for (id, revision) in state.live_docs() {
                if id.starts_with(DESIGN_PREFIX) {
                    continue;
                }
                let doc = to_document(id, revision, false).to_value();
                if let Some(key) = find::lookup(&doc, &path).cloned() {
                    entries.push(Entry {
                        key,
                        id: id.clone(),
                        value: Value::Null,
                        doc: Some(doc),
                    });
                }
            }
            Ok(build_rows(entries, &opts, state.update_seq))
        })?;
        Ok(Box::new(rows))
    }

    fn as_finder(&self) -> Option<&dyn Finder> {
        self.caps.find.then_some(self as &dyn Finder)
    }

    fn as_attachment_metaer(&self) -> Option<&dyn AttachmentMetaer> {
        self.caps.attachment_meta.then_some(self as &dyn AttachmentMetaer)
    }

    fn as_rever(&self) -> Option<&dyn Rever> {
        self.caps.rev.then_some(self as &dyn Rever)
    }

    fn as_flusher(&self) -> Option<&dyn Flusher> {
        self.caps.flush.then_some(self as &dyn Flusher)
    }

    fn as_copier(&self) -> Option<&dyn Copier> {
        self.caps.copy.then_some(self as &dyn Copier)
    }
}

#[async_trait]
impl Finder for MemoryDb {
    async fn find(&self, query: Value) -> Result<Box<dyn Rows>> {
        let rows = self.db.read(|state| find::find(state, &query))?;
        Ok(Box::new(rows))
    }

    async fn create_index(
        &self,
        ddoc: Option<&str>,
        name: Option<&str>,
        index: Value,
    ) -> Result<()> {
        let created = self
            .db
            .write(|state| find::create_index(state, ddoc, name, index))?;
        if !created {
            debug!("Index already exists on {}", self.db.name);
        }
        Ok(())
    }

    async fn get_indexes(&self) -> Result<Vec<Index>> {
        self.db.read(|state| Ok(find::indexes(state)))
    }

    async fn delete_index(&self, ddoc: &str, name: &str) -> Result<()> {
        self.db.write(|state| find::delete_index(state, ddoc, name))
    }
}

#[async_trait]
impl AttachmentMetaer for MemoryDb {
    async fn get_attachment_meta(
        &self,
        id: &str,
        rev: &str,
        filename: &str,
    ) -> Result<AttachmentMeta> {
        self.db.read(|state| {
            let revision = state.revision(id, Some(rev))?;
            let stored = revision
                .attachments
                .get(filename)
                .ok_or_else(|| Error::not_found("attachment not found"))?;
            Ok(AttachmentMeta {
                content_type: stored.content_type.clone(),
                md5: stored.md5,
            })
        })
    }
}

#[async_trait]
impl Rever for MemoryDb {
    async fn rev(&self, id: &str) -> Result<String> {
        self.db.read(|state| Ok(state.revision(id, None)?.rev.clone()))
    }
}

#[async_trait]
impl Flusher for MemoryDb {
    async fn flush(&self) -> Result<DateTime<Utc>> {
        Ok(self.db.opened_at)
    }
}

#[async_trait]
impl Copier for MemoryDb {
    async fn copy(&self, target_id: &str, source_id: &str, options: &Options) -> Result<String> {
        let source_rev = option_str(options, "rev")?.map(str::to_string);
        let target_rev = option_str(options, "target_rev")?.map(str::to_string);
        self.db.write(|state| {
            let source = state.revision(source_id, source_rev.as_deref())?.clone();
            let rev = match target_rev {
                Some(rev) => rev,
                None => match state.revision(target_id, None) {
                    Ok(current) => current.rev.clone(),
                    Err(Error::NotFound(_)) => String::new(),
                    Err(e) => return Err(e),
                },
            };
            let attachments = source
                .attachments
                .into_iter()
                .map(|(name, att)| {
                    let incoming = IncomingAttachment::Data {
                        content_type: att.content_type,
                        data: att.data.as_ref().clone(),
                    };
                    (name, incoming)
                })
                .collect();
            state.write_revision(target_id, &rev, false, source.body, attachments)
        })
    }
}
