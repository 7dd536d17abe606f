use crate::rows::{BulkResults, Rows};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use settee_driver::{AttachmentMeta, CancellationToken};
use settee_types::{Attachment, DbInfo, Document, Error, Index, Options, Result, Security};
use std::sync::Arc;
use tracing::debug;

/// A handle to one database.
///
/// Cloning is cheap; clones share the backend handle.
#[derive(Clone)]
pub struct Db {
    name: String,
    inner: Arc<dyn settee_driver::Db>,
}

impl Db {
    pub(crate) fn new(name: &str, inner: Arc<dyn settee_driver::Db>) -> Self {
        Self {
            name: name.to_string(),
            inner,
        }
    }

    /// The database name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_option(&self, key: &str, value: Value) -> Result<()> {
        self.inner.set_option(key, value)
    }

    /// Lists documents.
    pub async fn all_docs(&self, options: &Options) -> Result<Rows> {
        let rows = self.inner.all_docs(options).await?;
        Ok(Rows::new(rows, CancellationToken::new()))
    }

    /// Fetches a document.
    pub async fn get(&self, id: &str, options: &Options) -> Result<Document> {
        self.inner.get(id, options).await
    }

    /// Fetches a document and deserializes its wire form.
    pub async fn get_as<T: DeserializeOwned>(&self, id: &str, options: &Options) -> Result<T> {
        let doc = self.inner.get(id, options).await?;
        Ok(serde_json::from_value(doc.to_value())?)
    }

    /// Creates a document with a backend-generated id. Returns `(id, rev)`.
    pub async fn create_doc<T: Serialize + ?Sized>(&self, doc: &T) -> Result<(String, String)> {
        self.inner.create_doc(serde_json::to_value(doc)?).await
    }

    /// Writes a document, returning its new revision.
    pub async fn put<T: Serialize + ?Sized>(&self, id: &str, doc: &T) -> Result<String> {
        self.inner.put(id, serde_json::to_value(doc)?).await
    }

    /// Marks a document deleted.
    pub async fn delete(&self, id: &str, rev: &str) -> Result<String> {
        self.inner.delete(id, rev).await
    }

    pub async fn info(&self) -> Result<DbInfo> {
        self.inner.info().await
    }

    pub async fn compact(&self) -> Result<()> {
        self.inner.compact().await
    }

    pub async fn compact_view(&self, ddoc: &str) -> Result<()> {
        self.inner.compact_view(strip_design_prefix(ddoc)).await
    }

    pub async fn view_cleanup(&self) -> Result<()> {
        self.inner.view_cleanup().await
    }

    pub async fn security(&self) -> Result<Security> {
        self.inner.security().await
    }

    pub async fn set_security(&self, security: &Security) -> Result<()> {
        self.inner.set_security(security).await
    }

    pub async fn revs_limit(&self) -> Result<u64> {
        self.inner.revs_limit().await
    }

    pub async fn set_revs_limit(&self, limit: u64) -> Result<()> {
        self.inner.set_revs_limit(limit).await
    }

    /// Opens the changes feed.
    ///
    /// In continuous mode, `next` blocks until a change arrives; cancel the
    /// iterator's [`Rows::cancel_token`] to unblock it.
    pub async fn changes(&self, options: &Options) -> Result<Rows> {
        let cancel = CancellationToken::new();
        let rows = self.inner.changes(options, cancel.clone()).await?;
        Ok(Rows::new(rows, cancel))
    }

    /// Writes many documents, one result per input. Per-document failures
    /// are reported inline; the call itself succeeds once the batch is accepted.
    pub async fn bulk_docs<T: Serialize>(&self, docs: &[T]) -> Result<BulkResults> {
        let docs = docs
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let results = self.inner.bulk_docs(docs).await?;
        Ok(BulkResults::new(results))
    }

    pub async fn put_attachment(&self, id: &str, rev: &str, attachment: Attachment) -> Result<String> {
        self.inner.put_attachment(id, rev, attachment).await
    }

    pub async fn get_attachment(&self, id: &str, rev: &str, filename: &str) -> Result<Attachment> {
        self.inner.get_attachment(id, rev, filename).await
    }

    pub async fn delete_attachment(&self, id: &str, rev: &str, filename: &str) -> Result<String> {
        self.inner.delete_attachment(id, rev, filename).await
    }

    /// Fetches an attachment's content type and checksum.
    ///
    /// Without native support the attachment is fetched in full and its body
    /// released before returning.
    pub async fn get_attachment_meta(
        &self,
        id: &str,
        rev: &str,
        filename: &str,
    ) -> Result<AttachmentMeta> {
        if let Some(metaer) = self.inner.as_attachment_metaer() {
            return metaer.get_attachment_meta(id, rev, filename).await;
        }
        debug!("Emulating attachment metadata for {}/{}", id, filename);
        let mut attachment = self.inner.get_attachment(id, rev, filename).await?;
        attachment.close();
        Ok(AttachmentMeta {
            content_type: attachment.content_type,
            md5: attachment.md5,
        })
    }

    /// Queries a view. `_design/` and `_view/` prefixes are accepted and stripped.
    pub async fn query(&self, ddoc: &str, view: &str, options: &Options) -> Result<Rows> {
        let view = view.strip_prefix("_view/").unwrap_or(view);
        let rows = self
            .inner
            .query(strip_design_prefix(ddoc), view, options)
            .await?;
        Ok(Rows::new(rows, CancellationToken::new()))
    }

    /// Runs a selector query.
    pub async fn find<T: Serialize + ?Sized>(&self, query: &T) -> Result<Rows> {
        let finder = self.inner.as_finder().ok_or(Error::NotImplemented)?;
        let rows = finder.find(serde_json::to_value(query)?).await?;
        Ok(Rows::new(rows, CancellationToken::new()))
    }

    /// Creates an index unless it already exists.
    pub async fn create_index<T: Serialize + ?Sized>(
        &self,
        ddoc: Option<&str>,
        name: Option<&str>,
        index: &T,
    ) -> Result<()> {
        let finder = self.inner.as_finder().ok_or(Error::NotImplemented)?;
        finder
            .create_index(ddoc, name, serde_json::to_value(index)?)
            .await
    }

    pub async fn get_indexes(&self) -> Result<Vec<Index>> {
        let finder = self.inner.as_finder().ok_or(Error::NotImplemented)?;
        finder.get_indexes().await
    }

    pub async fn delete_index(&self, ddoc: &str, name: &str) -> Result<()> {
        let finder = self.inner.as_finder().ok_or(Error::NotImplemented)?;
        finder.delete_index(ddoc, name).await
    }

    /// Returns the current revision of a document.
    pub async fn rev(&self, id: &str) -> Result<String> {
        if let Some(rever) = self.inner.as_rever() {
            return rever.rev(id).await;
        }
        debug!("Emulating rev lookup for {}", id);
        let doc = self.inner.get(id, &Options::new()).await?;
        Ok(doc.rev)
    }

    /// Flushes the backend to permanent storage. Backends that cannot flush
    /// report success at the current time.
    pub async fn flush(&self) -> Result<DateTime<Utc>> {
        match self.inner.as_flusher() {
            Some(flusher) => flusher.flush().await,
            None => Ok(Utc::now()),
        }
    }

    /// Copies `source_id` onto `target_id`, returning the target's new revision.
    ///
    /// Without native support the source is fetched (with attachments
    /// inline) and written under the target id. An existing target is
    /// overwritten at its current revision, or at `target_rev` when that
    /// option is given, which then fails with `Conflict` if stale.
    pub async fn copy(&self, target_id: &str, source_id: &str, options: &Options) -> Result<String> {
        if let Some(copier) = self.inner.as_copier() {
            return copier.copy(target_id, source_id, options).await;
        }
        debug!("Emulating copy {} -> {}", source_id, target_id);
        let mut source_options = options.clone();
        let explicit_target_rev = source_options
            .remove("target_rev")
            .and_then(|v| v.as_str().map(str::to_string));
        source_options.insert("attachments".into(), Value::Bool(true));

        let mut doc = self.inner.get(source_id, &source_options).await?;
        doc.id = target_id.to_string();
        doc.rev = match explicit_target_rev {
            Some(rev) => rev,
            None => match self.rev(target_id).await {
                Ok(rev) => rev,
                Err(Error::NotFound(_)) => String::new(),
                Err(e) => return Err(e),
            },
        };
        self.inner.put(target_id, doc.to_value()).await
    }
}

fn strip_design_prefix(ddoc: &str) -> &str {
    ddoc.strip_prefix(settee_types::DESIGN_PREFIX).unwrap_or(ddoc)
}
