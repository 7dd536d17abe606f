//! Database-level contracts.

use crate::rows::{BulkResults, Rows};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use settee_types::{Attachment, Checksum, DbInfo, Document, Index, Options, Result, Security};
use tokio_util::sync::CancellationToken;

/// A handle to one database. Every method here is mandatory.
#[async_trait]
pub trait Db: Send + Sync {
    /// Sets a database-specific option.
    fn set_option(&self, key: &str, value: Value) -> Result<()>;

    /// Lists documents, subject to the listing options.
    async fn all_docs(&self, options: &Options) -> Result<Box<dyn Rows>>;

    /// Fetches a document.
    async fn get(&self, id: &str, options: &Options) -> Result<Document>;

    /// Creates a document with a backend-generated id. Returns `(id, rev)`.
    async fn create_doc(&self, doc: Value) -> Result<(String, String)>;

    /// Writes a document under `id`, returning its new revision.
    async fn put(&self, id: &str, doc: Value) -> Result<String>;

    /// Marks a document deleted, returning the tombstone revision.
    async fn delete(&self, id: &str, rev: &str) -> Result<String>;

    async fn info(&self) -> Result<DbInfo>;

    async fn compact(&self) -> Result<()>;

    /// Compacts the indexes of one design document.
    async fn compact_view(&self, ddoc: &str) -> Result<()>;

    /// Removes index files no current design document refers to.
    async fn view_cleanup(&self) -> Result<()>;

    async fn security(&self) -> Result<Security>;

    async fn set_security(&self, security: &Security) -> Result<()>;

    /// Maximum number of revisions tracked per document.
    async fn revs_limit(&self) -> Result<u64>;

    async fn set_revs_limit(&self, limit: u64) -> Result<()>;

    /// Opens the changes feed. In continuous mode the iterator blocks for new
    /// data until `cancel` fires or the caller closes it.
    async fn changes(&self, options: &Options, cancel: CancellationToken)
    -> Result<Box<dyn Rows>>;

    /// Writes many documents at once, one result per input document.
    async fn bulk_docs(&self, docs: Vec<Value>) -> Result<Box<dyn BulkResults>>;

    /// Uploads an attachment, returning the document's new revision. An empty
    /// `rev` creates the document.
    async fn put_attachment(&self, id: &str, rev: &str, attachment: Attachment) -> Result<String>;

    /// Fetches an attachment. An empty `rev` means the current revision.
    async fn get_attachment(&self, id: &str, rev: &str, filename: &str) -> Result<Attachment>;

    /// Removes an attachment, returning the document's new revision.
    async fn delete_attachment(&self, id: &str, rev: &str, filename: &str) -> Result<String>;

    /// Queries a view. `ddoc` and `view` carry no `_design/` or `_view/` prefix.
    async fn query(&self, ddoc: &str, view: &str, options: &Options) -> Result<Box<dyn Rows>>;

    fn as_finder(&self) -> Option<&dyn Finder> {
        None
    }

    fn as_attachment_metaer(&self) -> Option<&dyn AttachmentMetaer> {
        None
    }

    fn as_rever(&self) -> Option<&dyn Rever> {
        None
    }

    fn as_flusher(&self) -> Option<&dyn Flusher> {
        None
    }

    fn as_copier(&self) -> Option<&dyn Copier> {
        None
    }
}

/// Selector-based querying and index management.
#[async_trait]
pub trait Finder: Send + Sync {
    async fn find(&self, query: Value) -> Result<Box<dyn Rows>>;

    /// Creates an index unless it already exists. The backend picks `ddoc`
    /// and `name` when they are not supplied.
    async fn create_index(&self, ddoc: Option<&str>, name: Option<&str>, index: Value)
    -> Result<()>;

    async fn get_indexes(&self) -> Result<Vec<Index>>;

    async fn delete_index(&self, ddoc: &str, name: &str) -> Result<()>;
}

/// Headers of an attachment without its body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentMeta {
    pub content_type: String,
    pub md5: Checksum,
}

/// Attachment metadata without transferring the body.
#[async_trait]
pub trait AttachmentMetaer: Send + Sync {
    async fn get_attachment_meta(&self, id: &str, rev: &str, filename: &str)
    -> Result<AttachmentMeta>;
}

/// Current-revision lookup without fetching the document body.
#[async_trait]
pub trait Rever: Send + Sync {
    async fn rev(&self, id: &str) -> Result<String>;
}

/// Forced flush of the backend's storage.
#[async_trait]
pub trait Flusher: Send + Sync {
    /// Returns when the backend opened its storage.
    async fn flush(&self) -> Result<DateTime<Utc>>;
}

/// Server-side document copy.
#[async_trait]
pub trait Copier: Send + Sync {
    async fn copy(&self, target_id: &str, source_id: &str, options: &Options) -> Result<String>;
}
