//! Client API over CouchDB-compatible backends.
//!
//! One [`Client`] type fronts every registered backend. Backends implement
//! the mandatory contract from `settee-driver`; everything optional is
//! negotiated per call by [`Client`] and [`Db`]:
//!
//! | Capability            | When the backend lacks it                         |
//! |-----------------------|---------------------------------------------------|
//! | authenticate, uuids, log, membership, find & indexes | `Error::NotImplemented` |
//! | attachment metadata   | full fetch, body discarded                        |
//! | current revision      | full document fetch                               |
//! | flush                 | no-op reporting the current time                  |
//! | copy                  | fetch source, put under target                    |
//! | config section / item | derived from the coarser reads                    |
//!
//! # Example
//!
//! ```ignore
//! settee_memory::register();
//! let client = settee::Client::new("memory", "").await?;
//! client.create_db("animals").await?;
//! let db = client.db("animals").await?;
//! let rev = db.put("cow", &serde_json::json!({"says": "moo"})).await?;
//! assert_eq!(db.rev("cow").await?, rev);
//! ```

mod client;
mod config;
mod db;
mod name;
mod registry;
mod rows;

pub use client::Client;
pub use config::Config;
pub use db::Db;
pub use name::validate_db_name;
pub use registry::{register, registered_drivers};
pub use rows::{BulkResults, Rows};

pub use settee_driver::{AttachmentMeta, CancellationToken, ConfigTree, Step};
pub use settee_types::{
    Attachment, BulkResult, Checksum, DbInfo, Document, Error, Index, Members, Options, Result,
    Revision, Row, Security, ServerInfo, UserContext,
};
