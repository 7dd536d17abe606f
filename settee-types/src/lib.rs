//! Core type definitions for settee.
//!
//! This crate contains the fundamental types shared by the driver contract,
//! the client facade, every backend and the session layer:
//!
//! - [`Document`] and [`Revision`]: versioned records and their version markers
//! - [`Attachment`] and [`Checksum`]: named binary payloads with MD5 digests
//! - [`Row`] and [`BulkResult`]: the elements produced by result iterators
//! - [`DbInfo`], [`Security`], [`Index`], [`ServerInfo`]: metadata shapes
//! - [`UserContext`]: the identity a session resolves to
//! - [`Error`]: the error taxonomy every layer reports through

mod attachment;
mod document;
mod error;
mod meta;
mod row;
mod user;

pub use attachment::{Attachment, Checksum};
pub use document::{Document, Revision, LOCAL_PREFIX, DESIGN_PREFIX};
pub use error::{Error, Result};
pub use meta::{DbInfo, Index, Members, Security, ServerInfo};
pub use row::{BulkResult, Row};
pub use user::UserContext;

/// Backend- and call-specific options, keyed by the wire protocol's option names.
pub type Options = serde_json::Map<String, serde_json::Value>;
