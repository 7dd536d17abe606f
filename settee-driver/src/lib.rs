//! Backend contract for settee.
//!
//! A backend is a [`Driver`] that opens [`Client`] connections, which in
//! turn hand out [`Db`] handles. Every backend implements the mandatory
//! methods of these traits. Behavior that only some backends support lives
//! in separate optional traits ([`Uuider`], [`Rever`], [`Finder`], ...),
//! surfaced through `as_*` accessors that default to `None`.
//!
//! # Capability probing
//!
//! The client facade asks a backend for an optional trait object on every
//! call. The accessors must be side-effect free; a backend's capability set
//! is fixed for its lifetime, so returning `Some(self)` or `None` is all an
//! implementation ever does.
//!
//! # Iterators
//!
//! Multi-row operations return [`Rows`] or [`BulkResults`]: pull-based
//! cursors that fill a caller-supplied slot and report exhaustion with
//! [`Step::EndOfStream`] rather than an error.

mod client;
mod config;
mod db;
pub mod rows;

pub use client::{Authenticator, Client, Cluster, Configer, Driver, LogReader, Uuider};
pub use config::{Config, ConfigItem, ConfigSection, ConfigTree};
pub use db::{AttachmentMeta, AttachmentMetaer, Copier, Db, Finder, Flusher, Rever};
pub use rows::{BulkResults, Rows, Step};

pub use settee_types::{Error, Options, Result};
pub use tokio_util::sync::CancellationToken;
