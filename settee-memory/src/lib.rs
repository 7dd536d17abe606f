//! In-memory backend for settee.
//!
//! Everything lives in process memory and is discarded when the last client
//! handle is dropped. Useful for tests and for running the server without
//! persistent storage.
//!
//! # Capabilities
//!
//! Which optional contracts the backend exposes is declared up front with
//! [`Capabilities`]. [`Capabilities::none()`] yields a backend that only
//! satisfies the mandatory contract, which is how the client facade's
//! emulations are exercised.
//!
//! # Views
//!
//! Design documents carry views as `views.<name>.map`, where the map is a
//! dotted field path. Every document holding that field emits one row keyed
//! by the field's value.

mod changes;
mod client;
mod collate;
mod config;
mod database;
mod db;
mod find;
mod listing;

pub use client::MemoryClient;
pub use config::MemoryConfig;
pub use db::MemoryDb;

use async_trait::async_trait;
use settee_driver::{Client, Driver};
use settee_types::Result;
use std::sync::{Arc, Once};

/// Name the backend registers under.
pub const DRIVER_NAME: &str = "memory";

/// The optional contracts a memory backend exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub uuids: bool,
    pub config: bool,
    pub find: bool,
    pub attachment_meta: bool,
    pub rev: bool,
    pub flush: bool,
    pub copy: bool,
}

impl Capabilities {
    /// Every optional contract this backend knows.
    pub const fn all() -> Self {
        Self {
            uuids: true,
            config: true,
            find: true,
            attachment_meta: true,
            rev: true,
            flush: true,
            copy: true,
        }
    }

    /// Mandatory contract only.
    pub const fn none() -> Self {
        Self {
            uuids: false,
            config: false,
            find: false,
            attachment_meta: false,
            rev: false,
            flush: false,
            copy: false,
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::all()
    }
}

/// Driver producing isolated in-memory stores, one per client.
#[derive(Debug, Clone, Default)]
pub struct MemoryDriver {
    capabilities: Capabilities,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        Self { capabilities }
    }
}

#[async_trait]
impl Driver for MemoryDriver {
    async fn new_client(&self, _dsn: &str) -> Result<Box<dyn Client>> {
        Ok(Box::new(MemoryClient::with_capabilities(self.capabilities)))
    }
}

/// Registers the full-featured driver as `"memory"`. Safe to call repeatedly.
pub fn register() {
    static REGISTER: Once = Once::new();
    REGISTER.call_once(|| {
        if let Err(e) = settee::register(DRIVER_NAME, Arc::new(MemoryDriver::new())) {
            tracing::warn!("Memory driver registration failed: {}", e);
        }
    });
}
