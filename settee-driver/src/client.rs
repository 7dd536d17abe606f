//! Driver and client-level contracts.

use crate::config::Config;
use crate::db::Db;
use async_trait::async_trait;
use serde_json::Value;
use settee_types::{Result, ServerInfo};
use std::any::Any;
use std::sync::Arc;

/// A named backend implementation, registered once at startup.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Opens a connection. The data source name is in a driver-specific format.
    async fn new_client(&self, dsn: &str) -> Result<Box<dyn Client>>;
}

/// A connection to a database server.
#[async_trait]
pub trait Client: Send + Sync {
    /// Returns the server implementation's details.
    async fn server_info(&self) -> Result<ServerInfo>;

    /// Lists every database.
    async fn all_dbs(&self) -> Result<Vec<String>>;

    /// Returns true if the database exists.
    async fn db_exists(&self, name: &str) -> Result<bool>;

    /// Creates a database. The name has already been validated.
    async fn create_db(&self, name: &str) -> Result<()>;

    /// Deletes a database.
    async fn destroy_db(&self, name: &str) -> Result<()>;

    /// Opens a handle to a database.
    async fn db(&self, name: &str) -> Result<Box<dyn Db>>;

    /// Sets a default option propagated to databases opened later.
    fn set_default(&self, key: &str, value: Value) -> Result<()>;

    fn as_authenticator(&self) -> Option<&dyn Authenticator> {
        None
    }

    fn as_uuider(&self) -> Option<&dyn Uuider> {
        None
    }

    fn as_log_reader(&self) -> Option<&dyn LogReader> {
        None
    }

    fn as_cluster(&self) -> Option<&dyn Cluster> {
        None
    }

    fn as_configer(&self) -> Option<&dyn Configer> {
        None
    }
}

/// Authenticated connections. The authenticator value is driver specific;
/// drivers reject types they do not understand.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, authenticator: &(dyn Any + Send + Sync)) -> Result<()>;
}

/// Server-side UUID generation.
#[async_trait]
pub trait Uuider: Send + Sync {
    async fn uuids(&self, count: usize) -> Result<Vec<String>>;
}

/// Server log access.
#[async_trait]
pub trait LogReader: Send + Sync {
    /// Reads up to `length` bytes of log, ending `offset` bytes from the end.
    async fn log(&self, length: u64, offset: u64) -> Result<Vec<u8>>;
}

/// Cluster membership.
#[async_trait]
pub trait Cluster: Send + Sync {
    /// Returns `(all_nodes, cluster_nodes)`.
    async fn membership(&self) -> Result<(Vec<String>, Vec<String>)>;
}

/// Access to the backend's configuration tree.
#[async_trait]
pub trait Configer: Send + Sync {
    async fn config(&self) -> Result<Arc<dyn Config>>;
}
