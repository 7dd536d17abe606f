use crate::config::Config;
use crate::db::Db;
use crate::name::validate_db_name;
use crate::registry;
use serde_json::Value;
use settee_types::{Error, Result, ServerInfo};
use std::any::Any;
use std::sync::Arc;
use tracing::debug;

/// A connection to a CouchDB-like server through a registered backend.
#[derive(Clone)]
pub struct Client {
    dsn: String,
    inner: Arc<dyn settee_driver::Client>,
}

impl Client {
    /// Connects through the driver registered as `driver_name`.
    pub async fn new(driver_name: &str, dsn: &str) -> Result<Self> {
        let driver = registry::lookup(driver_name)?;
        let inner = driver.new_client(dsn).await?;
        Ok(Self {
            dsn: dsn.to_string(),
            inner: Arc::from(inner),
        })
    }

    /// Wraps an already-open backend connection.
    pub fn from_driver(inner: Box<dyn settee_driver::Client>) -> Self {
        Self {
            dsn: String::new(),
            inner: Arc::from(inner),
        }
    }

    /// The data source name this client was opened with.
    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    pub async fn server_info(&self) -> Result<ServerInfo> {
        self.inner.server_info().await
    }

    pub async fn all_dbs(&self) -> Result<Vec<String>> {
        self.inner.all_dbs().await
    }

    pub async fn db_exists(&self, name: &str) -> Result<bool> {
        self.inner.db_exists(name).await
    }

    /// Creates a database. Invalid names are rejected before the backend is called.
    pub async fn create_db(&self, name: &str) -> Result<()> {
        validate_db_name(name)?;
        self.inner.create_db(name).await
    }

    /// Deletes a database. A database that does not exist is `NotFound`,
    /// whatever the backend's own destroy would have reported.
    pub async fn destroy_db(&self, name: &str) -> Result<()> {
        validate_db_name(name)?;
        if !self.inner.db_exists(name).await? {
            return Err(Error::not_found(format!("database {name:?} does not exist")));
        }
        self.inner.destroy_db(name).await
    }

    /// Opens a handle to a database.
    pub async fn db(&self, name: &str) -> Result<Db> {
        let inner = self.inner.db(name).await?;
        Ok(Db::new(name, Arc::from(inner)))
    }

    /// Sets a default option for databases opened later.
    pub fn set_default(&self, key: &str, value: Value) -> Result<()> {
        self.inner.set_default(key, value)
    }

    /// Authenticates the connection with a driver-specific authenticator.
    pub async fn authenticate(&self, authenticator: &(dyn Any + Send + Sync)) -> Result<()> {
        match self.inner.as_authenticator() {
            Some(auth) => auth.authenticate(authenticator).await,
            None => Err(Error::NotImplemented),
        }
    }

    /// Asks the server for `count` UUIDs.
    pub async fn uuids(&self, count: i64) -> Result<Vec<String>> {
        let count = usize::try_from(count)
            .map_err(|_| Error::bad_request("count must be a positive integer"))?;
        match self.inner.as_uuider() {
            Some(uuider) => uuider.uuids(count).await,
            None => Err(Error::NotImplemented),
        }
    }

    /// Reads up to `length` bytes of server log, ending `offset` bytes from the end.
    pub async fn log(&self, length: u64, offset: u64) -> Result<Vec<u8>> {
        match self.inner.as_log_reader() {
            Some(reader) => reader.log(length, offset).await,
            None => Err(Error::NotImplemented),
        }
    }

    /// Returns `(all_nodes, cluster_nodes)`.
    pub async fn membership(&self) -> Result<(Vec<String>, Vec<String>)> {
        match self.inner.as_cluster() {
            Some(cluster) => cluster.membership().await,
            None => Err(Error::NotImplemented),
        }
    }

    /// The backend's configuration tree.
    pub async fn config(&self) -> Result<Config> {
        match self.inner.as_configer() {
            Some(configer) => Ok(Config::new(configer.config().await?)),
            None => {
                debug!("Backend exposes no configuration");
                Err(Error::NotImplemented)
            }
        }
    }
}
