use crate::Capabilities;
use crate::config::MemoryConfig;
use crate::database::Database;
use crate::db::MemoryDb;
use async_trait::async_trait;
use serde_json::{Value, json};
use settee_driver::{Client, Config, Configer, Db, Uuider};
use settee_types::{Error, Options, Result, ServerInfo};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use tracing::info;

const VENDOR: &str = "settee";

/// A connection to a private in-memory server.
pub struct MemoryClient {
    dbs: RwLock<BTreeMap<String, Arc<Database>>>,
    defaults: RwLock<Options>,
    config: Arc<MemoryConfig>,
    caps: Capabilities,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::with_capabilities(Capabilities::all())
    }

    pub fn with_capabilities(caps: Capabilities) -> Self {
        Self {
            dbs: RwLock::new(BTreeMap::new()),
            defaults: RwLock::new(Options::new()),
            config: Arc::new(MemoryConfig::new()),
            caps,
        }
    }

    /// Replaces the configuration tree served by this client.
    pub fn with_config(mut self, config: MemoryConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    fn lookup(&self, name: &str) -> Result<Option<Arc<Database>>> {
        let dbs = self
            .dbs
            .read()
            .map_err(|_| Error::internal("database map poisoned"))?;
        Ok(dbs.get(name).cloned())
    }
}

impl Default for MemoryClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Client for MemoryClient {
    async fn server_info(&self) -> Result<ServerInfo> {
        let version = env!("CARGO_PKG_VERSION");
        Ok(ServerInfo {
            version: version.to_string(),
            vendor: VENDOR.to_string(),
            vendor_version: version.to_string(),
            response: json!({
                "couchdb": "Welcome",
                "version": version,
                "vendor": {"name": VENDOR, "version": version},
            }),
        })
    }

    async fn all_dbs(&self) -> Result<Vec<String>> {
        let dbs = self
            .dbs
            .read()
            .map_err(|_| Error::internal("database map poisoned"))?;
        Ok(dbs.keys().cloned().collect())
    }

    async fn db_exists(&self, name: &str) -> Result<bool> {
        Ok(self.lookup(name)?.is_some())
    }

    async fn create_db(&self, name: &str) -> Result<()> {
        let defaults = self
            .defaults
            .read()
            .map_err(|_| Error::internal("defaults poisoned"))?
            .clone();
        let mut dbs = self
            .dbs
            .write()
            .map_err(|_| Error::internal("database map poisoned"))?;
        if dbs.contains_key(name) {
            return Err(Error::conflict(format!("database {name:?} already exists")));
        }
        dbs.insert(name.to_string(), Arc::new(Database::new(name, defaults)));
        info!("Created database {}", name);
        Ok(())
    }

    async fn destroy_db(&self, name: &str) -> Result<()> {
        let mut dbs = self
            .dbs
            .write()
            .map_err(|_| Error::internal("database map poisoned"))?;
        dbs.remove(name)
            .ok_or_else(|| Error::not_found(format!("database {name:?} does not exist")))?;
        info!("Destroyed database {}", name);
        Ok(())
    }

    async fn db(&self, name: &str) -> Result<Box<dyn Db>> {
        let db = self
            .lookup(name)?
            .ok_or_else(|| Error::not_found(format!("database {name:?} does not exist")))?;
        Ok(Box::new(MemoryDb::new(db, self.caps)))
    }

    fn set_default(&self, key: &str, value: Value) -> Result<()> {
        let mut defaults = self
            .defaults
            .write()
            .map_err(|_| Error::internal("defaults poisoned"))?;
        defaults.insert(key.to_string(), value);
        Ok(())
    }

    fn as_uuider(&self) -> Option<&dyn Uuider> {
        self.caps.uuids.then_some(self as &dyn Uuider)
    }

    fn as_configer(&self) -> Option<&dyn Configer> {
        self.caps.config.then_some(self as &dyn Configer)
    }
}

#[async_trait]
impl Uuider for MemoryClient {
    async fn uuids(&self, count: usize) -> Result<Vec<String>> {
        Ok((0..count)
            .map(|_| uuid::Uuid::new_v4().simple().to_string())
            .collect())
    }
}

#[async_trait]
impl Configer for MemoryClient {
    async fn config(&self) -> Result<Arc<dyn Config>> {
        Ok(self.config.clone())
    }
}
