//! Process-wide driver registry.
//!
//! Populated during startup and read concurrently afterwards.

use settee_driver::Driver;
use settee_types::{Error, Result};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, RwLock};
use tracing::debug;

static DRIVERS: LazyLock<RwLock<HashMap<String, Arc<dyn Driver>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Makes a driver available under `name`. Registering a name twice fails.
pub fn register(name: &str, driver: Arc<dyn Driver>) -> Result<()> {
    let mut drivers = DRIVERS
        .write()
        .map_err(|_| Error::internal("driver registry poisoned"))?;
    if drivers.contains_key(name) {
        return Err(Error::internal(format!("driver {name:?} registered twice")));
    }
    debug!("Registered driver {:?}", name);
    drivers.insert(name.to_string(), driver);
    Ok(())
}

/// Names of all registered drivers, sorted.
pub fn registered_drivers() -> Vec<String> {
    let mut names: Vec<String> = DRIVERS
        .read()
        .map(|d| d.keys().cloned().collect())
        .unwrap_or_default();
    names.sort();
    names
}

pub(crate) fn lookup(name: &str) -> Result<Arc<dyn Driver>> {
    let drivers = DRIVERS
        .read()
        .map_err(|_| Error::internal("driver registry poisoned"))?;
    drivers
        .get(name)
        .cloned()
        .ok_or_else(|| Error::not_found(format!("unknown driver {name:?} (forgotten register?)")))
}
