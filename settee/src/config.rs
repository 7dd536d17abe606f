//! Configuration facade.

use settee_driver::ConfigTree;
use settee_types::{Error, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// A backend's configuration tree.
///
/// Single-section and single-item reads use the backend's finer interfaces
/// when it has them, and fall back to coarser reads otherwise.
#[derive(Clone)]
pub struct Config {
    inner: Arc<dyn settee_driver::Config>,
}

impl Config {
    /// Wraps a backend configuration.
    pub fn new(inner: Arc<dyn settee_driver::Config>) -> Self {
        Self { inner }
    }

    /// Reads the full tree.
    pub async fn get_all(&self) -> Result<ConfigTree> {
        self.inner.get_all().await
    }

    /// Reads one section. A missing section is `NotFound`.
    pub async fn get_section(&self, section: &str) -> Result<BTreeMap<String, String>> {
        if let Some(sectioner) = self.inner.as_section() {
            return sectioner.get_section(section).await;
        }
        debug!("Config backend lacks section reads; reading full tree");
        let mut tree = self.inner.get_all().await?;
        tree.remove(section)
            .ok_or_else(|| Error::not_found("configuration section not found"))
    }

    /// Reads one value. A missing section or key is `NotFound`.
    pub async fn get(&self, section: &str, key: &str) -> Result<String> {
        if let Some(itemer) = self.inner.as_item() {
            return itemer.get(section, key).await;
        }
        debug!("Config backend lacks item reads; reading section {:?}", section);
        let mut values = self.get_section(section).await?;
        values
            .remove(key)
            .ok_or_else(|| Error::not_found("configuration key not found"))
    }

    pub async fn set(&self, section: &str, key: &str, value: &str) -> Result<()> {
        self.inner.set(section, key, value).await
    }

    pub async fn delete(&self, section: &str, key: &str) -> Result<()> {
        self.inner.delete(section, key).await
    }
}
