//! Configuration access at three granularities.

use async_trait::async_trait;
use settee_types::Result;
use std::collections::BTreeMap;

/// Section name → key → value.
pub type ConfigTree = BTreeMap<String, BTreeMap<String, String>>;

/// The minimal configuration backend.
#[async_trait]
pub trait Config: Send + Sync {
    /// Reads the full tree.
    async fn get_all(&self) -> Result<ConfigTree>;

    async fn set(&self, section: &str, key: &str, value: &str) -> Result<()>;

    /// Removes a key. Missing sections or keys are `NotFound`.
    async fn delete(&self, section: &str, key: &str) -> Result<()>;

    fn as_section(&self) -> Option<&dyn ConfigSection> {
        None
    }

    fn as_item(&self) -> Option<&dyn ConfigItem> {
        None
    }
}

/// Reading one section without the rest of the tree.
#[async_trait]
pub trait ConfigSection: Send + Sync {
    async fn get_section(&self, section: &str) -> Result<BTreeMap<String, String>>;
}

/// Reading one value without the rest of the tree.
#[async_trait]
pub trait ConfigItem: Send + Sync {
    async fn get(&self, section: &str, key: &str) -> Result<String>;
}
