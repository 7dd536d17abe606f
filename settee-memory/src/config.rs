use async_trait::async_trait;
use settee_driver::{Config, ConfigItem, ConfigSection, ConfigTree};
use settee_types::{Error, Result};
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Configuration tree held in memory.
///
/// Readers run concurrently; `set` and `delete` take the single writer slot.
/// [`MemoryConfig::tree_only`] hides the section- and item-level reads so
/// callers fall back to reading the whole tree.
#[derive(Debug, Default)]
pub struct MemoryConfig {
    tree: RwLock<ConfigTree>,
    fine_grained: bool,
}

impl MemoryConfig {
    pub fn new() -> Self {
        Self {
            tree: RwLock::new(ConfigTree::new()),
            fine_grained: true,
        }
    }

    /// Only the whole-tree contract is exposed.
    pub fn tree_only() -> Self {
        Self {
            tree: RwLock::new(ConfigTree::new()),
            fine_grained: false,
        }
    }

    /// Seeds a value at construction time.
    pub fn with(self, section: &str, key: &str, value: &str) -> Self {
        if let Ok(mut tree) = self.tree.write() {
            tree.entry(section.to_string())
                .or_default()
                .insert(key.to_string(), value.to_string());
        }
        self
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, ConfigTree>> {
        self.tree
            .read()
            .map_err(|_| Error::internal("config lock poisoned"))
    }
}

#[async_trait]
impl Config for MemoryConfig {
    async fn get_all(&self) -> Result<ConfigTree> {
        Ok(self.read()?.clone())
    }

    async fn set(&self, section: &str, key: &str, value: &str) -> Result<()> {
        let mut tree = self
            .tree
            .write()
            .map_err(|_| Error::internal("config lock poisoned"))?;
        tree.entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, section: &str, key: &str) -> Result<()> {
        let mut tree = self
            .tree
            .write()
            .map_err(|_| Error::internal("config lock poisoned"))?;
        let entries = tree
            .get_mut(section)
            .ok_or_else(|| Error::not_found("unknown_config_value"))?;
        entries
            .remove(key)
            .ok_or_else(|| Error::not_found("unknown_config_value"))?;
        if entries.is_empty() {
            tree.remove(section);
        }
        Ok(())
    }

    fn as_section(&self) -> Option<&dyn ConfigSection> {
        self.fine_grained.then_some(self as &dyn ConfigSection)
    }

    fn as_item(&self) -> Option<&dyn ConfigItem> {
        self.fine_grained.then_some(self as &dyn ConfigItem)
    }
}

#[async_trait]
impl ConfigSection for MemoryConfig {
    async fn get_section(&self, section: &str) -> Result<BTreeMap<String, String>> {
        self.read()?
            .get(section)
            .cloned()
            .ok_or_else(|| Error::not_found("unknown_config_value"))
    }
}

#[async_trait]
impl ConfigItem for MemoryConfig {
    async fn get(&self, section: &str, key: &str) -> Result<String> {
        self.read()?
            .get(section)
            .and_then(|s| s.get(key))
            .cloned()
            .ok_or_else(|| Error::not_found("unknown_config_value"))
    }
}
