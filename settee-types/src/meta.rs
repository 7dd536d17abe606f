//! Database, server and index metadata shapes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Statistics about a database.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DbInfo {
    #[serde(rename = "db_name")]
    pub name: String,
    pub compact_running: bool,
    #[serde(rename = "doc_count")]
    pub doc_count: u64,
    #[serde(rename = "doc_del_count")]
    pub deleted_count: u64,
    pub update_seq: String,
    pub disk_size: u64,
    #[serde(rename = "data_size")]
    pub active_size: u64,
}

/// Members of a security document section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Members {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

/// A database security document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Security {
    #[serde(default)]
    pub admins: Members,
    #[serde(default)]
    pub members: Members,
}

/// A rich-query index definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    #[serde(rename = "ddoc", default, skip_serializing_if = "Option::is_none")]
    pub design_doc: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub index_type: String,
    #[serde(rename = "def")]
    pub definition: Value,
}

/// What a server reports about itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub version: String,
    pub vendor: String,
    pub vendor_version: String,
    /// The full, unparsed response.
    #[serde(skip)]
    pub response: Value,
}
