//! Authenticated user identity.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Who a request is acting as.
///
/// Re-fetched from the credential store on every request: the salt is what
/// binds outstanding sessions, so a cached copy would outlive a password
/// change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    pub name: String,
    pub roles: BTreeSet<String>,
    #[serde(skip)]
    pub salt: String,
}

impl UserContext {
    /// Creates a user context.
    pub fn new<I, S>(name: impl Into<String>, roles: I, salt: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            roles: roles.into_iter().map(Into::into).collect(),
            salt: salt.into(),
        }
    }

    /// Returns true if the user holds `role`.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Returns true for server administrators.
    pub fn is_admin(&self) -> bool {
        self.has_role("_admin")
    }
}
