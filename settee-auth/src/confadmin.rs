use crate::password::{StoredHash, parse_admin_hash, validate_pbkdf2};
use crate::store::UserStore;
use async_trait::async_trait;
use settee::{Config, Error, Result, UserContext};

const ADMINS_SECTION: &str = "admins";
const ADMIN_ROLE: &str = "_admin";

/// Server administrators listed in the `admins` configuration section.
///
/// Each value is a hash in the `-pbkdf2-<key>,<salt>,<iterations>` format.
/// Every administrator holds the `_admin` role.
#[derive(Clone)]
pub struct ConfAdminStore {
    config: Config,
}

impl ConfAdminStore {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    async fn stored_hash(&self, name: &str) -> Result<StoredHash> {
        let hash = self.config.get(ADMINS_SECTION, name).await?;
        parse_admin_hash(&hash)
    }
}

#[async_trait]
impl UserStore for ConfAdminStore {
    async fn validate(&self, name: &str, password: &str) -> Result<UserContext> {
        let stored = match self.stored_hash(name).await {
            Ok(stored) => stored,
            Err(Error::NotFound(_)) => return Err(Error::unauthorized("unauthorized")),
            Err(e) => return Err(e),
        };
        if !validate_pbkdf2(password, &stored.salt, &stored.derived_key, stored.iterations) {
            return Err(Error::unauthorized("unauthorized"));
        }
        Ok(UserContext::new(name, [ADMIN_ROLE], stored.salt))
    }

    async fn user_ctx(&self, name: &str) -> Result<UserContext> {
        let stored = self.stored_hash(name).await?;
        Ok(UserContext::new(name, [ADMIN_ROLE], stored.salt))
    }
}
