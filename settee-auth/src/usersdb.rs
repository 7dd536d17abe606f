use crate::password::{PBKDF2_SCHEME, validate_pbkdf2};
use crate::store::UserStore;
use async_trait::async_trait;
use serde::Deserialize;
use settee::{Db, Error, Options, Result, UserContext};

const USER_PREFIX: &str = "org.couchdb.user:";

#[derive(Debug, Deserialize)]
struct UserDoc {
    name: String,
    #[serde(default)]
    roles: Vec<String>,
    password_scheme: String,
    derived_key: String,
    salt: String,
    iterations: u32,
}

/// Users kept as `org.couchdb.user:<name>` documents in a database.
#[derive(Clone)]
pub struct UsersDbStore {
    db: Db,
}

impl UsersDbStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    async fn fetch(&self, name: &str) -> Result<UserDoc> {
        let value = self
            .db
            .get(&format!("{USER_PREFIX}{name}"), &Options::new())
            .await?
            .to_value();
        let doc: UserDoc = serde_json::from_value(value)
            .map_err(|e| Error::internal(format!("malformed user document: {e}")))?;
        if doc.name != name {
            return Err(Error::internal("user document name does not match its id"));
        }
        if doc.password_scheme != PBKDF2_SCHEME {
            return Err(Error::internal(format!(
                "unsupported password scheme {:?}",
                doc.password_scheme
            )));
        }
        Ok(doc)
    }
}

#[async_trait]
impl UserStore for UsersDbStore {
    async fn validate(&self, name: &str, password: &str) -> Result<UserContext> {
        let doc = match self.fetch(name).await {
            Ok(doc) => doc,
            Err(Error::NotFound(_)) => return Err(Error::unauthorized("unauthorized")),
            Err(e) => return Err(e),
        };
        if !validate_pbkdf2(password, &doc.salt, &doc.derived_key, doc.iterations) {
            return Err(Error::unauthorized("unauthorized"));
        }
        Ok(UserContext::new(doc.name, doc.roles, doc.salt))
    }

    async fn user_ctx(&self, name: &str) -> Result<UserContext> {
        let doc = self.fetch(name).await?;
        Ok(UserContext::new(doc.name, doc.roles, doc.salt))
    }
}
