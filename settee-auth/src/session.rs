//! Login, cookie validation and logout.

use crate::store::UserStore;
use crate::token::{create_token, decode_token, verify};
use crate::{DEFAULT_SESSION_TIMEOUT, SESSION_COOKIE_NAME};
use chrono::Utc;
use cookie::Cookie;
use cookie::time::Duration;
use serde::Deserialize;
use settee::{Config, Error, Result, UserContext};
use std::sync::Arc;
use tracing::debug;

const TIMEOUT_SECTION: &str = "couch_httpd_auth";
const TIMEOUT_KEY: &str = "timeout";

/// A login request body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub password: String,
}

/// The outcome of a successful login.
#[derive(Debug, Clone)]
pub struct Login {
    pub user: UserContext,
    pub token: String,
    /// Cookie lifetime in seconds.
    pub max_age: i64,
    /// Where to send the client, if it asked to be redirected.
    pub redirect: Option<String>,
}

impl Login {
    /// The cookie carrying this session.
    pub fn cookie(&self) -> Cookie<'static> {
        session_cookie(&self.token, self.max_age)
    }
}

/// Issues and checks session tokens against a credential store.
#[derive(Clone)]
pub struct Sessions {
    store: Arc<dyn UserStore>,
    config: Config,
}

impl Sessions {
    pub fn new(store: Arc<dyn UserStore>, config: Config) -> Self {
        Self { store, config }
    }

    /// Exchanges credentials for a session.
    ///
    /// The redirect target is checked before a token is issued, so an invalid
    /// `next` rejects the login even when the credentials are correct.
    pub async fn login(&self, credentials: &Credentials, next: Option<&str>) -> Result<Login> {
        self.login_at(credentials, next, Utc::now().timestamp()).await
    }

    pub async fn login_at(
        &self,
        credentials: &Credentials,
        next: Option<&str>,
        now: i64,
    ) -> Result<Login> {
        let name = credentials
            .name
            .as_deref()
            .ok_or_else(|| Error::bad_request("request body must contain a username"))?;
        let user = self.store.validate(name, &credentials.password).await?;
        let redirect = validate_redirect(next)?;
        let max_age = self.timeout().await?;
        let token = create_token(name, &user.salt, now)?;
        debug!("Issued session for {}", name);
        Ok(Login {
            user,
            token,
            max_age,
            redirect,
        })
    }

    /// Resolves the user a session cookie belongs to.
    ///
    /// Every failure, from a malformed token to an unknown user or an
    /// expired session, yields `None`.
    pub async fn validate(&self, token: Option<&str>) -> Option<UserContext> {
        self.validate_at(token, Utc::now().timestamp()).await
    }

    pub async fn validate_at(&self, token: Option<&str>, now: i64) -> Option<UserContext> {
        let token = token?;
        match self.check(token, now).await {
            Ok(user) => Some(user),
            Err(e) => {
                debug!("Session rejected: {}", e);
                None
            }
        }
    }

    async fn check(&self, token: &str, now: i64) -> Result<UserContext> {
        let (name, _) = decode_token(token)?;
        let user = self.store.user_ctx(&name).await?;
        let timeout = self.timeout().await?;
        verify(token, &user.name, &user.salt, timeout, now)?;
        Ok(user)
    }

    /// Session lifetime from `couch_httpd_auth.timeout`, or the default when unset.
    pub async fn timeout(&self) -> Result<i64> {
        match self.config.get(TIMEOUT_SECTION, TIMEOUT_KEY).await {
            Ok(value) => value
                .trim()
                .parse()
                .map_err(|_| Error::internal(format!("invalid session timeout {value:?}"))),
            Err(Error::NotFound(_)) => Ok(DEFAULT_SESSION_TIMEOUT),
            Err(e) => Err(e),
        }
    }
}

/// Checks an optional redirect target. Targets must be relative to the
/// server root: a single leading `/`, never `//`.
pub fn validate_redirect(next: Option<&str>) -> Result<Option<String>> {
    let Some(next) = next else {
        return Ok(None);
    };
    if !next.starts_with('/') {
        return Err(Error::bad_request(
            "redirection url must be relative to server root",
        ));
    }
    if next.starts_with("//") || next.contains('\\') || next.chars().any(char::is_control) {
        return Err(Error::bad_request("invalid redirection url"));
    }
    Ok(Some(next.to_string()))
}

/// The cookie set on login.
pub fn session_cookie(token: &str, max_age: i64) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, token.to_string()))
        .path("/")
        .http_only(true)
        .max_age(Duration::seconds(max_age))
        .build()
}

/// The cookie set on logout, clearing any session.
pub fn logout_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, ""))
        .path("/")
        .http_only(true)
        .max_age(Duration::seconds(-1))
        .build()
}
