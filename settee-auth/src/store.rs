use async_trait::async_trait;
use settee::{Result, UserContext};

/// A source of user credentials.
///
/// Implementations distinguish only "not found" from other failures;
/// callers do not inspect anything finer.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Checks a password. Unknown users and wrong passwords are both
    /// `Unauthorized`.
    async fn validate(&self, name: &str, password: &str) -> Result<UserContext>;

    /// Looks up a user's current roles and salt. Unknown users are `NotFound`.
    async fn user_ctx(&self, name: &str) -> Result<UserContext>;
}
