//! Cookie session authentication for settee servers.
//!
//! Sessions are stateless. A login exchanges verified credentials for a
//! token signed with the user's current password salt; every later request
//! presents the token in the `AuthSession` cookie and is checked against the
//! credential store's *current* record. Changing a user's salt (a password
//! reset) therefore invalidates their outstanding sessions.
//!
//! Credentials are checked by a pluggable [`UserStore`]. Two are provided:
//! [`ConfAdminStore`] for server administrators listed in configuration and
//! [`UsersDbStore`] for user documents kept in a database.

mod confadmin;
mod password;
mod session;
mod store;
mod token;
mod usersdb;

pub use confadmin::ConfAdminStore;
pub use password::{PBKDF2_SCHEME, hash_password, validate_pbkdf2};
pub use session::{Credentials, Login, Sessions, logout_cookie, session_cookie, validate_redirect};
pub use store::UserStore;
pub use token::{create_token, decode_token};
pub use usersdb::UsersDbStore;

/// Name of the session cookie.
pub const SESSION_COOKIE_NAME: &str = "AuthSession";

/// Session lifetime in seconds when `couch_httpd_auth.timeout` is unset.
pub const DEFAULT_SESSION_TIMEOUT: i64 = 600;
