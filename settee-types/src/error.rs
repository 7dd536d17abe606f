//! The error taxonomy shared by every settee layer.

use thiserror::Error;

/// Result type for settee operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur anywhere between the caller and a backend.
///
/// Emulated operations report through the same variants as native ones, so
/// callers never need to know which path served a call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Optional capability absent and no emulation defined.
    #[error("not implemented")]
    NotImplemented,

    /// Document, database, index or user absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad credentials, or a session that was required but is not valid.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Malformed input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Revision mismatch on a targeted write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Backend-reported failure not otherwise classified.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for [`Error::NotFound`].
    pub fn not_found(reason: impl Into<String>) -> Self {
        Self::NotFound(reason.into())
    }

    /// Shorthand for [`Error::BadRequest`].
    pub fn bad_request(reason: impl Into<String>) -> Self {
        Self::BadRequest(reason.into())
    }

    /// Shorthand for [`Error::Conflict`].
    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict(reason.into())
    }

    /// Shorthand for [`Error::Unauthorized`].
    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Unauthorized(reason.into())
    }

    /// Shorthand for [`Error::Internal`].
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal(reason.into())
    }

    /// The HTTP status this error is reported with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotImplemented => 501,
            Self::NotFound(_) => 404,
            Self::Unauthorized(_) => 401,
            Self::BadRequest(_) => 400,
            Self::Conflict(_) => 409,
            Self::Internal(_) => 500,
        }
    }

    /// The wire protocol's `error` token for this error.
    pub fn token(&self) -> &'static str {
        match self {
            Self::NotImplemented => "not_implemented",
            Self::NotFound(_) => "not_found",
            Self::Unauthorized(_) => "unauthorized",
            Self::BadRequest(_) => "bad_request",
            Self::Conflict(_) => "conflict",
            Self::Internal(_) => "internal_server_error",
        }
    }

    /// The human-readable reason, without the variant prefix.
    pub fn reason(&self) -> &str {
        match self {
            Self::NotImplemented => "not implemented",
            Self::NotFound(r)
            | Self::Unauthorized(r)
            | Self::BadRequest(r)
            | Self::Conflict(r)
            | Self::Internal(r) => r,
        }
    }

    /// Returns true for [`Error::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("serialization error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_wire_protocol() {
        assert_eq!(Error::NotImplemented.status_code(), 501);
        assert_eq!(Error::not_found("x").status_code(), 404);
        assert_eq!(Error::unauthorized("x").status_code(), 401);
        assert_eq!(Error::bad_request("x").status_code(), 400);
        assert_eq!(Error::conflict("x").status_code(), 409);
        assert_eq!(Error::internal("x").status_code(), 500);
    }

    #[test]
    fn reason_strips_prefix() {
        let err = Error::conflict("document update conflict");
        assert_eq!(err.reason(), "document update conflict");
        assert_eq!(err.to_string(), "conflict: document update conflict");
    }
}
