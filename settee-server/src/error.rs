use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

/// A settee error rendered as `{"error": token, "reason": text}`.
#[derive(Debug)]
pub struct ApiError(pub settee::Error);

impl From<settee::Error> for ApiError {
    fn from(e: settee::Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::warn!("Request failed: {}", self.0);
        }
        let body = json!({"error": self.0.token(), "reason": self.0.reason()});
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
