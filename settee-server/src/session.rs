//! `/_session` endpoints and the cookie middleware.

use crate::Service;
use crate::error::{ApiError, ApiResult};
use axum::body::Bytes;
use axum::extract::{Query, Request, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Json, Response};
use cookie::Cookie;
use serde::Deserialize;
use serde_json::json;
use settee::{Error, UserContext};
use settee_auth::{Credentials, SESSION_COOKIE_NAME, logout_cookie};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// The user a request acts as, resolved from its session cookie.
#[derive(Debug, Clone, Default)]
pub struct Session(pub Option<UserContext>);

impl Session {
    /// Fails with `Unauthorized` unless the caller is a server administrator.
    pub fn require_admin(&self) -> ApiResult<&UserContext> {
        match &self.0 {
            Some(user) if user.is_admin() => Ok(user),
            Some(_) => Err(Error::unauthorized("You are not a server admin.").into()),
            None => Err(Error::unauthorized("Authentication required.").into()),
        }
    }
}

fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|c| c.name() == SESSION_COOKIE_NAME)
        .map(|c| c.value().to_string())
}

/// Resolves the session cookie into a [`Session`] extension. Never rejects
/// a request; an unusable cookie leaves the caller anonymous.
pub async fn resolve_session(
    State(service): State<Arc<Service>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = session_token(request.headers());
    let user = match token.as_deref() {
        Some(token) => service.sessions.validate(Some(token)).await,
        None => None,
    };
    request.extensions_mut().insert(Session(user));
    next.run(request).await
}

#[derive(Debug, Default, Deserialize)]
struct LoginBody {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    password: String,
    #[serde(default)]
    next: Option<String>,
}

fn parse_login(headers: &HeaderMap, body: &[u8]) -> ApiResult<LoginBody> {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));
    let parsed = if is_json {
        serde_json::from_slice(body).map_err(|e| e.to_string())
    } else {
        serde_urlencoded::from_bytes(body).map_err(|e| e.to_string())
    };
    parsed.map_err(|e| {
        debug!("Unparseable login body: {}", e);
        ApiError(Error::bad_request("unable to parse request data"))
    })
}

fn must_revalidate(headers: &mut HeaderMap) {
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("must-revalidate"));
}

fn header_value(value: &str) -> ApiResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| ApiError(Error::internal("header value not representable")))
}

/// Logs in. Rejections carry the same cache header as a successful login.
pub async fn post_session(
    State(service): State<Arc<Service>>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut response = login_response(&service, &query, &headers, &body)
        .await
        .unwrap_or_else(|e| e.into_response());
    must_revalidate(response.headers_mut());
    response
}

async fn login_response(
    service: &Service,
    query: &HashMap<String, String>,
    headers: &HeaderMap,
    body: &[u8],
) -> ApiResult<Response> {
    let login = parse_login(headers, body)?;
    let next = query.get("next").cloned().or(login.next);
    let credentials = Credentials {
        name: login.name,
        password: login.password,
    };
    let session = service
        .sessions
        .login(&credentials, next.as_deref())
        .await?;

    let body = json!({
        "ok": true,
        "name": &session.user.name,
        "roles": &session.user.roles,
    });
    let status = if session.redirect.is_some() {
        StatusCode::FOUND
    } else {
        StatusCode::OK
    };
    let mut response = (status, Json(body)).into_response();
    let headers = response.headers_mut();
    headers.insert(header::SET_COOKIE, header_value(&session.cookie().to_string())?);
    if let Some(location) = &session.redirect {
        headers.insert(header::LOCATION, header_value(location)?);
    }
    Ok(response)
}

pub async fn delete_session() -> ApiResult<Response> {
    let mut response = Json(json!({"ok": true})).into_response();
    let headers = response.headers_mut();
    must_revalidate(headers);
    headers.insert(header::SET_COOKIE, header_value(&logout_cookie().to_string())?);
    Ok(response)
}

pub async fn get_session(axum::Extension(session): axum::Extension<Session>) -> Json<serde_json::Value> {
    let (name, roles) = match &session.0 {
        Some(user) => (json!(user.name), json!(user.roles)),
        None => (serde_json::Value::Null, json!([])),
    };
    let mut info = json!({"authentication_handlers": ["cookie"]});
    if session.0.is_some() {
        info["authenticated"] = json!("cookie");
    }
    Json(json!({
        "ok": true,
        "userCtx": {"name": name, "roles": roles},
        "info": info,
    }))
}
