//! Server, database and configuration endpoints.

use crate::Service;
use crate::error::ApiResult;
use crate::session::Session;
use axum::Extension;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde_json::{Value, json};
use settee::{ConfigTree, Error};
use std::collections::BTreeMap;
use std::sync::Arc;

pub async fn welcome(State(service): State<Arc<Service>>) -> ApiResult<Json<Value>> {
    let info = service.client.server_info().await?;
    Ok(Json(json!({
        "couchdb": "Welcome",
        "version": info.version,
        "vendor": {"name": info.vendor, "version": info.vendor_version},
    })))
}

pub async fn all_dbs(State(service): State<Arc<Service>>) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(service.client.all_dbs().await?))
}

pub async fn create_db(
    State(service): State<Arc<Service>>,
    Extension(session): Extension<Session>,
    Path(db): Path<String>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    session.require_admin()?;
    service.client.create_db(&db).await?;
    Ok((StatusCode::CREATED, Json(json!({"ok": true}))))
}

pub async fn db_exists(
    State(service): State<Arc<Service>>,
    Path(db): Path<String>,
) -> ApiResult<StatusCode> {
    if service.client.db_exists(&db).await? {
        Ok(StatusCode::OK)
    } else {
        Ok(StatusCode::NOT_FOUND)
    }
}

pub async fn destroy_db(
    State(service): State<Arc<Service>>,
    Extension(session): Extension<Session>,
    Path(db): Path<String>,
) -> ApiResult<Json<Value>> {
    session.require_admin()?;
    service.client.destroy_db(&db).await?;
    Ok(Json(json!({"ok": true})))
}

pub async fn ensure_full_commit(
    State(service): State<Arc<Service>>,
    Path(db): Path<String>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let handle = service.client.db(&db).await?;
    let started = handle.flush().await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "ok": true,
            "instance_start_time": started.timestamp_micros().to_string(),
        })),
    ))
}

pub async fn config_all(
    State(service): State<Arc<Service>>,
    Extension(session): Extension<Session>,
) -> ApiResult<Json<ConfigTree>> {
    session.require_admin()?;
    Ok(Json(service.config()?.get_all().await?))
}

pub async fn config_section(
    State(service): State<Arc<Service>>,
    Extension(session): Extension<Session>,
    Path(section): Path<String>,
) -> ApiResult<Json<BTreeMap<String, String>>> {
    session.require_admin()?;
    Ok(Json(service.config()?.get_section(&section).await?))
}

pub async fn config_item(
    State(service): State<Arc<Service>>,
    Extension(session): Extension<Session>,
    Path((section, key)): Path<(String, String)>,
) -> ApiResult<Json<String>> {
    session.require_admin()?;
    Ok(Json(service.config()?.get(&section, &key).await?))
}

pub async fn not_found() -> crate::error::ApiError {
    Error::not_found("missing").into()
}
