//! HTTP API for a settee server.
//!
//! Routes follow the CouchDB layout. Every request first passes through
//! the session middleware, which turns an `AuthSession` cookie into the
//! caller's identity; administrative routes then require the `_admin` role.

mod api;
mod error;
mod session;

pub use error::{ApiError, ApiResult};
pub use session::Session;

use axum::Router;
use axum::routing::{get, post};
use settee::{Client, Config};
use settee_auth::Sessions;
use std::sync::Arc;

/// Shared state behind every route.
pub struct Service {
    pub client: Client,
    pub sessions: Sessions,
    config: Option<Config>,
}

impl Service {
    pub fn new(client: Client, sessions: Sessions) -> Self {
        Self {
            client,
            sessions,
            config: None,
        }
    }

    /// Serves `/_config` from `config`.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    fn config(&self) -> ApiResult<&Config> {
        self.config
            .as_ref()
            .ok_or(ApiError(settee::Error::NotImplemented))
    }
}

/// Build the HTTP API router over `service`.
pub fn build_router(service: Arc<Service>) -> Router {
    Router::new()
        .route("/", get(api::welcome))
        .route("/_all_dbs", get(api::all_dbs))
        .route(
            "/_session",
            get(session::get_session)
                .post(session::post_session)
                .delete(session::delete_session),
        )
        .route("/_config", get(api::config_all))
        .route("/_config/{section}", get(api::config_section))
        .route("/_config/{section}/{key}", get(api::config_item))
        .route(
            "/{db}",
            axum::routing::put(api::create_db)
                .head(api::db_exists)
                .delete(api::destroy_db),
        )
        .route("/{db}/_ensure_full_commit", post(api::ensure_full_commit))
        .fallback(api::not_found)
        .layer(axum::middleware::from_fn_with_state(
            service.clone(),
            session::resolve_session,
        ))
        .with_state(service)
}
