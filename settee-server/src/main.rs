//! settee HTTP server
//!
//! Serves the CouchDB-style API over a registered settee driver, with
//! cookie sessions checked against the server's `admins` config section.
//!
//! Usage:
//!   settee-server --port 5984 --admin admin=secret

use std::sync::Arc;
use anyhow::{Context, Result};
use clap::Parser;
use settee::Client;
use settee_auth::{ConfAdminStore, Sessions, hash_password};
use settee_server::{Service, build_router};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

const ADMIN_HASH_ITERATIONS: u32 = 10;

#[derive(Parser, Debug)]
#[command(name = "settee-server")]
#[command(about = "CouchDB-style HTTP server over a settee driver")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5984")]
    port: u16,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Driver name
    #[arg(long, default_value = "memory")]
    driver: String,

    /// Data source name passed to the driver
    #[arg(long, default_value = "")]
    dsn: String,

    /// Server administrator as NAME=PASSWORD (repeatable)
    #[arg(long = "admin", value_parser = parse_admin)]
    admins: Vec<(String, String)>,

    /// Session lifetime in seconds
    #[arg(long)]
    session_timeout: Option<u64>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn parse_admin(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, password)) if !name.is_empty() => Ok((name.to_string(), password.to_string())),
        _ => Err(format!("expected NAME=PASSWORD, got {:?}", s)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    settee_memory::register();
    let client = Client::new(&args.driver, &args.dsn)
        .await
        .with_context(|| format!("Failed to open driver {:?}", args.driver))?;
    let config = client
        .config()
        .await
        .context("Driver has no configuration backend")?;

    for (name, password) in &args.admins {
        let salt = uuid::Uuid::new_v4().simple().to_string();
        let hash = hash_password(password, &salt, ADMIN_HASH_ITERATIONS);
        config
            .set("admins", name, &hash)
            .await
            .with_context(|| format!("Failed to register admin {:?}", name))?;
        info!("Registered server admin {}", name);
    }
    if let Some(timeout) = args.session_timeout {
        config
            .set("couch_httpd_auth", "timeout", &timeout.to_string())
            .await
            .context("Failed to set session timeout")?;
    }

    let sessions = Sessions::new(Arc::new(ConfAdminStore::new(config.clone())), config.clone());
    let service = Arc::new(Service::new(client, sessions).with_config(config));
    let app = build_router(service);

    let addr = format!("{}:{}", args.bind, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("settee-server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
