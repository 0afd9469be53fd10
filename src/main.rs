use anyhow::{Context, Result};
use axum::Router;
use std::{io::ErrorKind, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;

use models::{object::public_url_base, object_key::KeyGenerator};
use services::{
    s3_store::S3Store,
    storage_service::{StorageService, UploadLimits},
};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // --- Parse config ---
    let cfg = config::AppConfig::from_env_and_args().context("resolving configuration")?;

    tracing::info!("Starting upload-relay with config: {:?}", cfg);

    // --- Initialize S3 client; no credentials means no server ---
    let store = S3Store::connect(&cfg)
        .await
        .context("unable to load AWS SDK config")?;
    tracing::info!(
        "S3 client ready for bucket {} in {}",
        store.bucket(),
        cfg.region
    );

    // --- Initialize core service ---
    let storage = StorageService::new(
        Arc::new(store),
        public_url_base(&cfg.bucket, &cfg.region, cfg.endpoint_url.as_deref()),
        cfg.spool_dir.clone(),
        KeyGenerator::new(cfg.key_scheme()),
        UploadLimits {
            max_upload_bytes: cfg.max_upload_bytes,
            request_timeout: cfg.request_timeout(),
        },
    );

    // --- Build router ---
    let app: Router = routes::routes::routes(cfg.body_limit()).with_state(storage);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err).with_context(|| format!("binding {}", addr)),
    };

    tracing::info!("Server is running at http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Resolve on Ctrl-C so in-flight uploads can finish.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(err) => {
            tracing::warn!("Failed to listen for shutdown signal: {}", err);
            std::future::pending::<()>().await;
        }
    }
}
