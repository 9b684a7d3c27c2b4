//! # filedrop: a small upload server for `.txt` and `.pdf` files
//!
//! Browsers (or the bundled CLI) send files as `multipart/form-data` to `POST /upload`. Each part
//! is checked against an allow-list of types and a per-file size ceiling, and accepted files are
//! written into a single flat storage directory under their original names. Stored files are
//! listed at `GET /files` and downloaded at `GET /files/{filename}`.
//!
//! ## Architecture
//!
//! - **Web layer**: [Axum](https://github.com/tokio-rs/axum) handlers under [`api::handlers`]
//! - **Storage**: [`storage::FileStore`] trait with a local directory backend
//! - **Filtering**: [`filter::TypePolicy`] decides which parts are accepted
//! - **Frontend**: upload page embedded with `rust-embed` and served at `/`
//! - **Client**: [`client::UploadClient`] for the `upload` and `list` subcommands
//!
//! ## Request Flow
//!
//! ```text
//! POST /upload ─► parse parts ─► type check ─► size check ─► (all parts ok) ─► write to disk
//!                      │              │              │
//!                      └──────────────┴──────────────┴──► {"ok": false, "error": ...}
//! ```
//!
//! No part of a request is written unless every part passes. Uploading a name that already
//! exists replaces the stored file.
//!
//! ## Quick Start
//!
//! ```no_run
//! use filedrop::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let app = Application::new(config).await?;
//!     app.serve(async { tokio::signal::ctrl_c().await.ok(); }).await
//! }
//! ```
//!
//! ## Configuration
//!
//! Loaded from a YAML file plus `FILEDROP_`-prefixed environment variables. See [`config`].

pub mod api;
pub mod client;
pub mod config;
pub mod errors;
pub mod filter;
pub mod openapi;
mod static_assets;
pub mod storage;
pub mod telemetry;

#[cfg(test)]
mod test_utils;

use crate::config::CorsOrigin;
use crate::openapi::ApiDoc;
use crate::storage::{FileStore, LocalFileStore};
use anyhow::Context;
use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{self, HeaderValue, Method},
    routing::{get, post},
};
use axum_prometheus::PrometheusMetricLayer;
use bon::Builder;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, info};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use config::Config;

/// Application state shared across all request handlers.
///
/// ```ignore
/// let state = AppState::builder()
///     .config(config)
///     .storage(Arc::new(LocalFileStore::new("uploads")))
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub storage: Arc<dyn FileStore>,
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let allow_origin = if config.cors.allowed_origins.contains(&CorsOrigin::Wildcard) {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in &config.cors.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                // Browsers send the bare origin, without the trailing slash `Url` adds
                let header_value = url
                    .origin()
                    .ascii_serialization()
                    .parse::<HeaderValue>()
                    .with_context(|| format!("invalid CORS origin {url}"))?;
                origins.push(header_value);
            }
        }
        AllowOrigin::list(origins)
    };

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::HEAD, Method::POST])
        .allow_headers([http::header::CONTENT_TYPE]);

    if let Some(max_age) = config.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router with every endpoint and middleware.
///
/// - `POST /upload` with a body limit of `uploads.max_request_size`
/// - `GET /files` and `GET /files/{filename}`
/// - `/healthz`, the OpenAPI document and its viewer at `/docs`
/// - the embedded upload page for everything else
/// - optional Prometheus metrics at `/internal/metrics`
///
/// # Errors
///
/// Returns an error if the CORS configuration cannot be turned into header values.
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let max_request_size = usize::try_from(state.config.uploads.max_request_size).context("uploads.max_request_size is too large")?;
    let cors_layer = create_cors_layer(&state.config)?;
    let enable_metrics = state.config.enable_metrics;

    let router = Router::new()
        .route(
            "/upload",
            post(api::handlers::uploads::upload_files).layer(DefaultBodyLimit::max(max_request_size)),
        )
        .route("/files", get(api::handlers::files::list_files))
        .route("/files/{filename}", get(api::handlers::files::get_file))
        .route("/healthz", get(|| async { "OK" }))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .with_state(state)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .fallback_service(get(api::handlers::static_assets::serve_embedded_asset));

    let mut router = router.layer(cors_layer);

    if enable_metrics {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        router = router
            .route("/internal/metrics", get(|| async move { metric_handle.render() }))
            .layer(prometheus_layer);
    }

    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// The upload server: storage opened, routes built, ready to bind.
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    /// Open the storage directory (creating it if needed) and build the router
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let storage = LocalFileStore::open(&config.storage.path)
            .await
            .with_context(|| format!("failed to prepare storage directory {}", config.storage.path.display()))?;

        let state = AppState::builder().config(config.clone()).storage(Arc::new(storage)).build();
        let router = build_router(state)?;

        Ok(Self { router, config })
    }

    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        self.serve_on(listener, shutdown).await
    }

    /// Serve on an already bound listener
    pub async fn serve_on<F>(self, listener: TcpListener, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let local_addr = listener.local_addr()?;
        info!(
            "filedrop listening on http://{}, storing files in {}",
            local_addr,
            self.config.storage.path.display()
        );

        axum::serve(listener, self.router).with_graceful_shutdown(shutdown).await?;

        info!("Server stopped");
        Ok(())
    }
}
