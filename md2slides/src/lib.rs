//! # md2slides: Markdown to Google Slides conversion service
//!
//! `md2slides` is a small HTTP service that turns markdown documents into Google Slides
//! presentations. It does not render slides itself: each request stages the markdown in a temp
//! file and runs an external converter executable (`md2gslides` by default), which authenticates
//! with a Google service account and talks to the Slides API. The service reports the resulting
//! presentation URL back to the caller.
//!
//! ## Request Flow
//!
//! Markdown arrives either as a multipart upload (`POST /convert`) or as JSON text
//! (`POST /convert-text`). The handler writes it to disk, waits for a slot in the
//! [conversion limiter](limits), materializes the service-account key (see [`credentials`]) and
//! runs the converter with a timeout. The presentation URL is scraped from the converter's
//! standard output. Temp files are removed once the request finishes.
//!
//! ### Core Components
//!
//! - [`api`]: axum handlers and request/response models
//! - [`converter`]: argument construction, process execution and output parsing
//! - [`credentials`]: resolving the key file handed to the converter
//! - [`slides`]: a direct Slides API client used by the `create-presentation` binary
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use md2slides::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = md2slides::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     md2slides::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.
pub mod api;
pub mod config;
pub mod converter;
pub mod credentials;
pub mod errors;
pub mod limits;
mod openapi;
pub mod slides;
pub mod telemetry;

#[cfg(test)]
pub mod test_utils;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use bon::Builder;
pub use config::Config;
use tokio::net::TcpListener;
use tower_http::{
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::converter::Converter;
use crate::credentials::CredentialSource;
use crate::limits::Limiters;
use crate::openapi::ApiDoc;

/// Application state shared across all request handlers.
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .converter(Converter::new(&config.converter))
///     .credentials(CredentialSource::from_config(&config.credentials))
///     .config(config)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub converter: Converter,
    pub credentials: CredentialSource,
    #[builder(default)]
    pub limiters: Limiters,
}

/// Build the application router.
///
/// The conversion routes carry the configured body limit. When `static_dir` points at an existing
/// directory its contents are served for any path no route matches.
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> Router {
    let body_limit = usize::try_from(state.config.uploads.max_file_size).unwrap_or(usize::MAX);

    let conversion_routes = Router::new()
        .route("/convert", post(api::handlers::convert::convert_file))
        .route("/convert-text", post(api::handlers::convert::convert_text))
        .layer(DefaultBodyLimit::max(body_limit));

    let mut router = Router::new()
        .route("/health", get(api::handlers::health::health))
        .merge(conversion_routes)
        .with_state(state.clone())
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .route("/openapi.json", get(|| async { axum::Json(ApiDoc::openapi()) }));

    match state.config.static_dir.as_ref() {
        Some(dir) if dir.is_dir() => {
            debug!(dir = %dir.display(), "Serving static files");
            router = router.fallback_service(ServeDir::new(dir));
        }
        Some(dir) => info!(dir = %dir.display(), "Static directory not found, static files disabled"),
        None => {}
    }

    router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    )
}

/// Main application struct that owns the router and configuration.
///
/// 1. **Create**: [`Application::new`] prepares temp directories and builds the router
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and starts handling requests
/// 3. **Shutdown**: When the shutdown signal resolves, in-flight requests drain and telemetry is
///    flushed
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    /// Create a new application instance
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting md2slides with configuration: {:#?}", config);

        for dir in [&config.uploads.dir, &config.uploads.text_dir] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to create directory {}: {}", dir.display(), e))?;
        }

        let credentials = CredentialSource::from_config(&config.credentials);
        match &credentials {
            CredentialSource::Inline { path, .. } => info!(path = %path.display(), "Using inline Google credentials"),
            CredentialSource::File(path) => info!(path = %path.display(), "Using Google credentials file"),
            CredentialSource::Ambient => info!("No Google credentials configured, converter uses its own discovery"),
        }

        let app_state = AppState::builder()
            .converter(Converter::new(&config.converter))
            .credentials(credentials)
            .limiters(Limiters::new(&config.limits))
            .config(config.clone())
            .build();

        let router = build_router(app_state);

        Ok(Self { router, config })
    }

    /// Convert application into a test server (for tests)
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
        info!(
            "md2slides listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router).with_graceful_shutdown(shutdown).await?;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
