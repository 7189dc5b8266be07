//! Document intake server
//!
//! Accepts a batch of scanned images and PDFs over multipart and returns the
//! required-document checklist together with a single assembled PDF:
//!
//! - `POST /api/convert-images` - images only
//! - `POST /api/merge-pdfs` - PDFs only
//! - `POST /api/convert-and-merge` - mixed batch
//! - `GET /api/rules` - the loaded rule catalog
//! - `GET /health`

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use clap::Parser;
use extraction::TesseractRecognizer;
use intake_pipeline::{IntakeConfig, IntakePipeline};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api;
mod error;

use api::{
    handle_convert_and_merge, handle_convert_images, handle_health, handle_list_rules,
    handle_merge_pdfs,
};

/// Upper bound on files per request, used to size the body limit
const MAX_BATCH_FILES: usize = 20;

/// Command-line arguments for the intake server
#[derive(Parser, Debug)]
#[command(name = "intake-server")]
#[command(about = "Document intake server: checklist classification and PDF assembly")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Pipeline configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Rule catalog (JSON); overrides `[rules] path`
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Whole-batch processing timeout in milliseconds
    #[arg(long, default_value = "120000")]
    timeout_ms: u64,

    /// Per-file upload limit in megabytes
    #[arg(long, default_value = "50")]
    max_upload_mb: usize,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<IntakePipeline>,
    /// Batch timeout in milliseconds
    pub timeout_ms: u64,
    pub max_file_bytes: usize,
}

/// Routes and middleware, shared by `main` and the tests
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = state.max_file_bytes.saturating_mul(MAX_BATCH_FILES);

    Router::new()
        // Health check
        .route("/health", get(handle_health))
        // API endpoints
        .route("/api/rules", get(handle_list_rules))
        .route("/api/convert-images", post(handle_convert_images))
        .route("/api/merge-pdfs", post(handle_merge_pdfs))
        .route("/api/convert-and-merge", post(handle_convert_and_merge))
        // Apply middleware
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = match &args.config {
        Some(path) => IntakeConfig::from_file(path)?,
        None => IntakeConfig::default(),
    };
    if let Some(rules) = args.rules {
        config.rules.path = Some(rules);
    }

    if !TesseractRecognizer::new(&config.ocr).is_available() {
        warn!(
            "'{}' is not runnable; every image will be reported unreadable",
            config.ocr.tesseract_path
        );
    }

    let pipeline = IntakePipeline::from_config(&config)?;
    info!("Rule catalog: {:?}", pipeline.catalog().labels());

    let state = AppState {
        pipeline: Arc::new(pipeline),
        timeout_ms: args.timeout_ms,
        max_file_bytes: args.max_upload_mb.saturating_mul(1024 * 1024),
    };

    let app = build_router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);
    info!("Batch timeout: {}ms", args.timeout_ms);
    info!("Upload limit: {}MB per file", args.max_upload_mb);

    axum::serve(listener, app).await?;

    Ok(())
}
