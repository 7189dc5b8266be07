//! API handlers for the intake server
//!
//! Every batch endpoint takes multipart field `files`, in batch order, and
//! answers `{ pdf: <base64>, checklist: {...} }`.

use std::time::Duration;

use axum::{
    extract::{Multipart, State},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use checklist_engine::Threshold;
use serde::Serialize;
use shared_types::{ChecklistResult, IntakeFile, MimeCategory};
use tracing::{debug, info};

use crate::error::ServerError;
use crate::AppState;

/// Multipart field carrying the batch files
const FILES_FIELD: &str = "files";

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub ocr_backend: &'static str,
    pub rules: usize,
}

/// Handler: GET /health
pub async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "intake-server",
        version: env!("CARGO_PKG_VERSION"),
        ocr_backend: state.pipeline.router().recognizer_name(),
        rules: state.pipeline.catalog().len(),
    })
}

/// Rule list response
#[derive(Serialize)]
pub struct RuleListResponse {
    pub success: bool,
    pub rules: Vec<RuleInfo>,
    pub count: usize,
}

/// Rule metadata, keywords in their normalized form
#[derive(Serialize)]
pub struct RuleInfo {
    pub key: String,
    pub label: String,
    pub keywords: Vec<String>,
    pub threshold: Option<Threshold>,
}

/// Handler: GET /api/rules
pub async fn handle_list_rules(State(state): State<AppState>) -> Json<RuleListResponse> {
    let rules: Vec<RuleInfo> = state
        .pipeline
        .catalog()
        .iter()
        .map(|rule| RuleInfo {
            key: rule.key.clone(),
            label: rule.label.clone(),
            keywords: rule.keywords.clone(),
            threshold: rule.threshold,
        })
        .collect();

    let count = rules.len();
    Json(RuleListResponse {
        success: true,
        rules,
        count,
    })
}

/// Batch response: assembled PDF and checklist
#[derive(Serialize)]
pub struct BatchResponse {
    /// Base64-encoded PDF
    pub pdf: String,
    pub checklist: ChecklistResult,
}

/// Handler: POST /api/convert-images
pub async fn handle_convert_images(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<BatchResponse>, ServerError> {
    let files = read_batch(multipart, state.max_file_bytes).await?;
    require_category(&files, MimeCategory::Image, "an image")?;
    run_batch(&state, files).await
}

/// Handler: POST /api/merge-pdfs
pub async fn handle_merge_pdfs(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<BatchResponse>, ServerError> {
    let files = read_batch(multipart, state.max_file_bytes).await?;
    require_category(&files, MimeCategory::Pdf, "a PDF")?;
    run_batch(&state, files).await
}

/// Handler: POST /api/convert-and-merge
pub async fn handle_convert_and_merge(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<BatchResponse>, ServerError> {
    let files = read_batch(multipart, state.max_file_bytes).await?;
    run_batch(&state, files).await
}

/// Collect the `files` parts in upload order
async fn read_batch(
    mut multipart: Multipart,
    max_file_bytes: usize,
) -> Result<Vec<IntakeFile>, ServerError> {
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILES_FIELD) {
            debug!("Ignoring multipart field {:?}", field.name());
            continue;
        }

        let filename = field.file_name().unwrap_or("unnamed").to_string();
        let category = MimeCategory::from_content_type(field.content_type().unwrap_or_default());
        let bytes = field.bytes().await?;

        if bytes.len() > max_file_bytes {
            return Err(ServerError::FileTooLarge {
                filename,
                limit_mb: max_file_bytes / (1024 * 1024),
            });
        }

        debug!(
            "Received '{}' ({}, {} bytes)",
            filename,
            category.as_str(),
            bytes.len()
        );
        files.push(IntakeFile::new(filename, category, bytes.to_vec()));
    }

    if files.is_empty() {
        return Err(ServerError::InvalidRequest("No files uploaded".into()));
    }
    Ok(files)
}

fn require_category(
    files: &[IntakeFile],
    category: MimeCategory,
    expected: &str,
) -> Result<(), ServerError> {
    match files.iter().find(|f| f.category != category) {
        Some(file) => Err(ServerError::InvalidRequest(format!(
            "'{}' is not {}",
            file.filename, expected
        ))),
        None => Ok(()),
    }
}

/// Run the pipeline under the configured timeout
async fn run_batch(
    state: &AppState,
    files: Vec<IntakeFile>,
) -> Result<Json<BatchResponse>, ServerError> {
    info!("Batch request: {} file(s)", files.len());

    let output = tokio::time::timeout(
        Duration::from_millis(state.timeout_ms),
        state.pipeline.process(files),
    )
    .await
    .map_err(|_| ServerError::Timeout(state.timeout_ms))??;

    info!(
        "Batch done: {} byte PDF, {} received, {} pending",
        output.pdf.len(),
        output.checklist.received.len(),
        output.checklist.pending.len()
    );

    Ok(Json(BatchResponse {
        pdf: STANDARD.encode(&output.pdf),
        checklist: output.checklist,
    }))
}
