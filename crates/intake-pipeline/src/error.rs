use pdfjoin_core::PdfJoinError;
use thiserror::Error;

/// Batch-level failures; per-file extraction problems never surface here
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No files in batch")]
    EmptyBatch,

    #[error(transparent)]
    Assembly(#[from] PdfJoinError),

    #[error("Background task failed: {0}")]
    TaskFailed(String),
}
