//! Document intake pipeline
//!
//! One batch in, two artifacts out: the checklist report and the assembled
//! PDF. Extraction and classification run per file in parallel on the
//! blocking pool; results are re-associated by position, so report order is
//! input order. Image conversion is parallel too, but the merge is a single
//! ordered fold.
//!
//! The two stages fail differently. Extraction problems only make a file
//! unreadable; an undecodable image aborts assembly for the whole batch.

pub mod config;
pub mod error;

use std::sync::Arc;

use checklist_engine::{aggregate_or_all_pending, ChecklistEngine, RuleCatalog};
use extraction::ExtractionRouter;
use pdfjoin_core::{merge_documents, to_pdf_bytes, AssemblyOptions};
use shared_types::{ChecklistResult, ClassificationOutcome, IntakeFile};
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub use config::{IntakeConfig, RulesConfig};
pub use error::PipelineError;

/// Result of a processed batch
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub pdf: Vec<u8>,
    pub checklist: ChecklistResult,
}

/// Shared, read-only pipeline state; one per process
#[derive(Debug, Clone)]
pub struct IntakePipeline {
    engine: ChecklistEngine,
    router: ExtractionRouter,
    assembly: AssemblyOptions,
}

impl IntakePipeline {
    pub fn new(catalog: Arc<RuleCatalog>, router: ExtractionRouter, assembly: AssemblyOptions) -> Self {
        Self {
            engine: ChecklistEngine::new(catalog),
            router,
            assembly,
        }
    }

    /// Pipeline with the configured catalog and a tesseract-backed router
    pub fn from_config(config: &IntakeConfig) -> anyhow::Result<Self> {
        let catalog = config.load_catalog()?;
        let router = ExtractionRouter::with_tesseract(config.ocr.clone());
        Ok(Self::new(
            Arc::new(catalog),
            router,
            config.assembly.clone(),
        ))
    }

    pub fn catalog(&self) -> &RuleCatalog {
        self.engine.catalog()
    }

    pub fn router(&self) -> &ExtractionRouter {
        &self.router
    }

    /// Extract and classify every file, outcomes in input order
    pub async fn classify_all(&self, files: Arc<[IntakeFile]>) -> Vec<ClassificationOutcome> {
        let handles: Vec<JoinHandle<ClassificationOutcome>> = (0..files.len())
            .map(|index| {
                let files = Arc::clone(&files);
                let router = self.router.clone();
                let engine = self.engine.clone();
                tokio::task::spawn_blocking(move || {
                    let extraction = router.extract_or_empty(&files[index]);
                    engine.classify(&extraction)
                })
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (file, handle) in files.iter().zip(handles) {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    warn!("Classification task for '{}' failed: {}", file.filename, e);
                    outcomes.push(ClassificationOutcome::unreadable(
                        &file.filename,
                        file.category,
                        0,
                    ));
                }
            }
        }
        outcomes
    }

    /// Checklist report for the batch; never fails
    pub async fn build_checklist(&self, files: Arc<[IntakeFile]>) -> ChecklistResult {
        let outcomes = self.classify_all(files).await;
        let checklist = aggregate_or_all_pending(&outcomes, self.catalog());
        info!(
            "Checklist: {} received, {} pending, {} unreadable, {} unclassified",
            checklist.received.len(),
            checklist.pending.len(),
            checklist.unreadable_files.len(),
            checklist.unclassified_files.len()
        );
        checklist
    }

    /// Assemble the batch into one PDF in input order
    pub async fn assemble(&self, files: Arc<[IntakeFile]>) -> Result<Vec<u8>, PipelineError> {
        let handles: Vec<_> = (0..files.len())
            .map(|index| {
                let files = Arc::clone(&files);
                let options = self.assembly.clone();
                tokio::task::spawn_blocking(move || to_pdf_bytes(&files[index], &options))
            })
            .collect();

        // The first failure in input order wins, so errors are deterministic
        let mut documents = Vec::with_capacity(handles.len());
        let mut pending = handles.into_iter();
        while let Some(handle) = pending.next() {
            let converted = match handle.await {
                Ok(Ok(converted)) => converted,
                Ok(Err(e)) => {
                    abort_remaining(pending);
                    return Err(e.into());
                }
                Err(e) => {
                    abort_remaining(pending);
                    return Err(PipelineError::TaskFailed(e.to_string()));
                }
            };
            if let Some(pdf) = converted {
                documents.push(pdf);
            }
        }

        let merged = tokio::task::spawn_blocking(move || merge_documents(documents))
            .await
            .map_err(|e| PipelineError::TaskFailed(e.to_string()))??;
        Ok(merged)
    }

    /// Run the whole batch: checklist and assembly side by side
    pub async fn process(&self, files: Vec<IntakeFile>) -> Result<PipelineOutput, PipelineError> {
        if files.is_empty() {
            return Err(PipelineError::EmptyBatch);
        }
        info!("Processing batch of {} file(s)", files.len());

        let files: Arc<[IntakeFile]> = files.into();
        let (checklist, pdf) = tokio::join!(
            self.build_checklist(Arc::clone(&files)),
            self.assemble(files)
        );

        Ok(PipelineOutput {
            pdf: pdf?,
            checklist,
        })
    }
}

/// Cancel conversions that have not started; running ones finish detached
fn abort_remaining<T>(handles: impl Iterator<Item = JoinHandle<T>>) -> usize {
    let mut aborted = 0;
    for handle in handles {
        handle.abort();
        aborted += 1;
    }
    if aborted > 0 {
        warn!("Assembly failed; cancelled {} pending conversion(s)", aborted);
    }
    aborted
}
