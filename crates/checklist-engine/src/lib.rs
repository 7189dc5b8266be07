//! Required-document checklist engine
//!
//! Classifies extracted text against an ordered [`RuleCatalog`] and folds the
//! per-file outcomes into a [`ChecklistResult`].
//!
//! The catalog is loaded once and passed in explicitly; nothing here reads
//! global state, so tests can run against synthetic catalogs.

pub mod aggregate;
pub mod catalog;
pub mod classify;
pub mod error;
pub mod normalizer;

use std::sync::Arc;

use shared_types::{ChecklistResult, ClassificationOutcome, FileExtraction};

pub use aggregate::{aggregate, aggregate_or_all_pending, all_pending};
pub use catalog::{DocumentRule, RuleCatalog, Threshold, BUILTIN_RULES_JSON};
pub use classify::{classify, FILENAME_FALLBACK_WARNING, MIN_READABLE_CHARS};
pub use error::{CatalogError, ChecklistError};
pub use normalizer::{normalize_for_matching, normalize_text};

/// ChecklistEngine entry point
#[derive(Debug, Clone)]
pub struct ChecklistEngine {
    catalog: Arc<RuleCatalog>,
}

impl ChecklistEngine {
    pub fn new(catalog: Arc<RuleCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    pub fn classify(&self, extraction: &FileExtraction) -> ClassificationOutcome {
        classify::classify(extraction, &self.catalog)
    }

    /// Classify a batch, keeping input order
    pub fn classify_batch(&self, extractions: &[FileExtraction]) -> Vec<ClassificationOutcome> {
        extractions.iter().map(|e| self.classify(e)).collect()
    }

    /// Classify and aggregate in one step
    pub fn generate_checklist(&self, extractions: &[FileExtraction]) -> ChecklistResult {
        let outcomes = self.classify_batch(extractions);
        aggregate_or_all_pending(&outcomes, &self.catalog)
    }
}
