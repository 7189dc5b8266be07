//! Folds per-file outcomes into the batch checklist

use shared_types::{ChecklistResult, ClassificationOutcome, FileDetail};
use tracing::error;

use crate::catalog::RuleCatalog;
use crate::error::ChecklistError;

/// Build the checklist from outcomes in input order
///
/// `received` keeps first-seen order without duplicates; `pending` is every
/// catalog label not received, in declaration order.
pub fn aggregate(
    outcomes: &[ClassificationOutcome],
    catalog: &RuleCatalog,
) -> Result<ChecklistResult, ChecklistError> {
    let mut received: Vec<String> = Vec::new();
    let mut unclassified_files = Vec::new();
    let mut unreadable_files = Vec::new();
    let mut files_detail = Vec::with_capacity(outcomes.len());

    for outcome in outcomes {
        match (&outcome.matched_label, outcome.is_readable) {
            (Some(_), false) => {
                return Err(ChecklistError::InconsistentOutcome(
                    outcome.filename.clone(),
                ))
            }
            (Some(label), true) => {
                if !catalog.contains_label(label) {
                    return Err(ChecklistError::UnknownLabel {
                        filename: outcome.filename.clone(),
                        label: label.clone(),
                    });
                }
                if !received.contains(label) {
                    received.push(label.clone());
                }
            }
            (None, true) => unclassified_files.push(outcome.filename.clone()),
            (None, false) => unreadable_files.push(outcome.filename.clone()),
        }

        files_detail.push(FileDetail::from(outcome));
    }

    let pending = catalog
        .labels()
        .into_iter()
        .filter(|label| !received.contains(label))
        .collect();

    Ok(ChecklistResult {
        total_files: outcomes.len(),
        received,
        pending,
        unclassified_files,
        unreadable_files,
        files_detail,
    })
}

/// Checklist with nothing identified: every catalog label pending
pub fn all_pending(total_files: usize, catalog: &RuleCatalog) -> ChecklistResult {
    ChecklistResult {
        total_files,
        received: Vec::new(),
        pending: catalog.labels(),
        unclassified_files: Vec::new(),
        unreadable_files: Vec::new(),
        files_detail: Vec::new(),
    }
}

/// Recovery policy for aggregation: on failure, report nothing identified
pub fn aggregate_or_all_pending(
    outcomes: &[ClassificationOutcome],
    catalog: &RuleCatalog,
) -> ChecklistResult {
    aggregate(outcomes, catalog).unwrap_or_else(|e| {
        error!("Checklist aggregation failed, reporting all pending: {}", e);
        all_pending(outcomes.len(), catalog)
    })
}
