//! Two-tier classification: content match, then filename fallback

use shared_types::{ClassificationOutcome, FileExtraction, MatchSource};
use tracing::{debug, info};

use crate::catalog::{DocumentRule, RuleCatalog};
use crate::normalizer::normalize_for_matching;

/// Normalized text at or below this many characters is unreadable
pub const MIN_READABLE_CHARS: usize = 10;

/// Distinct filename keywords that alone are enough for a fallback match
const FILENAME_ONLY_MIN_MATCHES: usize = 2;

pub const FILENAME_FALLBACK_WARNING: &str =
    "Identified from the filename only; the extracted text did not confirm this document type";

/// Whether strictly normalized text carries enough content to classify
pub fn is_readable(normalized_text: &str) -> bool {
    normalized_text.trim().chars().count() > MIN_READABLE_CHARS
}

/// First rule, in declaration order, satisfied by the text
pub fn match_content<'a>(
    normalized_text: &str,
    catalog: &'a RuleCatalog,
) -> Option<&'a DocumentRule> {
    catalog.iter().find(|rule| rule.is_satisfied_by(normalized_text))
}

/// First rule whose keywords show up in the filename
///
/// Accepts a rule when the filename carries two of its distinct keywords, or
/// one keyword that the text also mentions.
pub fn match_filename<'a>(
    normalized_filename: &str,
    normalized_text: &str,
    catalog: &'a RuleCatalog,
) -> Option<&'a DocumentRule> {
    catalog.iter().find(|rule| {
        let in_name = rule.distinct_matches(normalized_filename);
        in_name >= FILENAME_ONLY_MIN_MATCHES
            || (in_name >= 1 && rule.distinct_matches(normalized_text) >= 1)
    })
}

/// Classify one extracted file against the catalog
pub fn classify(extraction: &FileExtraction, catalog: &RuleCatalog) -> ClassificationOutcome {
    let clean_text = normalize_for_matching(&extraction.raw_text);
    let text_length = clean_text.chars().count();
    let filename = extraction.filename.as_str();

    if !is_readable(&clean_text) {
        debug!("'{}' unreadable ({} chars)", filename, text_length);
        return ClassificationOutcome::unreadable(filename, extraction.category, text_length);
    }

    if let Some(rule) = match_content(&clean_text, catalog) {
        info!("'{}' identified as '{}' by content", filename, rule.label);
        return ClassificationOutcome {
            matched_label: Some(rule.label.clone()),
            source: Some(MatchSource::ContentMatch),
            ..ClassificationOutcome::unclassified(filename, extraction.category, text_length)
        };
    }

    let clean_filename = normalize_for_matching(filename);
    if let Some(rule) = match_filename(&clean_filename, &clean_text, catalog) {
        info!(
            "'{}' identified as '{}' by filename fallback",
            filename, rule.label
        );
        return ClassificationOutcome {
            matched_label: Some(rule.label.clone()),
            source: Some(MatchSource::FilenameFallback),
            warning: Some(FILENAME_FALLBACK_WARNING.to_string()),
            ..ClassificationOutcome::unclassified(filename, extraction.category, text_length)
        };
    }

    debug!("'{}' readable but unclassified", filename);
    ClassificationOutcome::unclassified(filename, extraction.category, text_length)
}
