use serde::{Deserialize, Serialize};

/// Coarse content category of an uploaded file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MimeCategory {
    Image,
    Pdf,
    Other,
}

impl MimeCategory {
    /// Map an HTTP content type onto a category
    pub fn from_content_type(content_type: &str) -> Self {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if essence == "application/pdf" {
            MimeCategory::Pdf
        } else if essence.starts_with("image/") {
            MimeCategory::Image
        } else {
            MimeCategory::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MimeCategory::Image => "image",
            MimeCategory::Pdf => "pdf",
            MimeCategory::Other => "other",
        }
    }
}

/// One file of a submitted batch, in caller order
#[derive(Debug, Clone)]
pub struct IntakeFile {
    pub filename: String,
    pub category: MimeCategory,
    pub bytes: Vec<u8>,
}

impl IntakeFile {
    pub fn new(filename: impl Into<String>, category: MimeCategory, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            category,
            bytes,
        }
    }
}

/// How the text of a file was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Optical recognition over a preprocessed image
    Ocr,
    /// Embedded PDF text layer
    TextLayer,
    /// Category not eligible for extraction
    Skipped,
}

/// Raw text extracted from a single file (request-scoped)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileExtraction {
    pub filename: String,
    pub category: MimeCategory,
    pub raw_text: String,
    pub method: ExtractionMethod,
    pub extraction_time_ms: u64,
}

impl FileExtraction {
    pub fn new(filename: impl Into<String>, category: MimeCategory, raw_text: String) -> Self {
        let method = match category {
            MimeCategory::Image => ExtractionMethod::Ocr,
            MimeCategory::Pdf => ExtractionMethod::TextLayer,
            MimeCategory::Other => ExtractionMethod::Skipped,
        };
        Self {
            filename: filename.into(),
            category,
            raw_text,
            method,
            extraction_time_ms: 0,
        }
    }

    pub fn with_time(mut self, ms: u64) -> Self {
        self.extraction_time_ms = ms;
        self
    }
}

/// Provenance of a label assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    ContentMatch,
    FilenameFallback,
}

/// Classification of a single file against the rule catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationOutcome {
    pub filename: String,
    pub category: MimeCategory,
    /// Length in characters of the strictly normalized text
    pub text_length: usize,
    pub is_readable: bool,
    pub matched_label: Option<String>,
    pub source: Option<MatchSource>,
    pub warning: Option<String>,
}

impl ClassificationOutcome {
    pub fn unreadable(filename: &str, category: MimeCategory, text_length: usize) -> Self {
        Self {
            filename: filename.to_string(),
            category,
            text_length,
            is_readable: false,
            matched_label: None,
            source: None,
            warning: None,
        }
    }

    pub fn unclassified(filename: &str, category: MimeCategory, text_length: usize) -> Self {
        Self {
            is_readable: true,
            ..Self::unreadable(filename, category, text_length)
        }
    }

    pub fn is_identified(&self) -> bool {
        self.matched_label.is_some()
    }
}

/// Per-file row of the checklist report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDetail {
    pub filename: String,
    #[serde(rename = "type")]
    pub file_type: MimeCategory,
    pub text_length: usize,
    pub is_readable: bool,
    pub is_identified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_rule: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<MatchSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl From<&ClassificationOutcome> for FileDetail {
    fn from(outcome: &ClassificationOutcome) -> Self {
        Self {
            filename: outcome.filename.clone(),
            file_type: outcome.category,
            text_length: outcome.text_length,
            is_readable: outcome.is_readable,
            is_identified: outcome.is_identified(),
            matched_rule: outcome.matched_label.clone(),
            source: outcome.source,
            warning: outcome.warning.clone(),
        }
    }
}

/// Batch-level report of received and pending documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistResult {
    pub total_files: usize,
    /// Labels in first-seen order, each at most once
    pub received: Vec<String>,
    pub pending: Vec<String>,
    pub unclassified_files: Vec<String>,
    pub unreadable_files: Vec<String>,
    pub files_detail: Vec<FileDetail>,
}
