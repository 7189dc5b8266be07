//! Embedded PDF text layer, read with pdf-extract

use std::panic::{self, AssertUnwindSafe};

use crate::error::ExtractionError;

/// Extract the embedded text layer of a PDF, trimmed
///
/// Scanned PDFs without a text layer yield an empty string, not an error.
pub fn extract_text_layer(data: &[u8]) -> Result<String, ExtractionError> {
    if data.len() < 5 || &data[0..5] != b"%PDF-" {
        return Err(ExtractionError::PdfParse("missing %PDF header".to_string()));
    }

    // pdf-extract panics on some malformed font tables
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem(data)
    }))
    .map_err(|_| ExtractionError::PdfParse("text extraction panicked".to_string()))?;

    let text = result.map_err(|e| ExtractionError::PdfParse(e.to_string()))?;
    Ok(text.trim().to_string())
}
