use thiserror::Error;

/// Errors raised by an OCR backend
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while extracting text from a single file
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Failed to decode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Failed to parse PDF: {0}")]
    PdfParse(String),

    #[error(transparent)]
    Ocr(#[from] OcrError),
}
