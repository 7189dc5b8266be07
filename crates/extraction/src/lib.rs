//! Per-file text extraction
//!
//! Images go through preprocessing and a scoped OCR session; PDFs are read
//! from their embedded text layer. [`ExtractionRouter::extract_or_empty`] is
//! the entry point the pipeline uses.

pub mod config;
pub mod error;
pub mod ocr;
pub mod pdf_text;
pub mod preprocess;
pub mod router;

pub use config::OcrConfig;
pub use error::{ExtractionError, OcrError};
pub use ocr::{recognize_scoped, RecognitionSession, TesseractRecognizer, TextRecognizer};
pub use pdf_text::extract_text_layer;
pub use preprocess::{preprocess_for_ocr, preprocess_image};
pub use router::ExtractionRouter;
