//! Extraction router - picks the text source for each file by category
//!
//! ## Routing
//!
//! - Image → preprocess → acquire OCR session → recognize → release
//! - Pdf → embedded text layer (empty for scanned PDFs)
//! - Other → empty, nothing is attempted

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use checklist_engine::normalizer::{normalize_for_matching, normalize_text, preview};
use shared_types::{FileExtraction, IntakeFile, MimeCategory};
use tracing::{debug, info, warn};

use crate::config::OcrConfig;
use crate::error::ExtractionError;
use crate::ocr::{recognize_scoped, TesseractRecognizer, TextRecognizer};
use crate::pdf_text::extract_text_layer;
use crate::preprocess::preprocess_for_ocr;

/// Characters of raw and normalized text shown in debug previews
pub const PREVIEW_CHARS: usize = 500;

/// Main extraction router
#[derive(Clone)]
pub struct ExtractionRouter {
    config: OcrConfig,
    recognizer: Arc<dyn TextRecognizer>,
}

impl ExtractionRouter {
    pub fn new(config: OcrConfig, recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self { config, recognizer }
    }

    /// Router backed by the tesseract binary named in `config`
    pub fn with_tesseract(config: OcrConfig) -> Self {
        let recognizer = Arc::new(TesseractRecognizer::new(&config));
        Self::new(config, recognizer)
    }

    pub fn config(&self) -> &OcrConfig {
        &self.config
    }

    pub fn recognizer_name(&self) -> &'static str {
        self.recognizer.name()
    }

    /// Extract raw text, surfacing failures
    pub fn try_extract(&self, category: MimeCategory, bytes: &[u8]) -> Result<String, ExtractionError> {
        match category {
            MimeCategory::Image => {
                let prepared = preprocess_for_ocr(bytes, &self.config)?;
                Ok(recognize_scoped(self.recognizer.as_ref(), &prepared)?)
            }
            MimeCategory::Pdf => extract_text_layer(bytes),
            MimeCategory::Other => Ok(String::new()),
        }
    }

    /// Recovery policy for extraction: any failure or panic yields empty text
    ///
    /// Empty text is what the classifier reads as unreadable, so one bad file
    /// never stops the rest of the batch.
    pub fn extract_or_empty(&self, file: &IntakeFile) -> FileExtraction {
        let start = Instant::now();
        info!(
            "Extracting '{}' ({}, {} bytes)",
            file.filename,
            file.category.as_str(),
            file.bytes.len()
        );

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.try_extract(file.category, &file.bytes)
        }));

        let raw_text = match result {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!("Extraction failed for '{}', treating as empty: {}", file.filename, e);
                String::new()
            }
            Err(_) => {
                warn!("Extraction panicked for '{}', treating as empty", file.filename);
                String::new()
            }
        };

        let elapsed = start.elapsed().as_millis() as u64;
        let (text_preview, matching_preview) = text_previews(&raw_text);
        debug!(
            "'{}' text ({} chars, {}ms): {}",
            file.filename,
            raw_text.chars().count(),
            elapsed,
            text_preview
        );
        debug!("'{}' as matched: {}", file.filename, matching_preview);

        FileExtraction::new(file.filename.clone(), file.category, raw_text).with_time(elapsed)
    }
}

/// Log previews: readable normalized text, and the form the classifier sees
fn text_previews(raw_text: &str) -> (String, String) {
    (
        preview(&normalize_text(raw_text), PREVIEW_CHARS),
        preview(&normalize_for_matching(raw_text), PREVIEW_CHARS),
    )
}

impl std::fmt::Debug for ExtractionRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionRouter")
            .field("config", &self.config)
            .field("recognizer", &self.recognizer.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OcrError;
    use crate::ocr::testing::FakeRecognizer;
    use crate::ocr::RecognitionSession;
    use crate::pdf_text::testing::pdf_with_pages;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use pretty_assertions::assert_eq;
    use shared_types::ExtractionMethod;
    use std::io::Cursor;
    use std::sync::atomic::Ordering;

    fn png() -> Vec<u8> {
        let img = RgbImage::from_pixel(120, 80, Rgb([230, 230, 230]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn small_config() -> OcrConfig {
        OcrConfig {
            working_width: 200,
            ..OcrConfig::default()
        }
    }

    fn router(fake: FakeRecognizer) -> (ExtractionRouter, Arc<FakeRecognizer>) {
        let fake = Arc::new(fake);
        (ExtractionRouter::new(small_config(), fake.clone()), fake)
    }

    #[test]
    fn test_image_goes_through_ocr_with_preprocessed_bytes() {
        let (router, fake) = router(FakeRecognizer::returning("CONTRACHEQUE"));
        let file = IntakeFile::new("payslip.png", MimeCategory::Image, png());

        let extraction = router.extract_or_empty(&file);

        assert_eq!(extraction.raw_text, "CONTRACHEQUE");
        assert_eq!(extraction.method, ExtractionMethod::Ocr);
        let images = fake.counters.images.lock().unwrap();
        assert_eq!(images.len(), 1);
        let seen = image::load_from_memory(&images[0]).unwrap();
        assert_eq!(seen.width(), 200);
        assert_eq!(fake.counters.released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_pdf_uses_text_layer_not_ocr() {
        let (router, fake) = router(FakeRecognizer::returning("should not be used"));
        let file = IntakeFile::new(
            "cert.pdf",
            MimeCategory::Pdf,
            pdf_with_pages(&["CERTIDAO DE NASCIMENTO"]),
        );

        let extraction = router.extract_or_empty(&file);

        assert!(extraction.raw_text.contains("CERTIDAO DE NASCIMENTO"));
        assert_eq!(extraction.method, ExtractionMethod::TextLayer);
        assert_eq!(fake.counters.acquired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_other_category_is_empty() {
        let (router, fake) = router(FakeRecognizer::returning("x"));
        let file = IntakeFile::new("notes.txt", MimeCategory::Other, b"CONTRACHEQUE".to_vec());
        let extraction = router.extract_or_empty(&file);
        assert_eq!(extraction.raw_text, "");
        assert_eq!(extraction.method, ExtractionMethod::Skipped);
        assert_eq!(fake.counters.acquired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_corrupt_inputs_degrade_to_empty() {
        let (router, _) = router(FakeRecognizer::returning("x"));

        let bad_image = IntakeFile::new("id.png", MimeCategory::Image, b"garbage".to_vec());
        assert_eq!(router.extract_or_empty(&bad_image).raw_text, "");
        assert!(router.try_extract(MimeCategory::Image, b"garbage").is_err());

        let bad_pdf = IntakeFile::new("scan.pdf", MimeCategory::Pdf, b"%PDF-1.4 broken".to_vec());
        assert_eq!(router.extract_or_empty(&bad_pdf).raw_text, "");
    }

    #[test]
    fn test_recognition_failure_releases_and_degrades() {
        let (router, fake) = router(FakeRecognizer::failing("engine crashed"));
        let file = IntakeFile::new("id.png", MimeCategory::Image, png());

        assert_eq!(router.extract_or_empty(&file).raw_text, "");
        assert_eq!(fake.counters.acquired.load(Ordering::SeqCst), 1);
        assert_eq!(fake.counters.released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_previews_keep_punctuation_only_in_readable_form() {
        let (text, matched) = text_previews("Salário:\n R$ 1.234,56");
        assert_eq!(text, "SALARIO: R$ 1.234,56");
        assert_eq!(matched, "SALARIO R 1 234 56");

        let long = "a".repeat(PREVIEW_CHARS + 10);
        let (text, _) = text_previews(&long);
        assert_eq!(text.chars().count(), PREVIEW_CHARS + 3);
    }

    struct PanickingRecognizer;

    impl TextRecognizer for PanickingRecognizer {
        fn name(&self) -> &'static str {
            "panicking"
        }

        fn acquire(&self) -> Result<Box<dyn RecognitionSession + '_>, OcrError> {
            panic!("engine exploded");
        }
    }

    #[test]
    fn test_recognizer_panic_degrades_to_empty() {
        let router = ExtractionRouter::new(small_config(), Arc::new(PanickingRecognizer));
        let file = IntakeFile::new("id.png", MimeCategory::Image, png());
        assert_eq!(router.extract_or_empty(&file).raw_text, "");
    }
}
