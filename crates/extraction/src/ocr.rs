//! Optical recognition backends
//!
//! Recognition engines are scarce: a caller acquires a session per image and
//! the session is released when it is dropped, on every exit path.

use std::path::PathBuf;
use std::process::Command;
use std::time::Instant;

use tempfile::TempDir;
use tracing::debug;

use crate::config::OcrConfig;
use crate::error::OcrError;

/// A recognition engine that hands out short-lived sessions
pub trait TextRecognizer: Send + Sync {
    /// Backend identifier
    fn name(&self) -> &'static str;

    /// Acquire a session; dropping it releases the engine instance
    fn acquire(&self) -> Result<Box<dyn RecognitionSession + '_>, OcrError>;
}

/// An acquired engine instance
pub trait RecognitionSession {
    /// Recognize text in an encoded image (PNG from the preprocessor)
    fn recognize(&mut self, image: &[u8]) -> Result<String, OcrError>;
}

/// Acquire, recognize, release
pub fn recognize_scoped(recognizer: &dyn TextRecognizer, image: &[u8]) -> Result<String, OcrError> {
    let mut session = recognizer.acquire()?;
    session.recognize(image)
}

/// Tesseract OCR via its command-line binary
pub struct TesseractRecognizer {
    binary: String,
    languages: String,
}

impl TesseractRecognizer {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            binary: config.tesseract_path.clone(),
            languages: config.language_arg(),
        }
    }

    /// Whether the configured binary can be executed
    pub fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

impl Default for TesseractRecognizer {
    fn default() -> Self {
        Self::new(&OcrConfig::default())
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn acquire(&self) -> Result<Box<dyn RecognitionSession + '_>, OcrError> {
        let workdir = TempDir::new()?;
        debug!("Acquired tesseract session in {}", workdir.path().display());
        Ok(Box::new(TesseractSession {
            recognizer: self,
            workdir,
            images: 0,
        }))
    }
}

/// Owns a scratch directory for the images it recognizes
struct TesseractSession<'a> {
    recognizer: &'a TesseractRecognizer,
    workdir: TempDir,
    images: usize,
}

impl TesseractSession<'_> {
    fn next_input_path(&mut self) -> PathBuf {
        self.images += 1;
        self.workdir.path().join(format!("input-{}.png", self.images))
    }
}

impl RecognitionSession for TesseractSession<'_> {
    fn recognize(&mut self, image: &[u8]) -> Result<String, OcrError> {
        let start = Instant::now();
        let input = self.next_input_path();
        std::fs::write(&input, image)?;

        let output = Command::new(&self.recognizer.binary)
            .arg(&input)
            .arg("stdout")
            .args(["-l", &self.recognizer.languages])
            .output();

        let text = match output {
            Ok(output) if output.status.success() => {
                String::from_utf8_lossy(&output.stdout).to_string()
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(OcrError::OcrFailed(format!("tesseract failed: {}", stderr)));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(OcrError::BackendNotAvailable(format!(
                    "{} not found (install tesseract-ocr)",
                    self.recognizer.binary
                )));
            }
            Err(e) => return Err(OcrError::Io(e)),
        };

        debug!(
            "tesseract recognized {} chars in {}ms",
            text.len(),
            start.elapsed().as_millis()
        );
        Ok(text)
    }
}

impl Drop for TesseractSession<'_> {
    fn drop(&mut self) {
        debug!(
            "Released tesseract session after {} image(s): {}",
            self.images,
            self.workdir.path().display()
        );
    }
}
