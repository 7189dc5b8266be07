//! OCR and preprocessing settings

use serde::{Deserialize, Serialize};

/// Settings for the recognition path of the extraction router
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Path or name of the tesseract binary
    pub tesseract_path: String,
    /// Tesseract language packs, joined with `+`
    pub languages: Vec<String>,
    /// Width every image is resized to before recognition
    pub working_width: u32,
    /// Gray level at or above which a pixel becomes white
    pub binarize_threshold: u8,
    /// Gaussian sigma of the unsharp mask
    pub sharpen_sigma: f32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract_path: "tesseract".to_string(),
            // Portuguese for the documents, English helps with digits and symbols
            languages: vec!["por".to_string(), "eng".to_string()],
            working_width: 2000,
            binarize_threshold: 150,
            sharpen_sigma: 1.0,
        }
    }
}

impl OcrConfig {
    /// Language argument in tesseract's `-l` syntax
    pub fn language_arg(&self) -> String {
        if self.languages.is_empty() {
            "eng".to_string()
        } else {
            self.languages.join("+")
        }
    }
}
