//! TOML configuration for the intake pipeline
//!
//! Every section and field is optional; an empty document yields the
//! defaults below.
//!
//! ```toml
//! [ocr]
//! tesseract_path = "/usr/bin/tesseract"
//! languages = ["por", "eng"]
//! working_width = 2000
//! binarize_threshold = 150
//! sharpen_sigma = 1.0
//!
//! [assembly]
//! max_dimension = 2000
//! jpeg_quality = 80
//!
//! [rules]
//! path = "config/document-rules.json"
//! ```

use anyhow::Context;
use checklist_engine::RuleCatalog;
use extraction::OcrConfig;
use pdfjoin_core::AssemblyOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Main configuration structure loaded from TOML files
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    /// Recognition and preprocessing settings
    pub ocr: OcrConfig,
    /// Image page sizing and compression
    pub assembly: AssemblyOptions,
    /// Where the rule catalog comes from
    pub rules: RulesConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// JSON catalog on disk; the built-in catalog when absent
    pub path: Option<PathBuf>,
}

impl IntakeConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        toml::from_str(s).context("Failed to parse TOML configuration")
    }

    /// Load the rule catalog this configuration points at
    pub fn load_catalog(&self) -> anyhow::Result<RuleCatalog> {
        match &self.rules.path {
            Some(path) => {
                let catalog = RuleCatalog::from_file(path)
                    .with_context(|| format!("Failed to load rules from {}", path.display()))?;
                info!("Loaded {} rules from {}", catalog.len(), path.display());
                Ok(catalog)
            }
            None => {
                let catalog = RuleCatalog::builtin().context("Built-in rule catalog is invalid")?;
                info!("Loaded {} built-in rules", catalog.len());
                Ok(catalog)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_empty_config_is_default() {
        let config = IntakeConfig::from_str("").unwrap();
        assert_eq!(config, IntakeConfig::default());
        assert_eq!(config.ocr.working_width, 2000);
        assert_eq!(config.ocr.binarize_threshold, 150);
        assert_eq!(config.assembly.max_dimension, 2000);
        assert_eq!(config.assembly.jpeg_quality, 80);
        assert_eq!(config.rules.path, None);
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = IntakeConfig::from_str(
            r#"
            [ocr]
            languages = ["por"]

            [assembly]
            jpeg_quality = 70
            "#,
        )
        .unwrap();
        assert_eq!(config.ocr.language_arg(), "por");
        assert_eq!(config.ocr.tesseract_path, "tesseract");
        assert_eq!(config.assembly.jpeg_quality, 70);
        assert_eq!(config.assembly.max_dimension, 2000);
    }

    #[test]
    fn test_malformed_toml_is_an_error() {
        let err = IntakeConfig::from_str("[ocr\nworking_width = ").unwrap_err();
        assert!(err.to_string().contains("Failed to parse TOML"));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = IntakeConfig::from_file("/nonexistent/intake.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/intake.toml"));
    }

    #[test]
    fn test_catalog_from_configured_path() {
        let mut rules = tempfile::NamedTempFile::new().unwrap();
        write!(
            rules,
            r#"{{"rg": {{"label": "RG", "keywords": ["REGISTRO GERAL"], "minMatches": 1}}}}"#
        )
        .unwrap();

        let config = IntakeConfig {
            rules: RulesConfig {
                path: Some(rules.path().to_path_buf()),
            },
            ..IntakeConfig::default()
        };
        let catalog = config.load_catalog().unwrap();
        assert_eq!(catalog.labels(), vec!["RG"]);
    }

    #[test]
    fn test_builtin_catalog_when_no_path() {
        let catalog = IntakeConfig::default().load_catalog().unwrap();
        assert!(catalog.contains_label("Contracheque"));
    }
}
