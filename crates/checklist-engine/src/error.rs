use thiserror::Error;

/// Errors raised while loading the rule catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read rule catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse rule catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid rule '{key}': {reason}")]
    InvalidRule { key: String, reason: String },

    #[error("Duplicate rule key '{0}'")]
    DuplicateKey(String),

    #[error("Rule catalog is empty")]
    Empty,
}

/// Errors raised while folding outcomes into a checklist
#[derive(Error, Debug, PartialEq)]
pub enum ChecklistError {
    #[error("File '{filename}' matched label '{label}' which is not in the catalog")]
    UnknownLabel { filename: String, label: String },

    #[error("File '{0}' is marked unreadable but carries a label")]
    InconsistentOutcome(String),
}
