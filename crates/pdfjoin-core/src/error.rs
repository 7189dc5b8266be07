use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfJoinError {
    #[error("Failed to parse PDF: {0}")]
    ParseError(String),

    #[error("No documents to assemble")]
    NoDocuments,

    /// Decode failure before a filename is known; see [`PdfJoinError::for_file`]
    #[error("Failed to decode image: {0}")]
    ImageDecode(String),

    #[error("Invalid image '{filename}': {reason}")]
    InvalidImage { filename: String, reason: String },

    #[error("Image encoding failed: {0}")]
    ImageEncode(String),

    #[error("PDF operation failed: {0}")]
    OperationError(String),
}

impl PdfJoinError {
    /// Attach the offending filename to an image decode failure
    pub fn for_file(self, filename: &str) -> Self {
        match self {
            PdfJoinError::ImageDecode(reason) => PdfJoinError::InvalidImage {
                filename: filename.to_string(),
                reason,
            },
            PdfJoinError::ParseError(reason) => {
                PdfJoinError::ParseError(format!("{}: {}", filename, reason))
            }
            other => other,
        }
    }
}
