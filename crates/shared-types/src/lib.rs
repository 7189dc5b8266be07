pub mod types;

pub use types::{
    ChecklistResult, ClassificationOutcome, ExtractionMethod, FileDetail, FileExtraction,
    IntakeFile, MatchSource, MimeCategory,
};
