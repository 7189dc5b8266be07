//! Mixed batch assembly: images become pages, PDFs pass through, then merge

use lopdf::Document;
use shared_types::{IntakeFile, MimeCategory};
use tracing::{info, warn};

use crate::error::PdfJoinError;
use crate::image_page::{image_to_page, AssemblyOptions};
use crate::merge::merge_documents;

/// Turn one file into PDF bytes, or `None` for files assembly ignores
///
/// PDFs pass through unchanged once they parse; a PDF that does not parse
/// fails here, under its own filename, rather than later inside the merge.
pub fn to_pdf_bytes(
    file: &IntakeFile,
    options: &AssemblyOptions,
) -> Result<Option<Vec<u8>>, PdfJoinError> {
    match file.category {
        MimeCategory::Pdf => {
            Document::load_mem(&file.bytes)
                .map_err(|e| PdfJoinError::ParseError(e.to_string()).for_file(&file.filename))?;
            Ok(Some(file.bytes.clone()))
        }
        MimeCategory::Image => image_to_page(&file.bytes, options)
            .map(Some)
            .map_err(|e| e.for_file(&file.filename)),
        MimeCategory::Other => {
            warn!("Skipping '{}' in assembly: not a PDF or image", file.filename);
            Ok(None)
        }
    }
}

/// Convert every image to a page and merge everything in input order
///
/// An undecodable image aborts the whole batch with
/// [`PdfJoinError::InvalidImage`] naming the file.
pub fn convert_and_merge(
    files: &[IntakeFile],
    options: &AssemblyOptions,
) -> Result<Vec<u8>, PdfJoinError> {
    let mut documents = Vec::with_capacity(files.len());
    for file in files {
        if let Some(pdf) = to_pdf_bytes(file, options)? {
            documents.push(pdf);
        }
    }

    info!(
        "Assembling {} document(s) from {} file(s)",
        documents.len(),
        files.len()
    );
    merge_documents(documents)
}
