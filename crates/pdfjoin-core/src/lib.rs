//! PDF assembly for intake batches
//!
//! Converts images to single-page PDFs and merges PDFs with lopdf:
//! - [`image_to_page`]: one image, one page sized to the image
//! - [`merge_documents`]: pages of every input, in input order
//! - [`convert_and_merge`]: both, over a mixed batch

pub mod convert;
pub mod error;
pub mod image_page;
pub mod merge;

pub use convert::{convert_and_merge, to_pdf_bytes};
pub use error::PdfJoinError;
pub use image_page::{image_to_page, AssemblyOptions};
pub use merge::merge_documents;

/// Parse PDF bytes and return page count
pub fn get_page_count(bytes: &[u8]) -> Result<u32, PdfJoinError> {
    let doc =
        lopdf::Document::load_mem(bytes).map_err(|e| PdfJoinError::ParseError(e.to_string()))?;
    Ok(doc.get_pages().len() as u32)
}
