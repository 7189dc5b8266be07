//! PDF Merge algorithm
//!
//! Copies every page of every input, in input order, into a fresh document.

use crate::error::PdfJoinError;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::BTreeMap;
use tracing::debug;

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE_ATTRIBUTES: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Guard against cyclic `Parent` chains in damaged files
const MAX_TREE_DEPTH: usize = 64;

/// Merge multiple PDFs into one
///
/// The algorithm:
/// 1. If empty, return error
/// 2. Create a new destination document with an empty page tree
/// 3. For each source document, in the given order:
///    a. Copy inherited page attributes onto each page
///    b. Import all objects with IDs offset past the destination's
///    c. Re-parent its pages, in their own order, under the destination tree
/// 4. Drop unreachable objects (old catalogs and page trees), compress, save
pub fn merge_documents(documents: Vec<Vec<u8>>) -> Result<Vec<u8>, PdfJoinError> {
    if documents.is_empty() {
        return Err(PdfJoinError::NoDocuments);
    }

    let mut dest = Document::with_version("1.5");
    let pages_id = dest.new_object_id();
    let mut dest_page_refs: Vec<ObjectId> = Vec::new();

    for (i, doc_bytes) in documents.iter().enumerate() {
        let mut source = Document::load_mem(doc_bytes).map_err(|e| {
            PdfJoinError::ParseError(format!("Failed to load document {}: {}", i, e))
        })?;

        // get_pages is keyed by page number, so values come out in page order
        let source_pages: Vec<ObjectId> = source.get_pages().into_values().collect();
        for &page_id in &source_pages {
            materialise_inherited_attributes(&mut source, page_id);
        }

        // Calculate offset for object IDs to avoid conflicts
        let id_offset = dest.max_id;

        let mut remapped_objects = BTreeMap::new();
        for (old_id, object) in std::mem::take(&mut source.objects) {
            let new_id = (old_id.0 + id_offset, old_id.1);
            remapped_objects.insert(new_id, remap_object_refs(object, id_offset));
        }
        dest.objects.extend(remapped_objects);

        for old_page_ref in source_pages {
            let new_page_ref = (old_page_ref.0 + id_offset, old_page_ref.1);
            if let Some(Object::Dictionary(page)) = dest.objects.get_mut(&new_page_ref) {
                page.set("Parent", Object::Reference(pages_id));
            }
            dest_page_refs.push(new_page_ref);
        }

        dest.max_id = (source.max_id + id_offset).max(dest.max_id);
        debug!(
            "Merged document {} ({} pages total so far)",
            i,
            dest_page_refs.len()
        );
    }

    install_page_tree(&mut dest, pages_id, dest_page_refs);

    dest.prune_objects();
    dest.renumber_objects();
    dest.compress();

    let mut buffer = Vec::new();
    dest.save_to(&mut buffer)
        .map_err(|e| PdfJoinError::OperationError(format!("Failed to save merged PDF: {}", e)))?;

    Ok(buffer)
}

/// Copy attributes inherited through `Parent` onto the page itself
fn materialise_inherited_attributes(doc: &mut Document, page_id: ObjectId) {
    let mut inherited: Vec<(&[u8], Object)> = Vec::new();

    if let Ok(page) = doc.get_dictionary(page_id) {
        for key in INHERITABLE_ATTRIBUTES {
            if page.has(key) {
                continue;
            }
            if let Some(value) = find_inherited(doc, page, key) {
                inherited.push((key, value));
            }
        }
    }

    if inherited.is_empty() {
        return;
    }
    if let Ok(Object::Dictionary(page)) = doc.get_object_mut(page_id) {
        for (key, value) in inherited {
            page.set(key.to_vec(), value);
        }
    }
}

fn find_inherited(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    for _ in 0..MAX_TREE_DEPTH {
        let node = doc.get_dictionary(parent?).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}

/// Recursively remap object references in an object
fn remap_object_refs(obj: Object, offset: u32) -> Object {
    match obj {
        Object::Reference(id) => Object::Reference((id.0 + offset, id.1)),
        Object::Array(arr) => Object::Array(
            arr.into_iter()
                .map(|o| remap_object_refs(o, offset))
                .collect(),
        ),
        Object::Dictionary(mut dict) => {
            remap_dict(&mut dict, offset);
            Object::Dictionary(dict)
        }
        Object::Stream(mut stream) => {
            remap_dict(&mut stream.dict, offset);
            Object::Stream(stream)
        }
        other => other,
    }
}

fn remap_dict(dict: &mut Dictionary, offset: u32) {
    for (_, value) in dict.iter_mut() {
        let inner = std::mem::replace(value, Object::Null);
        *value = remap_object_refs(inner, offset);
    }
}

/// Point a fresh catalog at a flat page tree holding `page_refs`
fn install_page_tree(doc: &mut Document, pages_id: ObjectId, page_refs: Vec<ObjectId>) {
    let mut pages_dict = Dictionary::new();
    pages_dict.set("Type", Object::Name(b"Pages".to_vec()));
    pages_dict.set("Count", Object::Integer(page_refs.len() as i64));
    pages_dict.set(
        "Kids",
        Object::Array(page_refs.into_iter().map(Object::Reference).collect()),
    );
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(catalog);

    doc.trailer = Dictionary::new();
    doc.trailer.set("Root", Object::Reference(catalog_id));
}

#[cfg(test)]
pub(crate) mod testing {
    use lopdf::{Dictionary, Document, Object};

    /// PDF with N pages whose content streams name `{prefix}-Page-{n}`
    ///
    /// With `inherit_media_box` the MediaBox sits on the Pages node only.
    pub fn create_test_pdf(num_pages: u32, content_prefix: &str, inherit_media_box: bool) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");

        let pages_id = doc.new_object_id();
        let catalog_id = doc.new_object_id();

        let media_box = Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(612),
            Object::Integer(792),
        ]);

        let mut page_ids = Vec::new();
        for page_num in 0..num_pages {
            let page_id = doc.new_object_id();
            let content_id = doc.new_object_id();

            let content = format!(
                "BT /F1 12 Tf 50 700 Td ({}-Page-{}) Tj ET",
                content_prefix,
                page_num + 1
            );
            doc.objects.insert(
                content_id,
                Object::Stream(lopdf::Stream::new(Dictionary::new(), content.into_bytes())),
            );

            let mut page_dict = Dictionary::new();
            page_dict.set("Type", Object::Name(b"Page".to_vec()));
            page_dict.set("Parent", Object::Reference(pages_id));
            page_dict.set("Contents", Object::Reference(content_id));
            if !inherit_media_box {
                page_dict.set("MediaBox", media_box.clone());
            }

            doc.objects.insert(page_id, Object::Dictionary(page_dict));
            page_ids.push(Object::Reference(page_id));
        }

        let mut pages_dict = Dictionary::new();
        pages_dict.set("Type", Object::Name(b"Pages".to_vec()));
        pages_dict.set("Count", Object::Integer(num_pages as i64));
        pages_dict.set("Kids", Object::Array(page_ids));
        if inherit_media_box {
            pages_dict.set("MediaBox", media_box);
        }
        doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

        let mut catalog_dict = Dictionary::new();
        catalog_dict.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog_dict.set("Pages", Object::Reference(pages_id));
        doc.objects
            .insert(catalog_id, Object::Dictionary(catalog_dict));

        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    /// Decoded content of every page, in page order
    pub fn page_contents(pdf: &[u8]) -> Vec<String> {
        let doc = Document::load_mem(pdf).unwrap();
        doc.get_pages()
            .values()
            .map(|&id| String::from_utf8_lossy(&doc.get_page_content(id).unwrap()).to_string())
            .collect()
    }
}
