//! Shared fixtures for integration tests

#![allow(dead_code)]

use lopdf::{Dictionary, Document, Object, Stream};
use workflow_core::ingest::{load_source, SourceFile};
use workflow_core::{DocumentRecord, PageRecord};

/// US Letter PDF whose pages read `"<prefix>-Page-<n>"`
pub fn create_test_pdf(num_pages: u32, prefix: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for page_num in 1..=num_pages {
        let content = format!("BT /F1 12 Tf 50 700 Td ({}-Page-{}) Tj ET", prefix, page_num);
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));
        let page = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("Contents", Object::Reference(content_id)),
            (
                "MediaBox",
                Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()]),
            ),
        ]);
        kids.push(Object::Reference(doc.add_object(page)));
    }

    let pages = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer(num_pages as i64)),
        ("Kids", Object::Array(kids)),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]);
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// Ingested document named `<prefix>.pdf`
pub fn pdf_document(prefix: &str, num_pages: u32) -> DocumentRecord {
    let file = SourceFile::new(format!("{}.pdf", prefix), create_test_pdf(num_pages, prefix));
    load_source(file, None).unwrap()
}

/// Document of blank pages with no source bytes
pub fn blank_document(name: &str, num_pages: usize) -> DocumentRecord {
    DocumentRecord::with_pages(
        name,
        (0..num_pages)
            .map(|_| PageRecord::blank(595.0, 842.0))
            .collect(),
    )
}

/// Text of every page of a serialized PDF, in order
pub fn page_texts(bytes: &[u8]) -> Vec<String> {
    let doc = Document::load_mem(bytes).unwrap();
    doc.get_pages()
        .values()
        .map(|&page_id| {
            let content = doc.get_page_content(page_id).unwrap();
            String::from_utf8_lossy(&content).into_owned()
        })
        .collect()
}

/// `/Rotate` of every page of a serialized PDF
pub fn page_rotations(bytes: &[u8]) -> Vec<i64> {
    let doc = Document::load_mem(bytes).unwrap();
    doc.get_pages()
        .values()
        .map(|&page_id| {
            doc.get_dictionary(page_id)
                .unwrap()
                .get(b"Rotate")
                .and_then(Object::as_i64)
                .unwrap_or(0)
        })
        .collect()
}
