use std::path::{Path, PathBuf};

use lopdf::{Dictionary, Document, Object, Stream};
use pdf_workflow::{run_with, RunOptions};
use pretty_assertions::assert_eq;

fn write_test_pdf(dir: &Path, name: &str, num_pages: u32) -> PathBuf {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for page_num in 1..=num_pages {
        let content = format!("BT /F1 12 Tf 50 700 Td ({}-{}) Tj ET", name, page_num);
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
    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let path = dir.join(format!("{}.pdf", name));
    doc.save(&path).unwrap();
    path
}

fn options(dir: &Path, inputs: Vec<PathBuf>, script: Option<&str>) -> RunOptions {
    let script = script.map(|json| {
        let path = dir.join("steps.json");
        std::fs::write(&path, json).unwrap();
        path
    });
    RunOptions {
        inputs,
        script,
        out_dir: dir.join("out"),
        ..Default::default()
    }
}

#[test]
fn exports_every_input_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_test_pdf(dir.path(), "A", 2);
    let b = write_test_pdf(dir.path(), "B", 1);
    let mut accept = |_: &str, _: &str| true;

    let summary = run_with(&options(dir.path(), vec![a.clone(), b], None), &mut accept).unwrap();

    assert_eq!(summary.loaded, 2);
    assert_eq!(summary.exported.len(), 2);
    // Unmodified documents are written back byte for byte
    let exported = std::fs::read(dir.path().join("out/A.pdf")).unwrap();
    assert_eq!(exported, std::fs::read(&a).unwrap());
}

#[test]
fn script_combines_and_rotates() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_test_pdf(dir.path(), "A", 2);
    let b = write_test_pdf(dir.path(), "B", 1);
    let script = r#"[
        {"type": "combine", "documents": ["A", "B"]},
        {"type": "rotate", "document": "Combined PDF", "page": 3},
        {"type": "rename", "document": "Combined PDF", "name": "Bundle.pdf"}
    ]"#;
    let mut accept = |_: &str, _: &str| true;

    let summary = run_with(&options(dir.path(), vec![a, b], Some(script)), &mut accept).unwrap();

    assert_eq!(summary.notices.len(), 3);
    assert_eq!(summary.exported, vec![dir.path().join("out/Bundle.pdf")]);

    let doc = Document::load(dir.path().join("out/Bundle.pdf")).unwrap();
    let rotations: Vec<i64> = doc
        .get_pages()
        .values()
        .map(|&id| {
            doc.get_dictionary(id)
                .unwrap()
                .get(b"Rotate")
                .and_then(Object::as_i64)
                .unwrap_or(0)
        })
        .collect();
    assert_eq!(rotations, vec![0, 0, 90]);
}

#[test]
fn declined_delete_keeps_the_document() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_test_pdf(dir.path(), "A", 1);
    let script = r#"[{"type": "delete_document", "document": "A"}]"#;
    let mut decline = |_: &str, _: &str| false;

    let summary = run_with(&options(dir.path(), vec![a], Some(script)), &mut decline).unwrap();

    assert_eq!(summary.notices[0].message, "Delete cancelled");
    assert_eq!(summary.exported.len(), 1);
}

#[test]
fn bad_step_aborts_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_test_pdf(dir.path(), "A", 1);
    let script = r#"[{"type": "rotate_selected"}]"#;
    let mut accept = |_: &str, _: &str| true;

    let err = run_with(&options(dir.path(), vec![a], Some(script)), &mut accept).unwrap_err();

    assert!(format!("{:#}", err).contains("No pages selected for rotation"));
    assert!(!dir.path().join("out").exists());
}

#[test]
fn unreadable_inputs_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_test_pdf(dir.path(), "A", 1);
    let junk = dir.path().join("notes.txt");
    std::fs::write(&junk, b"hello").unwrap();
    let mut accept = |_: &str, _: &str| true;

    let summary = run_with(&options(dir.path(), vec![a, junk], None), &mut accept).unwrap();

    assert_eq!(summary.loaded, 1);
    assert_eq!(summary.failed, vec!["notes.txt".to_string()]);
}
