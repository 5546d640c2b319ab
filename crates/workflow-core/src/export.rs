//! Turning a document record back into PDF bytes and saving them
//!
//! Export never mutates the workspace. It picks the cheapest path that is
//! still faithful to the record:
//!
//! - `Original`: the retained bytes, untouched
//! - `Reconstruct`: pages copied out of their sources with rotation applied
//! - `Synthesize`: no retained bytes; each page comes from its own source,
//!   its raster or a blank page

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::assemble::PdfAssembler;
use crate::config::WorkflowConfig;
use crate::error::WorkflowError;
use crate::id::DocumentId;
use crate::model::{DocumentRecord, PageRecord, PdfSource};
use crate::workspace::Workspace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExportPlan {
    Original,
    Reconstruct,
    Synthesize,
}

/// Serialized document plus how it was produced
#[derive(Debug, Clone)]
pub struct RenderedPdf {
    pub bytes: Vec<u8>,
    pub plan: ExportPlan,
    /// Reconstruction failed and the original bytes were emitted instead
    pub fell_back: bool,
}

/// Persistence boundary (save dialog + file write)
pub trait SaveTarget {
    /// `Ok(None)` means the user cancelled
    fn prompt_save_location(&mut self, suggested_name: &str) -> Result<Option<PathBuf>, WorkflowError>;

    fn write_file(&mut self, path: &Path, bytes: &[u8]) -> Result<(), WorkflowError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Saved {
        path: PathBuf,
        size_bytes: usize,
        plan: ExportPlan,
    },
    Canceled,
}

/// True when the record no longer matches its original bytes page for page
pub fn has_been_modified(doc: &DocumentRecord) -> bool {
    if doc.original_page_count != Some(doc.pages.len()) {
        return true;
    }

    doc.pages.iter().enumerate().any(|(position, page)| {
        !page.rotation.is_none()
            || page.original_page_index != Some(position)
            || !same_source(page.source.as_ref(), doc.original_bytes.as_ref())
    })
}

fn same_source(page: Option<&PdfSource>, original: Option<&PdfSource>) -> bool {
    match (page, original) {
        (Some(page), Some(original)) => page.same_buffer(original),
        _ => false,
    }
}

pub fn plan_export(doc: &DocumentRecord) -> ExportPlan {
    match &doc.original_bytes {
        None => ExportPlan::Synthesize,
        Some(_) if has_been_modified(doc) => ExportPlan::Reconstruct,
        Some(_) => ExportPlan::Original,
    }
}

/// Produce the bytes `doc` should be saved as
pub fn render_document(
    doc: &DocumentRecord,
    config: &WorkflowConfig,
) -> Result<RenderedPdf, WorkflowError> {
    let plan = plan_export(doc);

    match (&doc.original_bytes, plan) {
        (Some(original), ExportPlan::Original) => Ok(RenderedPdf {
            bytes: original.bytes().to_vec(),
            plan,
            fell_back: false,
        }),
        (original, _) => match assemble_pages(&doc.pages, config) {
            Ok(bytes) => Ok(RenderedPdf {
                bytes,
                plan,
                fell_back: false,
            }),
            Err(e) => {
                let Some(original) = original else {
                    return Err(e);
                };
                tracing::warn!(
                    "Rebuilding {} failed, exporting original bytes: {}",
                    doc.name,
                    e
                );
                Ok(RenderedPdf {
                    bytes: original.bytes().to_vec(),
                    plan,
                    fell_back: true,
                })
            }
        },
    }
}

fn assemble_pages(pages: &[PageRecord], config: &WorkflowConfig) -> Result<Vec<u8>, WorkflowError> {
    let mut assembler = PdfAssembler::new();

    for page in pages {
        if let (Some(source), Some(index)) = (&page.source, page.original_page_index) {
            assembler.copy_source_page(source, index, page.rotation)?;
            continue;
        }

        let (width, height) = page_size(page, config);
        match &page.raster {
            Some(raster) => assembler.add_raster_page(raster, width, height, page.rotation)?,
            None => assembler.add_blank_page(width, height, page.rotation),
        }
    }

    if assembler.page_count() == 0 {
        return Err(WorkflowError::validation("Document has no pages to export"));
    }
    assembler.finish()
}

/// Size in points for pages built without a source
pub(crate) fn page_size(page: &PageRecord, config: &WorkflowConfig) -> (f32, f32) {
    if page.width > 0.0 && page.height > 0.0 {
        (page.width, page.height)
    } else {
        (config.default_page_width, config.default_page_height)
    }
}

/// File name offered in the save dialog
pub fn suggested_file_name(doc: &DocumentRecord) -> String {
    let name = doc.name.trim();
    let name = if name.is_empty() {
        format!("PDF_{}", doc.id)
    } else {
        name.to_string()
    };

    if name.to_ascii_lowercase().ends_with(".pdf") {
        name
    } else {
        format!("{}.pdf", name)
    }
}

/// Render `doc`, ask where to put it and write it
pub fn export_document(
    doc: &DocumentRecord,
    target: &mut dyn SaveTarget,
    config: &WorkflowConfig,
) -> Result<ExportOutcome, WorkflowError> {
    let rendered = render_document(doc, config)?;

    let Some(path) = target.prompt_save_location(&suggested_file_name(doc))? else {
        tracing::debug!("Export of {} cancelled", doc.name);
        return Ok(ExportOutcome::Canceled);
    };

    target.write_file(&path, &rendered.bytes)?;
    tracing::info!(
        "Exported {} to {} ({} bytes, {:?})",
        doc.name,
        path.display(),
        rendered.bytes.len(),
        rendered.plan
    );

    Ok(ExportOutcome::Saved {
        path,
        size_bytes: rendered.bytes.len(),
        plan: rendered.plan,
    })
}

/// Export every document in turn. One failure does not stop the rest.
pub fn export_all(
    docs: &[DocumentRecord],
    target: &mut dyn SaveTarget,
    config: &WorkflowConfig,
) -> Result<Vec<(DocumentId, Result<ExportOutcome, WorkflowError>)>, WorkflowError> {
    if docs.is_empty() {
        return Err(WorkflowError::validation("No PDFs to export"));
    }

    let mut results = Vec::with_capacity(docs.len());
    for doc in docs {
        let outcome = export_document(doc, &mut *target, config);
        if let Err(e) = &outcome {
            tracing::warn!("Export of {} failed: {}", doc.name, e);
        }
        results.push((doc.id.clone(), outcome));
    }
    Ok(results)
}

impl Workspace {
    /// Export one document. The record is cloned first so the export sees the
    /// document as it was when requested.
    pub fn export_document(
        &self,
        doc_id: &DocumentId,
        target: &mut dyn SaveTarget,
    ) -> Result<ExportOutcome, WorkflowError> {
        let doc = self
            .document(doc_id)
            .cloned()
            .ok_or_else(|| WorkflowError::DocumentNotFound(doc_id.clone()))?;
        export_document(&doc, target, &self.config)
    }

    /// Export every open document
    pub fn export_all(
        &self,
        target: &mut dyn SaveTarget,
    ) -> Result<Vec<(DocumentId, Result<ExportOutcome, WorkflowError>)>, WorkflowError> {
        let docs = self.documents().to_vec();
        export_all(&docs, target, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RasterFormat, RasterImage, Rotation};
    use crate::test_support::{create_test_pdf, create_test_png, page_ids, page_rotation, page_text};
    use lopdf::Document;


    /// Records every write, optionally cancelling the dialog
    #[derive(Default)]
    struct MemoryTarget {
        cancel: bool,
        written: Vec<(PathBuf, Vec<u8>)>,
    }

    impl SaveTarget for MemoryTarget {
        fn prompt_save_location(&mut self, suggested: &str) -> Result<Option<PathBuf>, WorkflowError> {
            if self.cancel {
                Ok(None)
            } else {
                Ok(Some(PathBuf::from("/out").join(suggested)))
            }
        }

        fn write_file(&mut self, path: &Path, bytes: &[u8]) -> Result<(), WorkflowError> {
            self.written.push((path.to_path_buf(), bytes.to_vec()));
            Ok(())
        }
    }

    fn pdf_doc(name: &str, pages: u32) -> DocumentRecord {
        let source = PdfSource::new(create_test_pdf(pages, name));
        let records = (0..pages as usize)
            .map(|i| PageRecord::from_source(source.clone(), i, 612.0, 792.0))
            .collect();
        let mut doc = DocumentRecord::with_pages(format!("{}.pdf", name), records);
        doc.original_bytes = Some(source);
        doc.original_page_count = Some(pages as usize);
        doc
    }

    fn texts(bytes: &[u8]) -> Vec<String> {
        let pdf = Document::load_mem(bytes).unwrap();
        page_ids(&pdf)
            .into_iter()
            .map(|id| page_text(&pdf, id))
            .collect()
    }

    #[test]
    fn test_unmodified_document_exports_original_bytes() {
        let doc = pdf_doc("A", 2);
        assert!(!has_been_modified(&doc));

        let rendered = render_document(&doc, &WorkflowConfig::default()).unwrap();

        assert_eq!(rendered.plan, ExportPlan::Original);
        assert_eq!(rendered.bytes, doc.original_bytes.unwrap().bytes());
    }

    #[test]
    fn test_modification_detection() {
        let mut rotated = pdf_doc("A", 2);
        rotated.pages[0].rotation = Rotation::from_degrees(90).unwrap();
        assert!(has_been_modified(&rotated));

        let mut reordered = pdf_doc("A", 2);
        reordered.pages.swap(0, 1);
        assert!(has_been_modified(&reordered));

        let mut shorter = pdf_doc("A", 2);
        shorter.pages.pop();
        assert!(has_been_modified(&shorter));

        // Same index, different source
        let mut foreign = pdf_doc("A", 1);
        let other = pdf_doc("B", 1);
        foreign.pages[0] = other.pages[0].clone();
        assert!(has_been_modified(&foreign));
    }

    #[test]
    fn test_reconstruct_applies_order_and_rotation() {
        let mut doc = pdf_doc("A", 3);
        doc.pages.swap(0, 2);
        doc.pages[0].rotation = Rotation::from_degrees(270).unwrap();
        doc.pages.remove(1);

        let rendered = render_document(&doc, &WorkflowConfig::default()).unwrap();

        assert_eq!(rendered.plan, ExportPlan::Reconstruct);
        assert!(!rendered.fell_back);
        let page_texts = texts(&rendered.bytes);
        assert_eq!(page_texts.len(), 2);
        assert!(page_texts[0].contains("A-Page-3"));
        assert!(page_texts[1].contains("A-Page-1"));

        let pdf = Document::load_mem(&rendered.bytes).unwrap();
        let ids = page_ids(&pdf);
        assert_eq!(page_rotation(&pdf, ids[0]), 270);
        assert_eq!(page_rotation(&pdf, ids[1]), 0);
    }

    #[test]
    fn test_reconstruct_pulls_pages_from_other_sources() {
        let mut doc = pdf_doc("A", 1);
        let other = pdf_doc("B", 2);
        doc.pages.push(other.pages[1].fresh_copy());

        let rendered = render_document(&doc, &WorkflowConfig::default()).unwrap();
        let page_texts = texts(&rendered.bytes);

        assert!(page_texts[0].contains("A-Page-1"));
        assert!(page_texts[1].contains("B-Page-2"));
    }

    #[test]
    fn test_synthesize_from_rasters_and_blanks() {
        let mut with_raster = PageRecord::blank(200.0, 100.0);
        with_raster.raster = Some(RasterImage::new(
            RasterFormat::Png,
            create_test_png(2, 1),
            2,
            1,
        ));
        let doc = DocumentRecord::with_pages(
            "scratch",
            vec![with_raster, PageRecord::blank(0.0, 0.0)],
        );

        let rendered = render_document(&doc, &WorkflowConfig::default()).unwrap();

        assert_eq!(rendered.plan, ExportPlan::Synthesize);
        let pdf = Document::load_mem(&rendered.bytes).unwrap();
        let ids = page_ids(&pdf);
        assert_eq!(ids.len(), 2);
        let blank = pdf.get_dictionary(ids[1]).unwrap();
        let media_box = blank.get(b"MediaBox").unwrap().as_array().unwrap();
        assert_eq!(media_box[2].as_float().unwrap(), 595.0);
    }

    #[test]
    fn test_broken_source_falls_back_to_original() {
        let mut doc = pdf_doc("A", 1);
        doc.pages[0].rotation = Rotation::from_degrees(90).unwrap();
        doc.pages[0].source = Some(PdfSource::new(b"%PDF-broken".to_vec()));

        let rendered = render_document(&doc, &WorkflowConfig::default()).unwrap();

        assert!(rendered.fell_back);
        assert_eq!(rendered.bytes, doc.original_bytes.unwrap().bytes());
    }

    #[test]
    fn test_empty_synthesized_document_is_error() {
        let doc = DocumentRecord::new("empty.pdf");
        assert!(render_document(&doc, &WorkflowConfig::default()).is_err());
    }

    #[test]
    fn test_suggested_file_name() {
        let mut doc = DocumentRecord::new("report");
        assert_eq!(suggested_file_name(&doc), "report.pdf");
        doc.name = "Scan.PDF".into();
        assert_eq!(suggested_file_name(&doc), "Scan.PDF");
        doc.name = "  ".into();
        assert_eq!(suggested_file_name(&doc), format!("PDF_{}.pdf", doc.id));
    }

    #[test]
    fn test_export_document_writes_to_target() {
        let doc = pdf_doc("A", 1);
        let mut target = MemoryTarget::default();

        let outcome = export_document(&doc, &mut target, &WorkflowConfig::default()).unwrap();

        assert_eq!(
            outcome,
            ExportOutcome::Saved {
                path: PathBuf::from("/out/A.pdf"),
                size_bytes: doc.original_bytes.as_ref().unwrap().bytes().len(),
                plan: ExportPlan::Original,
            }
        );
        assert_eq!(target.written.len(), 1);
    }

    #[test]
    fn test_cancelled_export_is_not_an_error() {
        let doc = pdf_doc("A", 1);
        let mut target = MemoryTarget {
            cancel: true,
            ..Default::default()
        };

        let outcome = export_document(&doc, &mut target, &WorkflowConfig::default()).unwrap();

        assert_eq!(outcome, ExportOutcome::Canceled);
        assert!(target.written.is_empty());
    }

    #[test]
    fn test_export_all() {
        let mut target = MemoryTarget::default();
        let err = export_all(&[], &mut target, &WorkflowConfig::default()).unwrap_err();
        assert_eq!(err.to_string(), "No PDFs to export");

        let docs = vec![pdf_doc("A", 1), DocumentRecord::new("empty.pdf")];
        let results = export_all(&docs, &mut target, &WorkflowConfig::default()).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].1.is_ok());
        assert!(results[1].1.is_err());
        assert_eq!(target.written.len(), 1);
    }

    #[test]
    fn test_workspace_export_leaves_state_alone() {
        let doc = pdf_doc("A", 2);
        let id = doc.id.clone();
        let ws = Workspace::with_documents(WorkflowConfig::default(), vec![doc]);
        let before = ws.state().clone();
        let mut target = MemoryTarget::default();

        ws.export_document(&id, &mut target).unwrap();
        let missing = ws.export_document(&DocumentId::from("nope"), &mut target);

        assert!(matches!(missing, Err(WorkflowError::DocumentNotFound(_))));
        assert_eq!(ws.state(), &before);
        assert!(!ws.can_undo());
    }
}
