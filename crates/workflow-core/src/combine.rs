//! Combining whole documents into one
//!
//! Every page is carried over by the best means it has: a lossless copy from
//! its own source PDF, else its cached raster, else (for pages that never had
//! content) a blank page of the recorded size. If any page cannot be carried
//! the combine is abandoned, so no source document ever loses pages. The
//! combined PDF is assembled completely before the workspace is touched.

use crate::assemble::PdfAssembler;
use crate::config::WorkflowConfig;
use crate::error::WorkflowError;
use crate::export::page_size;
use crate::id::DocumentId;
use crate::model::{DocumentRecord, PageRecord, PdfSource, Rotation};
use crate::validation::is_valid_pdf;
use crate::workspace::Workspace;

/// Validity of each distinct source buffer, checked once
#[derive(Default)]
struct SourceCheck {
    seen: Vec<(PdfSource, bool)>,
}

impl SourceCheck {
    fn usable(&mut self, source: &PdfSource) -> bool {
        if let Some((_, ok)) = self.seen.iter().find(|(s, _)| s.same_buffer(source)) {
            return *ok;
        }
        let ok = is_valid_pdf(source.bytes());
        self.seen.push((source.clone(), ok));
        ok
    }
}

/// Append one page with its rotation left on the record
fn append_page(
    assembler: &mut PdfAssembler,
    sources: &mut SourceCheck,
    page: &PageRecord,
    config: &WorkflowConfig,
) -> Result<(), WorkflowError> {
    let mut failure = None;

    if let (Some(source), Some(index)) = (&page.source, page.original_page_index) {
        if sources.usable(source) {
            match assembler.copy_source_page(source, index, Rotation::NONE) {
                Ok(()) => return Ok(()),
                Err(e) => failure = Some(e),
            }
        } else {
            failure = Some(WorkflowError::ParseError(
                "source bytes are not a usable PDF".into(),
            ));
        }
    }

    let (width, height) = page_size(page, config);
    if let Some(raster) = &page.raster {
        if let Some(e) = &failure {
            tracing::warn!(
                "Page {} falls back to its raster: {}",
                page.page_number,
                e
            );
        }
        return assembler.add_raster_page(raster, width, height, Rotation::NONE);
    }

    match failure {
        Some(e) => Err(e),
        None => {
            assembler.add_blank_page(width, height, Rotation::NONE);
            Ok(())
        }
    }
}

fn append_document(
    assembler: &mut PdfAssembler,
    sources: &mut SourceCheck,
    doc: &DocumentRecord,
    config: &WorkflowConfig,
) -> Result<(), WorkflowError> {
    for page in &doc.pages {
        append_page(assembler, sources, page, config).map_err(|e| {
            WorkflowError::CombineFailed(format!(
                "page {} of {} could not be carried over ({})",
                page.page_number, doc.name, e
            ))
        })?;
    }
    Ok(())
}

impl Workspace {
    /// Merge the given documents, in order, into a single new document that
    /// replaces them
    pub fn combine(&mut self, doc_ids: &[DocumentId]) -> Result<DocumentId, WorkflowError> {
        let mut ids: Vec<&DocumentId> = Vec::new();
        for id in doc_ids {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        if ids.len() < 2 {
            return Err(WorkflowError::validation(
                "Please select at least 2 PDFs to combine",
            ));
        }

        let mut docs = Vec::with_capacity(ids.len());
        for id in &ids {
            let doc = self
                .state
                .document(id)
                .ok_or_else(|| WorkflowError::DocumentNotFound((*id).clone()))?;
            docs.push(doc);
        }

        let combined_pages: Vec<&PageRecord> =
            docs.iter().copied().flat_map(|d| d.pages.iter()).collect();
        if combined_pages.is_empty() {
            return Err(WorkflowError::CombineFailed(
                "the selected documents have no pages".into(),
            ));
        }

        let mut assembler = PdfAssembler::new();
        let mut sources = SourceCheck::default();
        for doc in &docs {
            append_document(&mut assembler, &mut sources, doc, &self.config)?;
        }

        let bytes = assembler.finish()?;
        let source = PdfSource::new(bytes);
        let name = self.state.unique_name(&self.config.combined_name);

        let pages: Vec<PageRecord> = combined_pages
            .iter()
            .enumerate()
            .map(|(position, page)| PageRecord {
                source: Some(source.clone()),
                original_page_index: Some(position),
                ..page.fresh_copy()
            })
            .collect();

        let mut combined = DocumentRecord::with_pages(name, pages);
        combined.original_page_count = Some(combined.page_count());
        combined.original_bytes = Some(source);
        let combined_id = combined.id.clone();

        self.checkpoint();
        self.state.documents.retain(|d| !ids.contains(&&d.id));
        tracing::info!(
            "Combined {} documents into {} ({} pages)",
            ids.len(),
            combined.name,
            combined.page_count()
        );
        self.state.documents.push(combined);
        self.state.normalize();

        Ok(combined_id)
    }
}
