//! Loading files into document records
//!
//! PDFs are validated and read for page geometry. PNG and JPEG images become
//! one-page PDFs sized to the image. Parsing happens entirely before the
//! workspace is touched, so a batch is committed as a single undo step.

use lopdf::Document;
use serde::Deserialize;

use crate::assemble::PdfAssembler;
use crate::error::WorkflowError;
use crate::id::DocumentId;
use crate::model::{DocumentRecord, PageRecord, PdfSource, RasterFormat, RasterImage, Rotation};
use crate::page_info::PageInfo;
use crate::raster::image_dimensions;
use crate::validation::validate_pdf;
use crate::workspace::Workspace;

/// A file handed to the workspace by a front-end
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Pdf,
    Image(RasterFormat),
}

/// Resolution a rasterizer is asked for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterQuality {
    #[default]
    Thumbnail,
    Preview,
    Print,
}

impl RasterQuality {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "thumbnail" => Some(RasterQuality::Thumbnail),
            "preview" => Some(RasterQuality::Preview),
            "print" => Some(RasterQuality::Print),
            _ => None,
        }
    }
}

/// Renders one page of a PDF to an image
pub trait Rasterizer {
    fn rasterize(
        &self,
        source: &[u8],
        page_index: usize,
        quality: RasterQuality,
    ) -> Result<RasterImage, WorkflowError>;
}

/// What happened to each file of an ingest batch
#[derive(Debug, Default)]
pub struct IngestReport {
    pub added: Vec<DocumentId>,
    pub failed: Vec<(String, WorkflowError)>,
}

/// Sniff the file type from its leading bytes, then from its extension
pub fn detect_kind(file: &SourceFile) -> Option<SourceKind> {
    let bytes = &file.bytes;
    if bytes.starts_with(b"%PDF-") {
        return Some(SourceKind::Pdf);
    }
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        return Some(SourceKind::Image(RasterFormat::Png));
    }
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some(SourceKind::Image(RasterFormat::Jpeg));
    }

    let lower = file.name.to_ascii_lowercase();
    let extension = lower.rsplit_once('.').map(|(_, ext)| ext)?;
    match extension {
        "pdf" => Some(SourceKind::Pdf),
        "png" => Some(SourceKind::Image(RasterFormat::Png)),
        "jpg" | "jpeg" => Some(SourceKind::Image(RasterFormat::Jpeg)),
        _ => None,
    }
}

/// Parse one file into a document record. PDF pages are rendered at the
/// given quality when a rasterizer is supplied.
pub fn load_source(
    file: SourceFile,
    rasterizer: Option<(&dyn Rasterizer, RasterQuality)>,
) -> Result<DocumentRecord, WorkflowError> {
    match detect_kind(&file) {
        Some(SourceKind::Pdf) => load_pdf(file, rasterizer),
        Some(SourceKind::Image(format)) => load_image(file, format),
        None => Err(WorkflowError::validation(format!(
            "Unsupported file type: {}",
            file.name
        ))),
    }
}

fn load_pdf(
    file: SourceFile,
    rasterizer: Option<(&dyn Rasterizer, RasterQuality)>,
) -> Result<DocumentRecord, WorkflowError> {
    let info = validate_pdf(&file.bytes)?;
    let document = Document::load_mem(&file.bytes)?;
    let geometry = PageInfo::all_from_document(&document)?;

    let source = PdfSource::new(file.bytes);
    let pages = geometry
        .iter()
        .enumerate()
        .map(|(index, page)| {
            let mut record = PageRecord::from_source(source.clone(), index, page.width, page.height);
            if let Some((rasterizer, quality)) = rasterizer {
                match rasterizer.rasterize(source.bytes(), index, quality) {
                    Ok(raster) => record.raster = Some(raster),
                    Err(e) => tracing::warn!(
                        "Could not render page {} of {}: {}",
                        index + 1,
                        file.name,
                        e
                    ),
                }
            }
            record
        })
        .collect();

    let mut doc = DocumentRecord::with_pages(file.name, pages);
    doc.original_page_count = Some(doc.page_count());
    doc.original_bytes = Some(source);

    tracing::debug!(
        "Loaded {} (PDF {}, {} pages, {} bytes)",
        doc.name,
        info.version,
        info.page_count,
        info.size_bytes
    );
    Ok(doc)
}

fn load_image(file: SourceFile, format: RasterFormat) -> Result<DocumentRecord, WorkflowError> {
    let (width, height) = image_dimensions(format, &file.bytes)?;
    if width == 0 || height == 0 {
        return Err(WorkflowError::Raster(format!(
            "{} has no pixels",
            file.name
        )));
    }
    let image = RasterImage::new(format, file.bytes, width, height);

    let mut assembler = PdfAssembler::new();
    assembler.add_raster_page(&image, width as f32, height as f32, Rotation::NONE)?;
    let source = PdfSource::new(assembler.finish()?);

    let mut page = PageRecord::from_source(source.clone(), 0, width as f32, height as f32);
    page.raster = Some(image);

    let name = match file.name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => format!("{}.pdf", stem),
        _ => format!("{}.pdf", file.name),
    };
    let mut doc = DocumentRecord::with_pages(name, vec![page]);
    doc.original_page_count = Some(1);
    doc.original_bytes = Some(source);

    tracing::debug!("Wrapped image {} ({}x{}) as a PDF", file.name, width, height);
    Ok(doc)
}

impl Workspace {
    /// Load a batch of files. Every file is parsed first; the documents that
    /// loaded are then added in a single undoable step.
    pub fn ingest(
        &mut self,
        files: Vec<SourceFile>,
        rasterizer: Option<&dyn Rasterizer>,
    ) -> IngestReport {
        let mut report = IngestReport::default();
        let mut loaded = Vec::new();
        let rasterizer = rasterizer.map(|r| (r, self.config.raster_quality));

        for file in files {
            let name = file.name.clone();
            match load_source(file, rasterizer) {
                Ok(doc) => loaded.push(doc),
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", name, e);
                    report.failed.push((name, e));
                }
            }
        }

        report.added = self.add_documents(loaded);
        if !report.added.is_empty() {
            tracing::info!(
                "Added {} document(s), {} failed",
                report.added.len(),
                report.failed.len()
            );
        }
        report
    }
}
