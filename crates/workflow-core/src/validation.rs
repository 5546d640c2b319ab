//! PDF validation and info extraction
//!
//! Decides whether a byte buffer can be used as a page source: combine uses
//! this to pick between copying real pages and re-embedding rasters.

use lopdf::Document;
use serde::Serialize;

use crate::error::WorkflowError;

/// Anything shorter cannot hold a `%PDF-` header
const MIN_PDF_LEN: usize = 5;

/// PDF file information extracted during validation
#[derive(Debug, Clone, Serialize, Default)]
pub struct PdfInfo {
    /// Number of pages in the document
    pub page_count: u32,
    /// PDF version string (e.g., "1.7")
    pub version: String,
    /// File size in bytes
    pub size_bytes: usize,
}

/// Validate a PDF file and extract basic info. Encrypted and page-less
/// documents are rejected.
pub fn validate_pdf(bytes: &[u8]) -> Result<PdfInfo, WorkflowError> {
    if bytes.len() < MIN_PDF_LEN {
        return Err(WorkflowError::ParseError(
            "File too small to be a valid PDF".into(),
        ));
    }

    if !bytes.starts_with(b"%PDF-") {
        return Err(WorkflowError::ParseError(
            "Not a valid PDF file (missing %PDF- header)".into(),
        ));
    }

    let version = extract_version(bytes);
    let document = Document::load_mem(bytes)?;

    if document.is_encrypted() {
        return Err(WorkflowError::ParseError(
            "PDF is encrypted and cannot be edited".into(),
        ));
    }

    let page_count = document.get_pages().len() as u32;
    if page_count == 0 {
        return Err(WorkflowError::ParseError("PDF has no pages".into()));
    }

    Ok(PdfInfo {
        page_count,
        version,
        size_bytes: bytes.len(),
    })
}

/// Cheap yes/no form of [`validate_pdf`]
pub fn is_valid_pdf(bytes: &[u8]) -> bool {
    match validate_pdf(bytes) {
        Ok(_) => true,
        Err(e) => {
            tracing::debug!("PDF validation failed: {}", e);
            false
        }
    }
}

/// Extract PDF version from header
fn extract_version(bytes: &[u8]) -> String {
    // Header format: %PDF-1.7
    if bytes.len() >= 8 && bytes.starts_with(b"%PDF-") {
        if let Ok(version) = std::str::from_utf8(&bytes[5..8]) {
            return version.trim().to_string();
        }
    }
    "1.4".to_string()
}
