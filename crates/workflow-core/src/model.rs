//! Page and document records
//!
//! A document is an ordered list of page records plus an optional handle on
//! the PDF bytes it was ingested from. Pages carry their own source handle so
//! a page moved into another document still knows where its content lives.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::id::{DocumentId, PageId};

/// Page rotation in degrees, always one of 0, 90, 180 or 270
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Rotation(u16);

impl Rotation {
    pub const NONE: Rotation = Rotation(0);

    /// Normalize any multiple of 90 into `[0, 360)`
    pub fn from_degrees(degrees: i64) -> Option<Self> {
        if degrees % 90 != 0 {
            return None;
        }
        Some(Rotation(degrees.rem_euclid(360) as u16))
    }

    pub fn degrees(self) -> u16 {
        self.0
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Quarter turn in the given direction
    pub fn rotated(self, clockwise: bool) -> Self {
        let delta: i64 = if clockwise { 90 } else { -90 };
        Rotation((self.0 as i64 + delta).rem_euclid(360) as u16)
    }

    /// Combine with another rotation (used to stack a page's edit on top of
    /// its intrinsic `/Rotate`)
    pub fn plus(self, other: Rotation) -> Self {
        Rotation((self.0 + other.0) % 360)
    }
}

impl TryFrom<i64> for Rotation {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Rotation::from_degrees(value)
            .ok_or_else(|| format!("Rotation must be a multiple of 90, got {}", value))
    }
}

impl From<Rotation> for i64 {
    fn from(rotation: Rotation) -> Self {
        rotation.0 as i64
    }
}

/// Encoding of a cached page raster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RasterFormat {
    Png,
    Jpeg,
}

impl RasterFormat {
    /// Map a MIME type such as `image/png` to a format. Unknown types are
    /// treated as PNG, matching what rasterizers emit by default.
    pub fn from_mime(mime: &str) -> Self {
        let lower = mime.to_ascii_lowercase();
        if lower.contains("jpeg") || lower.contains("jpg") {
            RasterFormat::Jpeg
        } else {
            RasterFormat::Png
        }
    }
}

/// Cached display rendering of a page. Never authoritative.
#[derive(Clone, PartialEq)]
pub struct RasterImage {
    pub format: RasterFormat,
    pub data: Arc<Vec<u8>>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl RasterImage {
    pub fn new(format: RasterFormat, data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            format,
            data: Arc::new(data),
            width,
            height,
        }
    }
}

impl fmt::Debug for RasterImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RasterImage")
            .field("format", &self.format)
            .field("bytes", &self.data.len())
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// Shared handle on the raw bytes of a source PDF
#[derive(Clone)]
pub struct PdfSource(Arc<Vec<u8>>);

impl PdfSource {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(Arc::new(bytes))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    /// True when both handles point at the same buffer
    pub fn same_buffer(&self, other: &PdfSource) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for PdfSource {
    fn eq(&self, other: &Self) -> bool {
        self.same_buffer(other) || self.0 == other.0
    }
}

impl fmt::Debug for PdfSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PdfSource({} bytes)", self.0.len())
    }
}

/// One page of a virtual document
#[derive(Debug, Clone, PartialEq)]
pub struct PageRecord {
    pub id: PageId,
    /// 1-based position in the owning document, recomputed after every change
    pub page_number: usize,
    /// 0-based index of this page's content in `source`
    pub original_page_index: Option<usize>,
    pub source: Option<PdfSource>,
    pub rotation: Rotation,
    pub selected: bool,
    pub raster: Option<RasterImage>,
    /// Page width in PDF points
    pub width: f32,
    /// Page height in PDF points
    pub height: f32,
}

impl PageRecord {
    /// A page without source content, sized in points
    pub fn blank(width: f32, height: f32) -> Self {
        Self {
            id: PageId::generate(),
            page_number: 0,
            original_page_index: None,
            source: None,
            rotation: Rotation::NONE,
            selected: false,
            raster: None,
            width,
            height,
        }
    }

    /// A page backed by page `index` of `source`
    pub fn from_source(source: PdfSource, index: usize, width: f32, height: f32) -> Self {
        Self {
            original_page_index: Some(index),
            source: Some(source),
            ..Self::blank(width, height)
        }
    }

    /// Deep copy with a fresh id and cleared selection
    pub fn fresh_copy(&self) -> Self {
        Self {
            id: PageId::generate(),
            selected: false,
            ..self.clone()
        }
    }
}

/// A virtual PDF: ordered pages plus the bytes it was ingested from
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRecord {
    pub id: DocumentId,
    pub name: String,
    pub pages: Vec<PageRecord>,
    pub original_bytes: Option<PdfSource>,
    pub original_page_count: Option<usize>,
}

impl DocumentRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: DocumentId::generate(),
            name: name.into(),
            pages: Vec::new(),
            original_bytes: None,
            original_page_count: None,
        }
    }

    pub fn with_pages(name: impl Into<String>, pages: Vec<PageRecord>) -> Self {
        let mut doc = Self::new(name);
        doc.pages = pages;
        doc.renumber();
        doc
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn page(&self, page_id: &PageId) -> Option<&PageRecord> {
        self.pages.iter().find(|p| &p.id == page_id)
    }

    pub fn page_mut(&mut self, page_id: &PageId) -> Option<&mut PageRecord> {
        self.pages.iter_mut().find(|p| &p.id == page_id)
    }

    pub fn position(&self, page_id: &PageId) -> Option<usize> {
        self.pages.iter().position(|p| &p.id == page_id)
    }

    /// Reassign `page_number` as `1..=len` in list order
    pub fn renumber(&mut self) {
        for (idx, page) in self.pages.iter_mut().enumerate() {
            page.page_number = idx + 1;
        }
    }
}
