//! Workspace configuration
//!
//! Values can come from a serialized config or from `PDF_WORKFLOW_*`
//! environment variables.

use serde::Deserialize;

use crate::ingest::RasterQuality;

const DEFAULT_HISTORY_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Maximum number of undo snapshots kept; `None` keeps everything
    pub history_limit: Option<usize>,
    /// Page size in points used when a page has neither source nor size (A4)
    pub default_page_width: f32,
    pub default_page_height: f32,
    /// Base name for documents produced by combine
    pub combined_name: String,
    /// Prefix for documents produced by grouping or created empty
    pub new_document_prefix: String,
    /// Resolution requested from the rasterizer during ingest
    pub raster_quality: RasterQuality,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            history_limit: Some(DEFAULT_HISTORY_LIMIT),
            default_page_width: 595.0,
            default_page_height: 842.0,
            combined_name: "Combined PDF.pdf".to_string(),
            new_document_prefix: "New PDF".to_string(),
            raster_quality: RasterQuality::Thumbnail,
        }
    }
}

impl WorkflowConfig {
    /// Read overrides from the environment. A history limit of `0` means
    /// unbounded.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(limit) = lookup("PDF_WORKFLOW_HISTORY_LIMIT").and_then(|v| v.parse().ok()) {
            config.history_limit = if limit == 0 { None } else { Some(limit) };
        }
        if let Some(width) = lookup("PDF_WORKFLOW_PAGE_WIDTH").and_then(|v| v.parse().ok()) {
            config.default_page_width = width;
        }
        if let Some(height) = lookup("PDF_WORKFLOW_PAGE_HEIGHT").and_then(|v| v.parse().ok()) {
            config.default_page_height = height;
        }
        if let Some(quality) =
            lookup("PDF_WORKFLOW_RASTER_QUALITY").and_then(|v| RasterQuality::from_name(&v))
        {
            config.raster_quality = quality;
        }

        config
    }

    pub fn with_history_limit(mut self, limit: Option<usize>) -> Self {
        self.history_limit = limit;
        self
    }
}
