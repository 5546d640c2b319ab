//! PDF workflow workspace
//!
//! Holds any number of open PDFs as editable page lists. Pages can be
//! selected, rotated, duplicated, deleted, moved between documents, grouped
//! into new documents and whole documents combined, with every change
//! undoable. Export turns a document back into PDF bytes using `lopdf`.
//!
//! - [`Workspace`]: the state owner; mutations live in `operations`,
//!   `combine` and `ingest`
//! - [`Command`]: serde-tagged actions for front-ends, run with
//!   [`Workspace::dispatch`]
//! - [`export`]: render and save documents

pub mod assemble;
pub mod combine;
pub mod command;
pub mod config;
pub mod error;
pub mod export;
pub mod history;
pub mod id;
pub mod ingest;
pub mod model;
pub mod operations;
pub mod page_info;
pub mod raster;
pub mod validation;
pub mod view;
pub mod workspace;

#[cfg(test)]
mod test_support;

pub use command::{Command, Notice, NoticeLevel};
pub use config::WorkflowConfig;
pub use error::WorkflowError;
pub use export::{ExportOutcome, ExportPlan, RenderedPdf, SaveTarget};
pub use id::{DocumentId, PageId};
pub use ingest::{IngestReport, RasterQuality, Rasterizer, SourceFile};
pub use model::{DocumentRecord, PageRecord, PdfSource, RasterFormat, RasterImage, Rotation};
pub use operations::{ConfirmGate, DeleteOutcome};
pub use validation::{is_valid_pdf, validate_pdf, PdfInfo};
pub use view::WorkspaceView;
pub use workspace::{Workspace, WorkspaceState};
