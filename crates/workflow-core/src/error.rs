use thiserror::Error;

use crate::id::DocumentId;

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Failed to parse PDF: {0}")]
    ParseError(String),

    #[error("PDF operation failed: {0}")]
    OperationError(String),

    #[error("{0}")]
    Validation(String),

    #[error("Document not found: {0}")]
    DocumentNotFound(DocumentId),

    #[error("Raster image error: {0}")]
    Raster(String),

    #[error("Combine failed: {0}")]
    CombineFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkflowError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        WorkflowError::Validation(message.into())
    }
}

impl From<lopdf::Error> for WorkflowError {
    fn from(e: lopdf::Error) -> Self {
        WorkflowError::ParseError(e.to_string())
    }
}
