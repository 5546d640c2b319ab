use serde::{Deserialize, Serialize};

use crate::error::WorkflowError;
use crate::id::{DocumentId, PageId};
use crate::operations::{ConfirmGate, DeleteOutcome};
use crate::workspace::Workspace;

/// One user action, as sent by a front-end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Command {
    ToggleSelect {
        page_id: PageId,
        doc_id: DocumentId,
    },
    SelectAll {
        doc_id: DocumentId,
    },
    ClearSelection,
    Rotate {
        page_id: PageId,
        doc_id: DocumentId,
        clockwise: bool,
    },
    RotateSelected {
        clockwise: bool,
    },
    DuplicatePage {
        page_id: PageId,
        doc_id: DocumentId,
    },
    DeletePage {
        page_id: PageId,
        doc_id: DocumentId,
    },
    DeleteSelected {
        doc_id: DocumentId,
    },
    DeleteDocument {
        doc_id: DocumentId,
    },
    ReorderPage {
        source_doc_id: DocumentId,
        source_page_id: PageId,
        target_doc_id: DocumentId,
        target_index: usize,
    },
    GroupSelected,
    CreateEmptyDocument,
    Combine {
        doc_ids: Vec<DocumentId>,
    },
    RenameDocument {
        doc_id: DocumentId,
        name: String,
    },
    Undo,
    Redo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Message for the user about what a command did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

impl From<&WorkflowError> for Notice {
    fn from(e: &WorkflowError) -> Self {
        match e {
            WorkflowError::DocumentNotFound(_) => Notice::warning(e.to_string()),
            _ => Notice::error(e.to_string()),
        }
    }
}

fn found(ok: bool, done: &str, missing: &str) -> Notice {
    if ok {
        Notice::info(done)
    } else {
        Notice::warning(missing)
    }
}

impl Workspace {
    /// Run a single command. Stale targets produce a warning notice rather
    /// than an error; validation failures are returned as errors with the
    /// state untouched.
    pub fn dispatch(
        &mut self,
        command: Command,
        gate: &mut dyn ConfirmGate,
    ) -> Result<Notice, WorkflowError> {
        tracing::debug!("dispatch: {:?}", command);

        let notice = match command {
            Command::ToggleSelect { page_id, doc_id } => found(
                self.toggle_select(&page_id, &doc_id),
                "Selection updated",
                "Page not found",
            ),
            Command::SelectAll { doc_id } => found(
                self.select_all(&doc_id),
                "Selection updated",
                "Document not found",
            ),
            Command::ClearSelection => {
                self.clear_selection();
                Notice::info("Selection cleared")
            }
            Command::Rotate {
                page_id,
                doc_id,
                clockwise,
            } => found(
                self.rotate(&page_id, &doc_id, clockwise),
                "Page rotated",
                "Page not found",
            ),
            Command::RotateSelected { clockwise } => {
                let count = self.rotate_selected(clockwise)?;
                Notice::success(format!("Rotated {} page(s)", count))
            }
            Command::DuplicatePage { page_id, doc_id } => found(
                self.duplicate_page(&page_id, &doc_id).is_some(),
                "Page duplicated",
                "Page not found",
            ),
            Command::DeletePage { page_id, doc_id } => found(
                self.delete_page(&page_id, &doc_id),
                "Page deleted",
                "Page not found",
            ),
            Command::DeleteSelected { doc_id } => match self.delete_selected_in_document(&doc_id) {
                0 => Notice::warning("No selected pages in this document"),
                n => Notice::success(format!("Deleted {} page(s)", n)),
            },
            Command::DeleteDocument { doc_id } => match self.delete_document(&doc_id, gate) {
                DeleteOutcome::Deleted => Notice::success("Document deleted"),
                DeleteOutcome::Declined => Notice::info("Delete cancelled"),
                DeleteOutcome::NotFound => Notice::warning("Document not found"),
            },
            Command::ReorderPage {
                source_doc_id,
                source_page_id,
                target_doc_id,
                target_index,
            } => found(
                self.reorder_page(&source_doc_id, &source_page_id, &target_doc_id, target_index)
                    .is_some(),
                "Page moved",
                "Page not found",
            ),
            Command::GroupSelected => {
                let doc_id = self.group_selected_into_new_document();
                let name = self
                    .document(&doc_id)
                    .map(|d| d.name.clone())
                    .unwrap_or_default();
                Notice::success(format!("Created \"{}\"", name))
            }
            Command::CreateEmptyDocument => {
                self.create_empty_document();
                Notice::success("Created new document")
            }
            Command::Combine { doc_ids } => match self.combine(&doc_ids) {
                Ok(doc_id) => {
                    let pages = self.document(&doc_id).map_or(0, |d| d.page_count());
                    Notice::success(format!("Combined {} PDFs ({} pages)", doc_ids.len(), pages))
                }
                Err(e @ WorkflowError::DocumentNotFound(_)) => Notice::from(&e),
                Err(e) => return Err(e),
            },
            Command::RenameDocument { doc_id, name } => found(
                self.rename_document(&doc_id, &name)?,
                "Document renamed",
                "Document not found",
            ),
            Command::Undo => found(self.undo(), "Undone", "Nothing to undo"),
            Command::Redo => found(self.redo(), "Redone", "Nothing to redo"),
        };

        Ok(notice)
    }
}
