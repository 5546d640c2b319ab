//! Page and document mutations
//!
//! Every mutation records the pre-mutation state in history before touching
//! anything, then re-normalizes the state. Operations on ids that no longer
//! exist are silent no-ops (the snapshot is still taken, so the action stays
//! undoable like any other click).

use crate::error::WorkflowError;
use crate::id::{DocumentId, PageId};
use crate::model::{DocumentRecord, PageRecord, RasterImage};
use crate::workspace::Workspace;

/// Yes/no gate consulted before destructive operations
pub trait ConfirmGate {
    fn confirm(&mut self, title: &str, message: &str) -> bool;
}

impl<F> ConfirmGate for F
where
    F: FnMut(&str, &str) -> bool,
{
    fn confirm(&mut self, title: &str, message: &str) -> bool {
        self(title, message)
    }
}

/// Result of a document deletion request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Declined,
    NotFound,
}

impl Workspace {
    /// Flip selection of one page
    pub fn toggle_select(&mut self, page_id: &PageId, doc_id: &DocumentId) -> bool {
        self.checkpoint();

        let selected = match self.page(doc_id, page_id) {
            Some(page) => page.selected,
            None => {
                tracing::debug!("toggle_select: page {} not in document {}", page_id, doc_id);
                return false;
            }
        };

        if selected {
            self.state.selected_page_ids.remove(page_id);
        } else {
            self.state.selected_page_ids.insert(page_id.clone());
        }
        self.state.normalize();
        true
    }

    /// Select every page of a document, or deselect them all if they are
    /// already all selected
    pub fn select_all(&mut self, doc_id: &DocumentId) -> bool {
        self.checkpoint();

        let Some(doc) = self.state.document(doc_id) else {
            tracing::debug!("select_all: document {} not found", doc_id);
            return false;
        };
        let all_selected = doc.pages.iter().all(|p| p.selected);
        let ids: Vec<PageId> = doc.pages.iter().map(|p| p.id.clone()).collect();

        for id in ids {
            if all_selected {
                self.state.selected_page_ids.remove(&id);
            } else {
                self.state.selected_page_ids.insert(id);
            }
        }
        self.state.normalize();
        true
    }

    /// Deselect everything
    pub fn clear_selection(&mut self) {
        self.checkpoint();
        self.state.selected_page_ids.clear();
        self.state.normalize();
    }

    /// Quarter-turn one page
    pub fn rotate(&mut self, page_id: &PageId, doc_id: &DocumentId, clockwise: bool) -> bool {
        self.checkpoint();

        match self
            .state
            .document_mut(doc_id)
            .and_then(|d| d.page_mut(page_id))
        {
            Some(page) => {
                page.rotation = page.rotation.rotated(clockwise);
                true
            }
            None => {
                tracing::debug!("rotate: page {} not in document {}", page_id, doc_id);
                false
            }
        }
    }

    /// Quarter-turn every selected page across all documents
    pub fn rotate_selected(&mut self, clockwise: bool) -> Result<usize, WorkflowError> {
        if self.state.selected_page_ids.is_empty() {
            return Err(WorkflowError::validation("No pages selected for rotation"));
        }

        self.checkpoint();

        let mut rotated = 0;
        let selected = &self.state.selected_page_ids;
        for doc in &mut self.state.documents {
            for page in doc.pages.iter_mut().filter(|p| selected.contains(&p.id)) {
                page.rotation = page.rotation.rotated(clockwise);
                rotated += 1;
            }
        }
        Ok(rotated)
    }

    /// Insert a copy of a page right after it. Returns the copy's id.
    pub fn duplicate_page(&mut self, page_id: &PageId, doc_id: &DocumentId) -> Option<PageId> {
        self.checkpoint();

        let doc = self.state.document_mut(doc_id)?;
        let Some(pos) = doc.position(page_id) else {
            tracing::debug!("duplicate_page: page {} not in document {}", page_id, doc_id);
            return None;
        };

        let copy = doc.pages[pos].fresh_copy();
        let copy_id = copy.id.clone();
        doc.pages.insert(pos + 1, copy);
        self.state.normalize();
        Some(copy_id)
    }

    /// Remove one page; an emptied document goes with it
    pub fn delete_page(&mut self, page_id: &PageId, doc_id: &DocumentId) -> bool {
        self.checkpoint();

        let Some(doc_index) = self.state.document_index(doc_id) else {
            return false;
        };
        let doc = &mut self.state.documents[doc_index];
        let Some(pos) = doc.position(page_id) else {
            tracing::debug!("delete_page: page {} not in document {}", page_id, doc_id);
            return false;
        };

        doc.pages.remove(pos);
        if doc.is_empty() {
            let removed = self.state.documents.remove(doc_index);
            tracing::info!("Removed emptied document \"{}\"", removed.name);
        }
        self.state.normalize();
        true
    }

    /// Remove the selected pages of one document. Returns how many were
    /// removed; zero means nothing in the document was selected.
    pub fn delete_selected_in_document(&mut self, doc_id: &DocumentId) -> usize {
        self.checkpoint();

        let Some(doc_index) = self.state.document_index(doc_id) else {
            return 0;
        };
        let doc = &mut self.state.documents[doc_index];
        let before = doc.pages.len();
        doc.pages.retain(|p| !p.selected);
        let removed = before - doc.pages.len();

        if removed > 0 && doc.is_empty() {
            self.state.documents.remove(doc_index);
        }
        self.state.normalize();
        removed
    }

    /// Delete a whole document. Documents that still have pages need the
    /// gate's consent; a declined request leaves no trace in history.
    pub fn delete_document(
        &mut self,
        doc_id: &DocumentId,
        gate: &mut dyn ConfirmGate,
    ) -> DeleteOutcome {
        let Some(doc) = self.state.document(doc_id) else {
            return DeleteOutcome::NotFound;
        };

        if !doc.is_empty() {
            let message = format!("Are you sure you want to delete \"{}\"?", doc.name);
            if !gate.confirm("Confirm Delete", &message) {
                return DeleteOutcome::Declined;
            }
        }

        self.checkpoint();
        if let Some(index) = self.state.document_index(doc_id) {
            let removed = self.state.documents.remove(index);
            tracing::info!("Deleted document \"{}\"", removed.name);
        }
        self.state.normalize();
        DeleteOutcome::Deleted
    }

    /// Move a page to `target_index` of `target_doc` (which may be the
    /// source document). The moved page gets a fresh id and is deselected.
    /// Returns the new id.
    pub fn reorder_page(
        &mut self,
        source_doc: &DocumentId,
        source_page: &PageId,
        target_doc: &DocumentId,
        target_index: usize,
    ) -> Option<PageId> {
        self.checkpoint();

        let source_index = self.state.document_index(source_doc)?;
        let target_doc_index = self.state.document_index(target_doc)?;
        let pos = self.state.documents[source_index].position(source_page)?;

        let page = self.state.documents[source_index].pages.remove(pos);
        let moved = page.fresh_copy();
        let moved_id = moved.id.clone();

        let target = &mut self.state.documents[target_doc_index];
        let at = target_index.min(target.pages.len());
        target.pages.insert(at, moved);

        if source_index != target_doc_index && self.state.documents[source_index].is_empty() {
            self.state.documents.remove(source_index);
        }
        self.state.normalize();
        Some(moved_id)
    }

    /// Move every selected page into a new document. With nothing selected
    /// this creates an empty document instead.
    pub fn group_selected_into_new_document(&mut self) -> DocumentId {
        if self.state.selected_page_ids.is_empty() {
            return self.create_empty_document();
        }

        self.checkpoint();

        let name = self.state.unique_name(&format!(
            "{} {}.pdf",
            self.config.new_document_prefix,
            self.state.documents.len() + 1
        ));
        let selected = std::mem::take(&mut self.state.selected_page_ids);

        let pages: Vec<PageRecord> = self
            .state
            .documents
            .iter()
            .flat_map(|d| d.pages.iter())
            .filter(|p| selected.contains(&p.id))
            .map(PageRecord::fresh_copy)
            .collect();

        for doc in &mut self.state.documents {
            doc.pages.retain(|p| !selected.contains(&p.id));
        }
        self.state.prune_empty_documents();

        let doc = DocumentRecord::with_pages(name, pages);
        let doc_id = doc.id.clone();
        tracing::info!("Grouped {} page(s) into \"{}\"", doc.page_count(), doc.name);
        self.state.documents.push(doc);
        self.state.normalize();
        doc_id
    }

    pub fn create_empty_document(&mut self) -> DocumentId {
        self.checkpoint();

        let name = self
            .state
            .unique_name(&format!("{}.pdf", self.config.new_document_prefix));
        let doc = DocumentRecord::new(name);
        let doc_id = doc.id.clone();
        self.state.documents.push(doc);
        doc_id
    }

    pub fn rename_document(&mut self, doc_id: &DocumentId, name: &str) -> Result<bool, WorkflowError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(WorkflowError::validation("Document name must not be empty"));
        }
        if self.state.document(doc_id).is_none() {
            return Ok(false);
        }

        self.checkpoint();
        if let Some(doc) = self.state.document_mut(doc_id) {
            doc.name = name.to_string();
        }
        Ok(true)
    }

    /// Append documents in one undoable step
    pub fn add_documents(&mut self, documents: Vec<DocumentRecord>) -> Vec<DocumentId> {
        if documents.is_empty() {
            return Vec::new();
        }

        self.checkpoint();
        let ids = documents.iter().map(|d| d.id.clone()).collect();
        self.state.documents.extend(documents);
        self.state.normalize();
        ids
    }

    /// Replace a page's cached raster. Rasters are display caches, so this
    /// is not recorded in history.
    pub fn set_page_raster(
        &mut self,
        doc_id: &DocumentId,
        page_id: &PageId,
        raster: RasterImage,
    ) -> bool {
        match self
            .state
            .document_mut(doc_id)
            .and_then(|d| d.page_mut(page_id))
        {
            Some(page) => {
                page.raster = Some(raster);
                true
            }
            None => false,
        }
    }
}
