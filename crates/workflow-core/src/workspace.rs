//! Workspace state and its owner
//!
//! `WorkspaceState` is a plain value (documents + selection) so that undo
//! snapshots are just clones. `Workspace` owns the current state, the undo
//! history and the configuration; every mutation goes through it.

use std::collections::BTreeSet;

use crate::config::WorkflowConfig;
use crate::history::History;
use crate::id::{DocumentId, PageId};
use crate::model::{DocumentRecord, PageRecord};

/// Documents plus the selected page ids. Cloned whole for undo.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorkspaceState {
    pub documents: Vec<DocumentRecord>,
    pub selected_page_ids: BTreeSet<PageId>,
}

impl WorkspaceState {
    pub fn document(&self, doc_id: &DocumentId) -> Option<&DocumentRecord> {
        self.documents.iter().find(|d| &d.id == doc_id)
    }

    pub fn document_mut(&mut self, doc_id: &DocumentId) -> Option<&mut DocumentRecord> {
        self.documents.iter_mut().find(|d| &d.id == doc_id)
    }

    pub fn document_index(&self, doc_id: &DocumentId) -> Option<usize> {
        self.documents.iter().position(|d| &d.id == doc_id)
    }

    pub fn page_count(&self) -> usize {
        self.documents.iter().map(DocumentRecord::page_count).sum()
    }

    /// Re-establish the state invariants: page numbers are `1..=len`, the
    /// selection only names pages that exist, and every page's `selected`
    /// flag matches the selection.
    pub fn normalize(&mut self) {
        let existing: BTreeSet<PageId> = self
            .documents
            .iter()
            .flat_map(|d| d.pages.iter().map(|p| p.id.clone()))
            .collect();
        self.selected_page_ids.retain(|id| existing.contains(id));

        for doc in &mut self.documents {
            doc.renumber();
            for page in &mut doc.pages {
                page.selected = self.selected_page_ids.contains(&page.id);
            }
        }
    }

    /// Drop documents left without pages
    pub(crate) fn prune_empty_documents(&mut self) -> usize {
        let before = self.documents.len();
        self.documents.retain(|d| !d.is_empty());
        before - self.documents.len()
    }

    /// `base` if no document uses it, otherwise `"<stem> <n>.pdf"` with the
    /// smallest free `n >= 2`
    pub(crate) fn unique_name(&self, base: &str) -> String {
        let taken = |name: &str| self.documents.iter().any(|d| d.name == name);
        if !taken(base) {
            return base.to_string();
        }
        let stem = base.strip_suffix(".pdf").unwrap_or(base);
        (2..)
            .map(|n| format!("{} {}.pdf", stem, n))
            .find(|candidate| !taken(candidate))
            .unwrap_or_else(|| base.to_string())
    }
}

/// Owner of the editable state and its history
#[derive(Debug, Clone)]
pub struct Workspace {
    pub(crate) state: WorkspaceState,
    pub(crate) history: History<WorkspaceState>,
    pub(crate) config: WorkflowConfig,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new(WorkflowConfig::default())
    }
}

impl Workspace {
    pub fn new(config: WorkflowConfig) -> Self {
        Self {
            state: WorkspaceState::default(),
            history: History::new(config.history_limit),
            config,
        }
    }

    /// Start from existing documents without any history
    pub fn with_documents(config: WorkflowConfig, documents: Vec<DocumentRecord>) -> Self {
        let mut workspace = Self::new(config);
        workspace.state.documents = documents;
        workspace.state.normalize();
        workspace
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn state(&self) -> &WorkspaceState {
        &self.state
    }

    pub fn documents(&self) -> &[DocumentRecord] {
        &self.state.documents
    }

    pub fn document(&self, doc_id: &DocumentId) -> Option<&DocumentRecord> {
        self.state.document(doc_id)
    }

    pub fn page(&self, doc_id: &DocumentId, page_id: &PageId) -> Option<&PageRecord> {
        self.state.document(doc_id)?.page(page_id)
    }

    pub fn selected_page_ids(&self) -> &BTreeSet<PageId> {
        &self.state.selected_page_ids
    }

    pub fn selection_count(&self) -> usize {
        self.state.selected_page_ids.len()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Number of undo snapshots
    pub fn history_len(&self) -> usize {
        self.history.past_len()
    }

    /// Number of redo snapshots
    pub fn future_len(&self) -> usize {
        self.history.future_len()
    }

    /// Record the current state before a mutation
    pub(crate) fn checkpoint(&mut self) {
        self.history.record(self.state.clone());
    }

    pub fn undo(&mut self) -> bool {
        match self.history.undo(self.state.clone()) {
            Some(previous) => {
                self.state = previous;
                tracing::debug!("Undo: {} snapshot(s) left", self.history.past_len());
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo(self.state.clone()) {
            Some(next) => {
                self.state = next;
                tracing::debug!("Redo: {} snapshot(s) left", self.history.future_len());
                true
            }
            None => false,
        }
    }
}
