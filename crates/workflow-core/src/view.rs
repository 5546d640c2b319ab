//! Read-only projection of the workspace for front-ends

use serde::Serialize;

use crate::id::{DocumentId, PageId};
use crate::model::{DocumentRecord, PageRecord, Rotation};
use crate::workspace::Workspace;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageView {
    pub id: PageId,
    pub page_number: usize,
    pub rotation: Rotation,
    pub selected: bool,
    pub width: f32,
    pub height: f32,
    pub has_raster: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentView {
    pub id: DocumentId,
    pub name: String,
    pub page_count: usize,
    pub pages: Vec<PageView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkspaceView {
    pub documents: Vec<DocumentView>,
    pub selection_count: usize,
    pub can_undo: bool,
    pub can_redo: bool,
}

impl From<&PageRecord> for PageView {
    fn from(page: &PageRecord) -> Self {
        Self {
            id: page.id.clone(),
            page_number: page.page_number,
            rotation: page.rotation,
            selected: page.selected,
            width: page.width,
            height: page.height,
            has_raster: page.raster.is_some(),
        }
    }
}

impl From<&DocumentRecord> for DocumentView {
    fn from(doc: &DocumentRecord) -> Self {
        Self {
            id: doc.id.clone(),
            name: doc.name.clone(),
            page_count: doc.page_count(),
            pages: doc.pages.iter().map(PageView::from).collect(),
        }
    }
}

pub fn render(workspace: &Workspace) -> WorkspaceView {
    WorkspaceView {
        documents: workspace.documents().iter().map(DocumentView::from).collect(),
        selection_count: workspace.selection_count(),
        can_undo: workspace.can_undo(),
        can_redo: workspace.can_redo(),
    }
}
