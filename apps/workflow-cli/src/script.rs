//! Edit scripts
//!
//! A script is a JSON array of steps. Steps name documents by their display
//! name and pages by 1-based position, so they can be written by hand before
//! any ids exist. Each step is resolved against the live workspace right
//! before it runs.

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use workflow_core::{Command, DocumentId, DocumentRecord, PageId, Workspace};

fn default_clockwise() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScriptStep {
    /// Add the listed pages to the selection; pages already selected and
    /// repeated numbers are left alone
    Select {
        document: String,
        pages: Vec<usize>,
    },
    SelectAll {
        document: String,
    },
    ClearSelection,
    Rotate {
        document: String,
        page: usize,
        #[serde(default = "default_clockwise")]
        clockwise: bool,
    },
    RotateSelected {
        #[serde(default = "default_clockwise")]
        clockwise: bool,
    },
    Duplicate {
        document: String,
        page: usize,
    },
    DeletePage {
        document: String,
        page: usize,
    },
    DeleteSelected {
        document: String,
    },
    DeleteDocument {
        document: String,
    },
    /// Move page `page` of `from` so it lands at 1-based `position` in `to`
    Move {
        from: String,
        page: usize,
        to: String,
        position: usize,
    },
    Group,
    CreateEmpty,
    Combine {
        documents: Vec<String>,
    },
    Rename {
        document: String,
        name: String,
    },
    Undo,
    Redo,
}

/// Parse a script file's contents
pub fn parse(json: &str) -> Result<Vec<ScriptStep>> {
    serde_json::from_str(json).context("Invalid edit script")
}

impl ScriptStep {
    /// Turn this step into workspace commands using the current ids
    pub fn resolve(&self, ws: &Workspace) -> Result<Vec<Command>> {
        let commands = match self {
            ScriptStep::Select { document, pages } => {
                let doc = find_document(ws, document)?;
                let mut wanted: Vec<usize> = Vec::with_capacity(pages.len());
                for &n in pages {
                    if !wanted.contains(&n) {
                        wanted.push(n);
                    }
                }
                // Toggling would deselect pages that are already selected
                let mut commands = Vec::with_capacity(wanted.len());
                for n in wanted {
                    let page_id = page_at(doc, n)?;
                    if !ws.selected_page_ids().contains(&page_id) {
                        commands.push(Command::ToggleSelect {
                            page_id,
                            doc_id: doc.id.clone(),
                        });
                    }
                }
                commands
            }
            ScriptStep::SelectAll { document } => vec![Command::SelectAll {
                doc_id: find_document(ws, document)?.id.clone(),
            }],
            ScriptStep::ClearSelection => vec![Command::ClearSelection],
            ScriptStep::Rotate {
                document,
                page,
                clockwise,
            } => {
                let doc = find_document(ws, document)?;
                vec![Command::Rotate {
                    page_id: page_at(doc, *page)?,
                    doc_id: doc.id.clone(),
                    clockwise: *clockwise,
                }]
            }
            ScriptStep::RotateSelected { clockwise } => vec![Command::RotateSelected {
                clockwise: *clockwise,
            }],
            ScriptStep::Duplicate { document, page } => {
                let doc = find_document(ws, document)?;
                vec![Command::DuplicatePage {
                    page_id: page_at(doc, *page)?,
                    doc_id: doc.id.clone(),
                }]
            }
            ScriptStep::DeletePage { document, page } => {
                let doc = find_document(ws, document)?;
                vec![Command::DeletePage {
                    page_id: page_at(doc, *page)?,
                    doc_id: doc.id.clone(),
                }]
            }
            ScriptStep::DeleteSelected { document } => vec![Command::DeleteSelected {
                doc_id: find_document(ws, document)?.id.clone(),
            }],
            ScriptStep::DeleteDocument { document } => vec![Command::DeleteDocument {
                doc_id: find_document(ws, document)?.id.clone(),
            }],
            ScriptStep::Move {
                from,
                page,
                to,
                position,
            } => {
                let source = find_document(ws, from)?;
                let target = find_document(ws, to)?;
                if *position == 0 {
                    bail!("Positions are 1-based");
                }
                vec![Command::ReorderPage {
                    source_doc_id: source.id.clone(),
                    source_page_id: page_at(source, *page)?,
                    target_doc_id: target.id.clone(),
                    target_index: position - 1,
                }]
            }
            ScriptStep::Group => vec![Command::GroupSelected],
            ScriptStep::CreateEmpty => vec![Command::CreateEmptyDocument],
            ScriptStep::Combine { documents } => vec![Command::Combine {
                doc_ids: documents
                    .iter()
                    .map(|name| find_document(ws, name).map(|d| d.id.clone()))
                    .collect::<Result<Vec<DocumentId>>>()?,
            }],
            ScriptStep::Rename { document, name } => vec![Command::RenameDocument {
                doc_id: find_document(ws, document)?.id.clone(),
                name: name.clone(),
            }],
            ScriptStep::Undo => vec![Command::Undo],
            ScriptStep::Redo => vec![Command::Redo],
        };
        Ok(commands)
    }
}

/// Look a document up by name, with or without the `.pdf` extension
fn find_document<'a>(ws: &'a Workspace, name: &str) -> Result<&'a DocumentRecord> {
    ws.documents()
        .iter()
        .find(|d| d.name == name)
        .or_else(|| {
            ws.documents()
                .iter()
                .find(|d| d.name.strip_suffix(".pdf") == Some(name))
        })
        .ok_or_else(|| anyhow!("No document named \"{}\"", name))
}

fn page_at(doc: &DocumentRecord, number: usize) -> Result<PageId> {
    number
        .checked_sub(1)
        .and_then(|i| doc.pages.get(i))
        .map(|p| p.id.clone())
        .ok_or_else(|| {
            anyhow!(
                "\"{}\" has no page {} (it has {})",
                doc.name,
                number,
                doc.page_count()
            )
        })
}
