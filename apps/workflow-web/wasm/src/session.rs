//! Stateful workspace session for the browser
//!
//! The whole workspace lives in Rust. JavaScript sends commands as JSON and
//! re-renders from `getState()`; it only handles DOM events, page rendering
//! and downloads.

use wasm_bindgen::prelude::*;
use workflow_core::export::{render_document, suggested_file_name};
use workflow_core::ingest::load_source;
use workflow_core::{
    view, Command, ConfirmGate, DocumentId, Notice, PageId, RasterFormat, RasterImage,
    SourceFile, WorkflowConfig, Workspace, WorkspaceView,
};

/// Asks the page's confirm callback. Without a callback every request is
/// declined.
struct JsConfirm<'a>(Option<&'a js_sys::Function>);

impl ConfirmGate for JsConfirm<'_> {
    fn confirm(&mut self, title: &str, message: &str) -> bool {
        let Some(callback) = self.0 else {
            return false;
        };
        callback
            .call2(
                &JsValue::null(),
                &JsValue::from_str(title),
                &JsValue::from_str(message),
            )
            .ok()
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }
}

/// Workspace session held in WASM memory
#[wasm_bindgen]
pub struct WorkflowSession {
    workspace: Workspace,
    confirm_callback: Option<js_sys::Function>,
}

impl Default for WorkflowSession {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl WorkflowSession {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self::with_config(WorkflowConfig::default())
    }

    /// Set the confirmation callback used before destructive commands
    /// Callback signature: (title: string, message: string) => boolean
    #[wasm_bindgen(js_name = setConfirmCallback)]
    pub fn set_confirm_callback(&mut self, callback: js_sys::Function) {
        self.confirm_callback = Some(callback);
    }

    /// Add a PDF or image file. Returns the new document id.
    #[wasm_bindgen(js_name = addDocument)]
    pub fn add_document(&mut self, name: &str, bytes: &[u8]) -> Result<String, JsValue> {
        self.add_document_internal(name, bytes)
            .map(|id| id.to_string())
            .map_err(|e| JsValue::from_str(&e))
    }

    /// Run a JSON command such as `{"type": "RotateSelected", "clockwise": true}`.
    /// Returns a `{level, message}` notice.
    pub fn dispatch(&mut self, command_json: &str) -> Result<JsValue, JsValue> {
        let notice = self
            .dispatch_internal(command_json)
            .map_err(|e| JsValue::from_str(&e))?;
        to_js(&notice)
    }

    /// Current documents, pages and selection
    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> Result<JsValue, JsValue> {
        to_js(&self.state_internal())
    }

    pub fn undo(&mut self) -> bool {
        self.workspace.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.workspace.redo()
    }

    #[wasm_bindgen(getter, js_name = canUndo)]
    pub fn can_undo(&self) -> bool {
        self.workspace.can_undo()
    }

    #[wasm_bindgen(getter, js_name = canRedo)]
    pub fn can_redo(&self) -> bool {
        self.workspace.can_redo()
    }

    /// Serialize a document for download
    #[wasm_bindgen(js_name = exportDocument)]
    pub fn export_document(&self, doc_id: &str) -> Result<js_sys::Uint8Array, JsValue> {
        let bytes = self
            .export_document_internal(doc_id)
            .map_err(|e| JsValue::from_str(&e))?;

        let array = js_sys::Uint8Array::new_with_length(bytes.len() as u32);
        array.copy_from(&bytes);
        Ok(array)
    }

    #[wasm_bindgen(js_name = suggestedFileName)]
    pub fn suggested_file_name(&self, doc_id: &str) -> Result<String, JsValue> {
        self.workspace
            .document(&DocumentId::from(doc_id))
            .map(suggested_file_name)
            .ok_or_else(|| JsValue::from_str("Document not found"))
    }

    /// Store a thumbnail rendered by the page (e.g. with pdf.js)
    #[wasm_bindgen(js_name = setPageRaster)]
    pub fn set_page_raster(
        &mut self,
        doc_id: &str,
        page_id: &str,
        mime: &str,
        bytes: &[u8],
        width: u32,
        height: u32,
    ) -> bool {
        let raster = RasterImage::new(RasterFormat::from_mime(mime), bytes.to_vec(), width, height);
        self.workspace
            .set_page_raster(&DocumentId::from(doc_id), &PageId::from(page_id), raster)
    }
}

impl WorkflowSession {
    pub fn with_config(config: WorkflowConfig) -> Self {
        Self {
            workspace: Workspace::new(config),
            confirm_callback: None,
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    fn add_document_internal(&mut self, name: &str, bytes: &[u8]) -> Result<DocumentId, String> {
        let doc = load_source(SourceFile::new(name, bytes.to_vec()), None)
            .map_err(|e| format!("{}: {}", name, e))?;
        self.workspace
            .add_documents(vec![doc])
            .pop()
            .ok_or_else(|| "Document was not added".to_string())
    }

    fn dispatch_internal(&mut self, command_json: &str) -> Result<Notice, String> {
        let command: Command =
            serde_json::from_str(command_json).map_err(|e| format!("Invalid command: {}", e))?;
        let mut gate = JsConfirm(self.confirm_callback.as_ref());
        match self.workspace.dispatch(command, &mut gate) {
            Ok(notice) => Ok(notice),
            // Validation failures are shown to the user, not thrown
            Err(e) => Ok(Notice::from(&e)),
        }
    }

    fn state_internal(&self) -> WorkspaceView {
        view::render(&self.workspace)
    }

    fn export_document_internal(&self, doc_id: &str) -> Result<Vec<u8>, String> {
        let doc = self
            .workspace
            .document(&DocumentId::from(doc_id))
            .cloned()
            .ok_or_else(|| "Document not found".to_string())?;
        render_document(&doc, self.workspace.config())
            .map(|rendered| rendered.bytes)
            .map_err(|e| format!("Export failed: {}", e))
    }
}

fn to_js<T: serde::Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}
