//! WASM bindings for the PDF workflow workspace
//!
//! All workspace state is held in Rust inside a `WorkflowSession`.
//! JavaScript renders pages, forwards user actions as JSON commands and
//! downloads exported bytes.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { WorkflowSession } from './pkg/workflow_wasm.js';
//!
//! await init();
//!
//! const session = new WorkflowSession();
//! session.setConfirmCallback((title, message) => window.confirm(message));
//! const docId = session.addDocument("file.pdf", bytes);
//! const state = session.getState();
//! session.dispatch(JSON.stringify({ type: "SelectAll", doc_id: docId }));
//! session.dispatch(JSON.stringify({ type: "RotateSelected", clockwise: true }));
//! const pdf = session.exportDocument(docId);
//! downloadBlob(pdf, session.suggestedFileName(docId));
//! ```

pub mod session;

use wasm_bindgen::prelude::*;

pub use session::WorkflowSession;

/// Initialize the WASM module
/// Called automatically by wasm-bindgen
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Get the library version
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Get detailed PDF info before adding a file to the session
#[wasm_bindgen]
pub fn get_pdf_info(bytes: &[u8]) -> Result<JsValue, JsValue> {
    let info = workflow_core::validate_pdf(bytes).map_err(|e| JsValue::from_str(&e.to_string()))?;

    serde_wasm_bindgen::to_value(&info)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}
