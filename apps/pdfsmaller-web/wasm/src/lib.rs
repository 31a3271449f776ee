//! WASM bindings for the PDFSmaller page
//!
//! All state is held in Rust by `PdfSmallerClient`; JavaScript forwards
//! DOM events and `File` objects and nothing else.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { PdfSmallerClient } from './pkg/pdfsmaller_wasm.js';
//!
//! await init();
//! const client = new PdfSmallerClient({ demoMode: true });
//!
//! fileInput.addEventListener('change', (e) => client.selectFiles(e.target.files));
//! compressBtn.addEventListener('click', () => client.compress().catch(() => {}));
//! downloadBtn.addEventListener('click', () => client.download());
//! ```

pub mod client;
pub mod dom;
pub mod logging;
pub mod storage;
pub mod transport;

use wasm_bindgen::prelude::*;

pub use client::PdfSmallerClient;

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

/// Human-readable size, e.g. "1.5 MB"
#[wasm_bindgen]
pub fn format_file_size(bytes: f64) -> String {
    pdfsmaller_core::format_file_size(bytes.max(0.0) as u64)
}
