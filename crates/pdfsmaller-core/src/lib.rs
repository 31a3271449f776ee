//! PDFSmaller client core
//!
//! All state and rules of the PDFSmaller page, independent of the browser:
//! session persistence, plan gating, file intake, the remote service seam,
//! toasts, the lopdf compression fallback and the view-model the DOM
//! renderer paints from.
//!
//! The `App` controller ties these together. Browser bindings live in the
//! `pdfsmaller-wasm` crate.

pub mod api;
pub mod app;
pub mod compress;
pub mod config;
pub mod error;
pub mod format;
pub mod intake;
pub mod notify;
pub mod plan;
pub mod result;
pub mod service;
pub mod session;
pub mod state;
pub mod storage;
pub mod tools;
pub mod user;
pub mod view;

pub use api::{ApiClient, ApiRequest, ApiResponse, HttpTransport};
pub use app::{App, AuthKind, CompressJob, CompressRoute, ToolJob};
pub use compress::{
    compress_pdf, CompressionLevel, CompressionPass, CompressionSettings, CompressionStats,
};
pub use config::{ClientConfig, Limits, ToastTiming};
pub use error::{ApiError, AppError, AuthError, CompressError, IntakeError, StorageError};
pub use format::format_file_size;
pub use intake::{FileMeta, IncomingFile, PDF_MIME};
pub use notify::{Notification, NotificationCenter, NotificationLevel, ToastPhase};
pub use plan::{is_pro, Plan};
pub use result::CompressionResult;
pub use service::{AuthSession, DemoService, RemoteService};
pub use session::SessionStore;
pub use state::{AppState, Tab};
pub use storage::{KeyValueStore, MemoryStore};
pub use tools::ToolFeature;
pub use user::{User, UserId};
pub use view::ViewModel;
