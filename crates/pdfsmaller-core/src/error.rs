use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to write {key}: {reason}")]
    Write { key: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Why a file was refused at intake
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntakeError {
    #[error("Please select a valid PDF file.")]
    NotPdf { mime_type: String },

    #[error("File size must be less than {limit_label}.")]
    TooLarge {
        size: u64,
        limit: u64,
        limit_label: String,
    },

    #[error("Bulk processing is a Pro feature.")]
    BulkRequiresPro,

    #[error("Bulk uploads are limited to {max} files.")]
    TooManyFiles { max: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Non-2xx response, carrying the best message available
    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Failed to build request: {0}")]
    Request(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid credentials.")]
    InvalidCredentials,

    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompressError {
    #[error("Failed to parse PDF: {0}")]
    Parse(String),

    #[error("Failed to save PDF: {0}")]
    Save(String),

    #[error("Failed to compress PDF on server: {0}")]
    Server(#[from] ApiError),
}

/// Top-level error for controller operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Intake(#[from] IntakeError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Compress(#[from] CompressError),

    #[error("This is a Pro feature. Please upgrade.")]
    ProRequired,

    #[error("Sign in to manage your subscription.")]
    NotSignedIn,

    #[error("Another operation is still running.")]
    Busy,

    #[error("No file selected.")]
    NoFile,

    #[error("The page was reset before the operation finished.")]
    Superseded,
}
