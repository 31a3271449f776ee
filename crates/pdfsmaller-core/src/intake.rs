//! File intake validation
//!
//! Checks are on the reported metadata only: MIME type must be exactly
//! `application/pdf` and the size must fit the tier's ceiling. Bytes are
//! not sniffed here; a mislabelled file fails later when it is parsed.

use crate::error::IntakeError;
use crate::format::format_file_size;

pub const PDF_MIME: &str = "application/pdf";

/// What the browser reports about a picked or dropped file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMeta {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
}

impl FileMeta {
    pub fn new(name: &str, mime_type: &str, size: u64) -> Self {
        Self {
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            size,
        }
    }

    /// Bulk dedup key; not a content hash
    pub fn dedup_key(&self) -> (&str, u64) {
        (&self.name, self.size)
    }
}

/// A validated-or-not file together with its contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingFile {
    pub meta: FileMeta,
    pub bytes: Vec<u8>,
}

impl IncomingFile {
    pub fn new(name: &str, mime_type: &str, bytes: Vec<u8>) -> Self {
        Self {
            meta: FileMeta::new(name, mime_type, bytes.len() as u64),
            bytes,
        }
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    pub fn size(&self) -> u64 {
        self.meta.size
    }
}

pub fn validate(meta: &FileMeta, ceiling: u64) -> Result<(), IntakeError> {
    if meta.mime_type != PDF_MIME {
        return Err(IntakeError::NotPdf {
            mime_type: meta.mime_type.clone(),
        });
    }

    if meta.size > ceiling {
        return Err(IntakeError::TooLarge {
            size: meta.size,
            limit: ceiling,
            limit_label: format_file_size(ceiling),
        });
    }

    Ok(())
}

/// Outcome of appending a batch to the bulk list
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BulkIntake {
    pub added: usize,
    pub duplicates: usize,
    pub rejected: Vec<(String, IntakeError)>,
}

/// Append `incoming` to `existing`, skipping invalid files and (name, size) duplicates
///
/// Fails without touching `existing` if the batch would exceed `max_files`.
pub fn append_bulk(
    existing: &mut Vec<IncomingFile>,
    incoming: Vec<IncomingFile>,
    ceiling: u64,
    max_files: usize,
) -> Result<BulkIntake, IntakeError> {
    let mut outcome = BulkIntake::default();
    let mut accepted: Vec<IncomingFile> = Vec::new();

    for file in incoming {
        if let Err(e) = validate(&file.meta, ceiling) {
            outcome.rejected.push((file.meta.name.clone(), e));
            continue;
        }

        let key = file.meta.dedup_key();
        let seen = existing
            .iter()
            .chain(accepted.iter())
            .any(|f| f.meta.dedup_key() == key);
        if seen {
            outcome.duplicates += 1;
            continue;
        }

        accepted.push(file);
    }

    if existing.len() + accepted.len() > max_files {
        return Err(IntakeError::TooManyFiles { max: max_files });
    }

    outcome.added = accepted.len();
    existing.extend(accepted);
    Ok(outcome)
}
