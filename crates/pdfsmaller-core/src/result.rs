//! Output of a processing run

/// A finished artifact for one tab
///
/// The reduction is derived from the two sizes on every call and is not
/// stored separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressionResult {
    pub original_size: u64,
    pub compressed_size: u64,
    pub payload: Vec<u8>,
    pub processing_time_ms: u64,
    pub download_name: String,
    pub mime_type: String,
}

impl CompressionResult {
    pub fn new(source_name: &str, original_size: u64, payload: Vec<u8>, processing_time_ms: u64) -> Self {
        Self {
            original_size,
            compressed_size: payload.len() as u64,
            payload,
            processing_time_ms,
            download_name: compressed_file_name(source_name),
            mime_type: crate::intake::PDF_MIME.to_string(),
        }
    }

    pub fn with_download_name(mut self, name: impl Into<String>, mime_type: &str) -> Self {
        self.download_name = name.into();
        self.mime_type = mime_type.to_string();
        self
    }

    /// `(original - compressed) / original * 100`; zero for an empty original
    pub fn reduction_percent(&self) -> f64 {
        reduction_percent(self.original_size, self.compressed_size)
    }

    /// Widths (percent of the larger size) for the before/after comparison bars
    pub fn bar_widths(&self) -> (f64, f64) {
        let max = self.original_size.max(self.compressed_size);
        if max == 0 {
            return (0.0, 0.0);
        }
        (
            self.original_size as f64 / max as f64 * 100.0,
            self.compressed_size as f64 / max as f64 * 100.0,
        )
    }
}

pub fn reduction_percent(original: u64, compressed: u64) -> f64 {
    if original == 0 {
        return 0.0;
    }
    (original as f64 - compressed as f64) / original as f64 * 100.0
}

/// `report.pdf` -> `report_compressed.pdf`
pub fn compressed_file_name(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    match lower.strip_suffix(".pdf") {
        Some(_) => format!("{}_compressed.pdf", &name[..name.len() - 4]),
        None => format!("{}_compressed.pdf", name),
    }
}
