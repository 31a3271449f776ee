//! In-browser compression fallback
//!
//! Used when server processing is off. lopdf re-serializes the document
//! after dropping unreferenced objects and flate-compressing streams that
//! are stored raw. Images are not resampled; image quality only matters
//! for the server path.

use crate::error::CompressError;
use lopdf::{Document, Object, ObjectId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const MIN_IMAGE_QUALITY: u8 = 10;
pub const MAX_IMAGE_QUALITY: u8 = 100;
pub const DEFAULT_IMAGE_QUALITY: u8 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    Low,
    #[default]
    Medium,
    High,
    Maximum,
}

impl CompressionLevel {
    /// Unknown labels fall back to the default level
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "low" => CompressionLevel::Low,
            "high" => CompressionLevel::High,
            "maximum" => CompressionLevel::Maximum,
            _ => CompressionLevel::Medium,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CompressionLevel::Low => "low",
            CompressionLevel::Medium => "medium",
            CompressionLevel::High => "high",
            CompressionLevel::Maximum => "maximum",
        }
    }

    pub fn profile(&self) -> CompressionProfile {
        match self {
            CompressionLevel::Low => CompressionProfile {
                compress_streams: true,
                prune_unused: false,
                drop_empty_streams: false,
                renumber: false,
                objects_per_tick: 100,
            },
            CompressionLevel::Medium => CompressionProfile {
                compress_streams: true,
                prune_unused: true,
                drop_empty_streams: false,
                renumber: false,
                objects_per_tick: 100,
            },
            CompressionLevel::High => CompressionProfile {
                compress_streams: true,
                prune_unused: true,
                drop_empty_streams: true,
                renumber: true,
                objects_per_tick: 50,
            },
            CompressionLevel::Maximum => CompressionProfile {
                compress_streams: true,
                prune_unused: true,
                drop_empty_streams: true,
                renumber: true,
                objects_per_tick: 25,
            },
        }
    }
}

/// lopdf tuning flags for one compression level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionProfile {
    pub compress_streams: bool,
    pub prune_unused: bool,
    pub drop_empty_streams: bool,
    pub renumber: bool,
    /// Streams compressed between progress reports
    pub objects_per_tick: usize,
}

/// User-facing compression options, sent as form fields on the server path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionSettings {
    pub level: CompressionLevel,
    pub image_quality: u8,
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            level: CompressionLevel::default(),
            image_quality: DEFAULT_IMAGE_QUALITY,
        }
    }
}

impl CompressionSettings {
    pub fn with_image_quality(mut self, quality: u8) -> Self {
        self.image_quality = quality.clamp(MIN_IMAGE_QUALITY, MAX_IMAGE_QUALITY);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompressionStats {
    pub pruned_objects: usize,
    pub dropped_streams: usize,
    pub compressed_streams: usize,
    /// Output was not smaller, original bytes returned
    pub kept_original: bool,
}

/// Progress percentages reported by [`compress_pdf`]
pub const PROGRESS_LOADED: u8 = 60;
pub const PROGRESS_SAVED: u8 = 80;

/// Re-serialize a PDF with the level's profile
///
/// `progress` receives values in `PROGRESS_LOADED..=PROGRESS_SAVED`. The
/// returned bytes are never larger than the input.
pub fn compress_pdf(
    bytes: &[u8],
    level: CompressionLevel,
    mut progress: impl FnMut(u8),
) -> Result<(Vec<u8>, CompressionStats), CompressError> {
    let mut pass = CompressionPass::start(bytes, level)?;
    progress(PROGRESS_LOADED);
    while !pass.is_done() {
        progress(pass.step());
    }
    let output = pass.finish()?;
    progress(PROGRESS_SAVED);
    Ok(output)
}

/// One compression run split into batches of `objects_per_tick` streams
///
/// Async callers yield to the event loop between [`step`](Self::step)s so
/// the page can repaint.
pub struct CompressionPass<'a> {
    input: &'a [u8],
    level: CompressionLevel,
    profile: CompressionProfile,
    doc: Document,
    pending: Vec<ObjectId>,
    next: usize,
    stats: CompressionStats,
}

impl<'a> CompressionPass<'a> {
    /// Load the document and run the whole-document cleanups
    pub fn start(input: &'a [u8], level: CompressionLevel) -> Result<Self, CompressError> {
        let profile = level.profile();
        let mut stats = CompressionStats::default();

        let mut doc = Document::load_mem(input).map_err(|e| CompressError::Parse(e.to_string()))?;
        if profile.prune_unused {
            stats.pruned_objects = doc.prune_objects().len();
        }
        if profile.drop_empty_streams {
            stats.dropped_streams = doc.delete_zero_length_streams().len();
        }

        let pending = if profile.compress_streams {
            doc.objects
                .iter()
                .filter(|(_, obj)| matches!(obj, Object::Stream(s) if s.allows_compression))
                .map(|(id, _)| *id)
                .collect()
        } else {
            Vec::new()
        };

        Ok(Self {
            input,
            level,
            profile,
            doc,
            pending,
            next: 0,
            stats,
        })
    }

    pub fn is_done(&self) -> bool {
        self.next >= self.pending.len()
    }

    /// Compress the next batch and return the progress reached
    pub fn step(&mut self) -> u8 {
        let end = (self.next + self.profile.objects_per_tick.max(1)).min(self.pending.len());
        for id in &self.pending[self.next..end] {
            if let Some(Object::Stream(stream)) = self.doc.objects.get_mut(id) {
                let had_filter = stream.dict.has(b"Filter");
                if stream.compress().is_ok() && !had_filter && stream.dict.has(b"Filter") {
                    self.stats.compressed_streams += 1;
                }
            }
        }
        self.next = end;
        self.progress()
    }

    /// Stays below `PROGRESS_SAVED` until the document is written
    pub fn progress(&self) -> u8 {
        let span = (PROGRESS_SAVED - PROGRESS_LOADED) as usize;
        let total = self.pending.len().max(1);
        (PROGRESS_LOADED as usize + (self.next * (span - 1)) / total) as u8
    }

    pub fn finish(mut self) -> Result<(Vec<u8>, CompressionStats), CompressError> {
        if self.profile.renumber {
            self.doc.renumber_objects();
        }

        let mut output = Vec::new();
        self.doc
            .save_to(&mut output)
            .map_err(|e| CompressError::Save(e.to_string()))?;

        let label = self.level.label();
        let mut stats = self.stats;
        debug!(
            level = label,
            input = self.input.len(),
            output = output.len(),
            ?stats,
            "client-side compression pass"
        );

        if output.len() >= self.input.len() {
            info!(level = label, "re-serialized PDF was not smaller, keeping original");
            stats.kept_original = true;
            return Ok((self.input.to_vec(), stats));
        }
        Ok((output, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_labels() {
        assert_eq!(CompressionLevel::from_label("maximum"), CompressionLevel::Maximum);
        assert_eq!(CompressionLevel::from_label(" High "), CompressionLevel::High);
        assert_eq!(CompressionLevel::from_label("extreme"), CompressionLevel::Medium);
        assert_eq!(CompressionLevel::Low.label(), "low");
    }

    #[test]
    fn test_profiles_get_stricter() {
        assert!(!CompressionLevel::Low.profile().prune_unused);
        assert!(CompressionLevel::Medium.profile().prune_unused);
        assert!(CompressionLevel::Maximum.profile().renumber);
        assert!(
            CompressionLevel::Maximum.profile().objects_per_tick
                < CompressionLevel::Low.profile().objects_per_tick
        );
    }

    #[test]
    fn test_image_quality_is_clamped() {
        let settings = CompressionSettings::default().with_image_quality(0);
        assert_eq!(settings.image_quality, MIN_IMAGE_QUALITY);
        let settings = CompressionSettings::default().with_image_quality(250);
        assert_eq!(settings.image_quality, MAX_IMAGE_QUALITY);
    }

    #[test]
    fn test_rejects_garbage() {
        let err = compress_pdf(b"definitely not a pdf", CompressionLevel::Low, |_| {}).unwrap_err();
        assert!(matches!(err, CompressError::Parse(_)));
        assert!(CompressionPass::start(b"%PDF-1.7 truncated", CompressionLevel::High).is_err());
    }
}
