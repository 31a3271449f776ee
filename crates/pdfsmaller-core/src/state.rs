//! In-memory application state for one page session

use crate::compress::CompressionSettings;
use crate::intake::IncomingFile;
use crate::result::CompressionResult;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tab {
    Compress,
    Convert,
    Ocr,
    AiTools,
    Pricing,
}

impl Tab {
    pub const ALL: [Tab; 5] = [Tab::Compress, Tab::Convert, Tab::Ocr, Tab::AiTools, Tab::Pricing];

    /// Element-id prefix used by the page, e.g. `compressTab`
    pub fn key(&self) -> &'static str {
        match self {
            Tab::Compress => "compress",
            Tab::Convert => "convert",
            Tab::Ocr => "ocr",
            Tab::AiTools => "ai_tools",
            Tab::Pricing => "pricing",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Tab::ALL.into_iter().find(|t| t.key() == key)
    }

    pub fn requires_pro(&self) -> bool {
        matches!(self, Tab::Convert | Tab::Ocr | Tab::AiTools)
    }
}

#[derive(Debug)]
pub struct AppState {
    pub current_tab: Tab,
    pub selected_file: Option<IncomingFile>,
    /// Ordered, unique by (name, size)
    pub bulk_files: Vec<IncomingFile>,
    pub bulk_mode: bool,
    pub server_processing: bool,
    pub settings: CompressionSettings,
    pub is_processing: bool,
    /// Percent, `None` while the bar is hidden
    pub progress: Option<u8>,
    pub results: HashMap<Tab, CompressionResult>,
    pub started_at_ms: Option<f64>,
    /// Bumped whenever in-flight work is abandoned, so late outcomes can be told apart
    pub generation: u64,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            current_tab: Tab::Compress,
            selected_file: None,
            bulk_files: Vec::new(),
            bulk_mode: false,
            server_processing: false,
            settings: CompressionSettings::default(),
            is_processing: false,
            progress: None,
            results: HashMap::new(),
            started_at_ms: None,
            generation: 0,
        }
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Files the next action on the current mode would process
    pub fn active_files(&self) -> Vec<&IncomingFile> {
        if self.bulk_mode {
            self.bulk_files.iter().collect()
        } else {
            self.selected_file.iter().collect()
        }
    }

    pub fn has_files(&self) -> bool {
        if self.bulk_mode {
            !self.bulk_files.is_empty()
        } else {
            self.selected_file.is_some()
        }
    }

    pub fn result(&self, tab: Tab) -> Option<&CompressionResult> {
        self.results.get(&tab)
    }

    /// "New file": drop inputs and output but keep the tab and settings
    pub fn clear_work(&mut self) {
        self.selected_file = None;
        self.bulk_files.clear();
        self.results.clear();
        self.progress = None;
        self.is_processing = false;
        self.started_at_ms = None;
        self.server_processing = false;
        self.generation += 1;
    }

    /// Wholesale reset, used on logout
    pub fn reset(&mut self) {
        *self = Self {
            generation: self.generation + 1,
            ..Self::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::PDF_MIME;

    #[test]
    fn test_tab_keys_round_trip() {
        for tab in Tab::ALL {
            assert_eq!(Tab::from_key(tab.key()), Some(tab));
        }
        assert_eq!(Tab::from_key("esign"), None);
    }

    #[test]
    fn test_tool_tabs_require_pro() {
        assert!(!Tab::Compress.requires_pro());
        assert!(!Tab::Pricing.requires_pro());
        assert!(Tab::Ocr.requires_pro());
    }

    #[test]
    fn test_active_files_follow_mode() {
        let mut state = AppState::new();
        state.selected_file = Some(IncomingFile::new("one.pdf", PDF_MIME, vec![1]));
        state.bulk_files = vec![
            IncomingFile::new("a.pdf", PDF_MIME, vec![1]),
            IncomingFile::new("b.pdf", PDF_MIME, vec![2]),
        ];

        assert_eq!(state.active_files().len(), 1);
        state.bulk_mode = true;
        assert_eq!(state.active_files().len(), 2);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut state = AppState::new();
        state.current_tab = Tab::Pricing;
        state.bulk_mode = true;
        state.is_processing = true;
        state.reset();
        assert_eq!(state.current_tab, Tab::Compress);
        assert!(!state.bulk_mode);
        assert!(!state.is_processing);
    }

    #[test]
    fn test_abandoning_work_advances_generation() {
        let mut state = AppState::new();
        let start = state.generation;
        state.clear_work();
        assert_eq!(state.generation, start + 1);
        state.reset();
        assert_eq!(state.generation, start + 2);
    }
}
