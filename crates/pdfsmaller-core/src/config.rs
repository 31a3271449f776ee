//! Client configuration
//!
//! Every field has a default so the page can pass a partial object (or
//! nothing at all).

use serde::Deserialize;

pub const DEFAULT_API_BASE: &str = "https://api.pdfsmaller.site";

const MB: u64 = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
    pub api_base_url: String,
    /// Use the local demo service instead of the remote API
    pub demo_mode: bool,
    pub limits: Limits,
    pub toast: ToastTiming,
    /// `tracing` level directive, e.g. "info" or "debug"
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE.to_string(),
            demo_mode: false,
            limits: Limits::default(),
            toast: ToastTiming::default(),
            log_level: "info".to_string(),
        }
    }
}

impl ClientConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn demo() -> Self {
        Self {
            demo_mode: true,
            ..Self::default()
        }
    }
}

/// File-size ceilings per tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Limits {
    pub free_single_bytes: u64,
    pub pro_single_bytes: u64,
    pub bulk_file_bytes: u64,
    pub bulk_max_files: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            free_single_bytes: 50 * MB,
            pro_single_bytes: 100 * MB,
            bulk_file_bytes: 100 * MB,
            bulk_max_files: 20,
        }
    }
}

impl Limits {
    pub fn single_ceiling(&self, pro: bool) -> u64 {
        if pro {
            self.pro_single_bytes
        } else {
            self.free_single_bytes
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ToastTiming {
    pub enter_delay_ms: u32,
    pub visible_ms: u32,
    pub transition_ms: u32,
}

impl Default for ToastTiming {
    fn default() -> Self {
        Self {
            enter_delay_ms: 10,
            visible_ms: 4000,
            transition_ms: 300,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_gives_defaults() {
        let config = ClientConfig::from_json("{}").unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.limits.free_single_bytes, 50 * 1024 * 1024);
        assert_eq!(config.toast.visible_ms, 4000);
    }

    #[test]
    fn test_partial_override() {
        let config = ClientConfig::from_json(
            r#"{"apiBaseUrl":"http://localhost:5000","demoMode":true,"toast":{"visibleMs":3000}}"#,
        )
        .unwrap();
        assert_eq!(config.api_base_url, "http://localhost:5000");
        assert!(config.demo_mode);
        assert_eq!(config.toast.visible_ms, 3000);
        assert_eq!(config.toast.transition_ms, 300);
    }

    #[test]
    fn test_single_ceiling_by_tier() {
        let limits = Limits::default();
        assert!(limits.single_ceiling(true) > limits.single_ceiling(false));
    }
}
