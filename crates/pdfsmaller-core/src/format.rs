//! Display formatting for sizes, percentages and durations

const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Human-readable size with at most two decimals, trailing zeros trimmed
///
/// `0` -> "0 Bytes", `1536` -> "1.5 KB", `1048576` -> "1 MB"
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut unit = 0;
    let mut scale = 1u64;
    while unit + 1 < UNITS.len() && bytes >= scale * 1024 {
        scale *= 1024;
        unit += 1;
    }

    let value = format!("{:.2}", bytes as f64 / scale as f64);
    let value = if value.contains('.') {
        value.trim_end_matches('0').trim_end_matches('.')
    } else {
        value.as_str()
    };
    format!("{} {}", value, UNITS[unit])
}

pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}

pub fn format_seconds(ms: u64) -> String {
    format!("{:.1}s", ms as f64 / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(500), "500 Bytes");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(1048576), "1 MB");
        assert_eq!(format_file_size(2621440), "2.5 MB");
        assert_eq!(format_file_size(1234567), "1.18 MB");
    }

    #[test]
    fn test_format_file_size_caps_at_gb() {
        assert_eq!(format_file_size(2 * 1024 * 1024 * 1024 * 1024), "2048 GB");
    }

    #[test]
    fn test_format_percent_and_seconds() {
        assert_eq!(format_percent(42.26), "42.3%");
        assert_eq!(format_percent(0.0), "0.0%");
        assert_eq!(format_seconds(1240), "1.2s");
        assert_eq!(format_seconds(0), "0.0s");
    }
}
