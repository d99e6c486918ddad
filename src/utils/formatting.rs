use chrono::DateTime;

/// Format bytes in human-readable format (B, KB, MB, GB, TB)
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

pub fn format_percentage(value: f64) -> String {
    if value.is_finite() {
        format!("{:.0}%", value)
    } else {
        "0%".to_string()
    }
}

/// Clock time (`HH:MM:SS`) of an RFC 3339 timestamp, in the timestamp's own
/// offset. Unparseable input is shown as given.
pub fn format_clock(timestamp: &str) -> String {
    DateTime::parse_from_rfc3339(timestamp.trim())
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|_| timestamp.to_string())
}

/// Truncate to at most `max_len` characters, ending in `...` when cut.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        "...".to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}

/// Source addresses for table cells: strip IPv6 brackets, shorten long ones.
pub fn format_source(addr: &str, max_len: usize) -> String {
    let cleaned = addr.trim().trim_start_matches('[').trim_end_matches(']');
    truncate_string(cleaned, max_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(130), "130 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1048576), "1.00 MB");
    }

    #[test]
    fn test_format_percentage() {
        assert_eq!(format_percentage(66.6), "67%");
        assert_eq!(format_percentage(f64::NAN), "0%");
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock("2024-05-01T10:15:32.120Z"), "10:15:32");
        assert_eq!(format_clock("yesterday"), "yesterday");
    }

    #[test]
    fn test_truncation() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("hello world", 8), "hello...");
        assert_eq!(format_source("[fe80::1ff:fe23:4567:890a]", 12), "fe80::1ff...");
        assert_eq!(format_source("10.0.0.24", 20), "10.0.0.24");
    }
}
