//! Text utilities for TUI rendering.

use chrono::{DateTime, Duration, Utc};
use unicode_width::UnicodeWidthChar;

/// Truncate a string to fit within a given width, adding ellipsis if needed.
pub fn truncate(text: &str, max_width: usize) -> String {
    if max_width < 3 {
        return text.chars().take(max_width).collect();
    }

    let total: usize = text
        .chars()
        .map(|ch| UnicodeWidthChar::width(ch).unwrap_or(1))
        .sum();
    if total <= max_width {
        return text.to_string();
    }

    let mut width = 0;
    let mut result = String::new();

    for ch in text.chars() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(1);
        if width + ch_width > max_width - 3 {
            break;
        }
        result.push(ch);
        width += ch_width;
    }

    result.push_str("...");
    result
}

/// Format a duration in human-readable form.
pub fn format_duration(duration: Duration) -> String {
    let seconds = duration.num_seconds().max(0);
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    }
}

/// Format an optional timestamp as `MM/DD HH:MM:SS`, or a dash.
pub fn format_timestamp(ts: Option<DateTime<Utc>>) -> String {
    match ts {
        Some(ts) => ts.format("%m/%d %H:%M:%S").to_string(),
        None => "-".to_string(),
    }
}

/// Last `count` lines of a text buffer.
pub fn tail_lines(text: &str, count: usize) -> Vec<&str> {
    let lines: Vec<&str> = text.lines().collect();
    let skip = lines.len().saturating_sub(count);
    lines[skip..].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Hello world", 8), "Hello...");
        assert_eq!(truncate("Hi", 10), "Hi");
        assert_eq!(truncate("exactly8", 8), "exactly8");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::seconds(30)), "30s");
        assert_eq!(format_duration(Duration::seconds(90)), "1m 30s");
        assert_eq!(format_duration(Duration::seconds(3700)), "1h 1m");
        assert_eq!(format_duration(Duration::seconds(-5)), "0s");
    }

    #[test]
    fn test_format_timestamp() {
        let ts = Utc.with_ymd_and_hms(2019, 4, 1, 12, 30, 5).unwrap();
        assert_eq!(format_timestamp(Some(ts)), "04/01 12:30:05");
        assert_eq!(format_timestamp(None), "-");
    }

    #[test]
    fn test_tail_lines() {
        assert_eq!(tail_lines("a\nb\nc\n", 2), vec!["b", "c"]);
        assert_eq!(tail_lines("a", 5), vec!["a"]);
        assert!(tail_lines("", 3).is_empty());
    }
}
