//! Small text formatters for terminal output.

use time::{OffsetDateTime, macros::format_description};

/// `0x1234...abcd` style abbreviation. Short inputs are returned unchanged.
pub fn format_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 10 {
        return address.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

pub fn format_date(at: OffsetDateTime) -> String {
    at.format(format_description!("[month repr:short] [day padding:none], [year]"))
        .unwrap_or_else(|_| at.unix_timestamp().to_string())
}

pub fn format_relative_time(at: OffsetDateTime, now: OffsetDateTime) -> String {
    let seconds = (now - at).whole_seconds().max(0);
    let (value, unit) = match seconds {
        s if s < 60 => return "Just now".to_string(),
        s if s < 3_600 => (s / 60, "minute"),
        s if s < 86_400 => (s / 3_600, "hour"),
        s if s < 2_592_000 => (s / 86_400, "day"),
        s if s < 31_536_000 => (s / 2_592_000, "month"),
        s => (s / 31_536_000, "year"),
    };
    let plural = if value > 1 { "s" } else { "" };
    format!("{value} {unit}{plural} ago")
}

/// Share of positive votes, rounded to a whole percent.
pub fn vote_percentage(positive: u64, total: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    ((positive as f64 / total as f64) * 100.0).round() as u64
}

/// Cut `text` to `max_chars` characters, appending `...` when shortened.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
