use chrono::{DateTime, NaiveDate};

pub const PLACEHOLDER: &str = "-";

/// Escapes text for element content and double-quoted attributes.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escaped value, or the placeholder dash when missing or blank.
pub fn or_dash<T: ToString>(value: Option<T>) -> String {
    match value.map(|v| v.to_string()) {
        Some(s) if !s.trim().is_empty() => escape(&s),
        _ => PLACEHOLDER.to_string(),
    }
}

/// Cuts on a char boundary and appends an ellipsis.
pub fn truncate(input: &str, max_chars: usize) -> String {
    let trimmed = input.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(max_chars).collect();
    format!("{}…", cut.trim_end())
}

/// `YYYY-MM-DD` for RFC 3339 timestamps and plain dates; anything else is
/// shown as sent.
pub fn short_date(raw: &str) -> String {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format("%Y-%m-%d").to_string();
    }
    if let Some(prefix) = raw.get(..10) {
        if let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
            return date.format("%Y-%m-%d").to_string();
        }
    }
    raw.to_string()
}

/// "quiz-analytics" -> "Quiz Analytics".
pub fn title_case(identifier: &str) -> String {
    identifier
        .split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
