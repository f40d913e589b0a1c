//! Display helpers shared by screens.

use chrono::{DateTime, Utc};

use crate::models::parse_server_timestamp;

/// Upper-cases the first character, leaves the rest alone.
pub fn capitalize_first_letter(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `Oct 16, 2026, 9:30 AM` (UTC).
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.format("%b %-d, %Y, %-I:%M %p").to_string()
}

/// Formats a server timestamp. Accepts RFC 3339 and `YYYY-MM-DD HH:MM:SS`;
/// anything else is returned as given.
pub fn format_date(raw: &str) -> String {
    match parse_server_timestamp(raw) {
        Some(at) => format_timestamp(&at),
        None => raw.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capitalize_first_letter() {
        assert_eq!(capitalize_first_letter("jane doe"), "Jane doe");
        assert_eq!(capitalize_first_letter("émile"), "Émile");
        assert_eq!(capitalize_first_letter(""), "");
    }

    #[test]
    fn test_format_date_variants() {
        assert_eq!(format_date("2026-10-16T09:30:00Z"), "Oct 16, 2026, 9:30 AM");
        assert_eq!(format_date("2026-10-16T10:30:00+01:00"), "Oct 16, 2026, 9:30 AM");
        assert_eq!(format_date("2026-01-05 17:04:00"), "Jan 5, 2026, 5:04 PM");
        assert_eq!(format_date("yesterday"), "yesterday");
    }
}
