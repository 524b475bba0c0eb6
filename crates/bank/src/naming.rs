//! File naming shared by exports and persisted sync state

use chrono::{DateTime, NaiveDateTime, Utc};

/// Sortable UTC timestamp format embedded in output file names
pub const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Render a run timestamp such that lexical order equals chronological order
pub fn timestamp_for_filename(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Check that a file name fragment is a timestamp produced by [`timestamp_for_filename`]
pub fn is_filename_timestamp(value: &str) -> bool {
    value.len() == 16 && NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).is_ok()
}

/// Replace every run of characters outside `[A-Za-z0-9._-]` with `_`
pub fn safe_filename_component(value: &str) -> String {
    let mut cleaned = String::with_capacity(value.len());
    let mut in_run = false;
    for ch in value.trim().chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-') {
            cleaned.push(ch);
            in_run = false;
        } else if !in_run {
            cleaned.push('_');
            in_run = true;
        }
    }
    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_format() {
        let at = Utc.with_ymd_and_hms(2026, 2, 15, 7, 8, 9).unwrap();
        let stamp = timestamp_for_filename(at);
        assert_eq!(stamp, "20260215T070809Z");
        assert!(is_filename_timestamp(&stamp));
    }

    #[test]
    fn test_lexical_order_is_chronological() {
        let earlier = timestamp_for_filename(Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 59).unwrap());
        let later = timestamp_for_filename(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
        assert!(earlier < later);
    }

    #[test]
    fn test_rejects_non_timestamps() {
        assert!(!is_filename_timestamp("x_20260215T070809Z"));
        assert!(!is_filename_timestamp("20260215-070809"));
        assert!(!is_filename_timestamp(""));
    }

    #[test]
    fn test_safe_filename_component() {
        assert_eq!(safe_filename_component("ins_109511"), "ins_109511");
        assert_eq!(safe_filename_component("a/b c//d"), "a_b_c_d");
        assert_eq!(safe_filename_component("  "), "unknown");
    }
}
