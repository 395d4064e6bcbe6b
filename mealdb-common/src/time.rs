//! Timestamp utilities
//!
//! Timestamps are persisted as `YYYY-MM-DD HH:MM:SS` text in UTC so the
//! same column works on both storage engines and sorts lexicographically.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Storage format for all persisted timestamps
pub const DB_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current UTC time formatted for storage
pub fn db_now() -> String {
    format_db_timestamp(&now().naive_utc())
}

/// Format a naive timestamp for storage
pub fn format_db_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(DB_TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored timestamp, `None` if the text is not in storage format
pub fn parse_db_timestamp(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, DB_TIMESTAMP_FORMAT).ok()
}

/// Convert milliseconds to duration
pub fn millis_to_duration(millis: u64) -> std::time::Duration {
    std::time::Duration::from_millis(millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::time::Duration;

    #[test]
    fn test_now_returns_recent_timestamp() {
        let timestamp = now();
        assert!(timestamp.timestamp() > 946_684_800); // 2000-01-01 00:00:00 UTC
        assert!(timestamp.timestamp() < 4_102_444_800); // 2100-01-01 00:00:00 UTC
    }

    #[test]
    fn test_db_timestamp_format() {
        let ts = NaiveDate::from_ymd_opt(2017, 8, 6)
            .unwrap()
            .and_hms_opt(9, 5, 1)
            .unwrap();
        assert_eq!(format_db_timestamp(&ts), "2017-08-06 09:05:01");
        assert_eq!(parse_db_timestamp("2017-08-06 09:05:01"), Some(ts));
    }

    #[test]
    fn test_parse_db_timestamp_rejects_other_formats() {
        assert!(parse_db_timestamp("2017-08-06").is_none());
        assert!(parse_db_timestamp("not a date").is_none());
    }

    #[test]
    fn test_db_now_is_storage_formatted() {
        let text = db_now();
        assert_eq!(text.len(), 19);
        assert!(parse_db_timestamp(&text).is_some());
    }

    #[test]
    fn test_millis_to_duration() {
        assert_eq!(millis_to_duration(0), Duration::ZERO);
        assert_eq!(millis_to_duration(1000), Duration::from_secs(1));
    }
}
