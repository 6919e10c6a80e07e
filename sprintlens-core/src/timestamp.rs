//! Tracker timestamp parsing.
//!
//! Jira emits `2024-05-01T10:15:30.123+0000`: fractional seconds and an offset
//! without a colon. Other sources (and fixtures) use RFC 3339. Both are
//! accepted, with or without fractional seconds, and normalised to UTC.

use crate::Timestamp;
use chrono::{DateTime, Utc};

const TRACKER_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%dT%H:%M:%S%z"];

/// Parse a tracker timestamp into UTC.
///
/// Returns the parser's message on failure so callers can record it.
pub fn parse_tracker_timestamp(value: &str) -> Result<Timestamp, String> {
    let trimmed = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }

    let mut last_err = String::from("empty timestamp");
    for format in TRACKER_FORMATS {
        match DateTime::parse_from_str(trimmed, format) {
            Ok(parsed) => return Ok(parsed.with_timezone(&Utc)),
            Err(e) => last_err = e.to_string(),
        }
    }
    Err(last_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_parses_jira_format_with_millis_and_offset() {
        let ts = parse_tracker_timestamp("2024-05-01T10:15:30.123+0000").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 5, 1, 10, 15, 30).unwrap() + chrono::Duration::milliseconds(123));
    }

    #[test]
    fn test_honours_non_utc_offset() {
        let ts = parse_tracker_timestamp("2024-05-01T10:15:30.000+0200").unwrap();
        assert_eq!(ts.hour(), 8);
    }

    #[test]
    fn test_parses_rfc3339() {
        let zulu = parse_tracker_timestamp("2024-05-01T10:15:30Z").unwrap();
        let colon = parse_tracker_timestamp("2024-05-01T10:15:30+00:00").unwrap();
        assert_eq!(zulu, colon);
    }

    #[test]
    fn test_parses_without_fraction() {
        let ts = parse_tracker_timestamp("2024-05-01T10:15:30-0500").unwrap();
        assert_eq!(ts.hour(), 15);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_tracker_timestamp("not-a-date").is_err());
        assert!(parse_tracker_timestamp("").is_err());
        assert!(parse_tracker_timestamp("2024-05-01").is_err());
    }
}
