//! Timestamp parsing, conversion and display helpers
//!
//! The API speaks ISO 8601 in UTC, while the entry form edits local
//! `YYYY-MM-DDTHH:MM` values. These helpers convert between the two and
//! produce the labels shown in lists.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};

/// Format used by the form's date/time fields
pub const LOCAL_INPUT_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Naive layouts accepted as local time, tried in order
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parses an RFC 3339 timestamp or a naive datetime in `tz`
pub fn parse_timestamp_in<Tz: TimeZone>(value: &str, tz: &Tz) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS.iter().find_map(|format| {
        let naive = NaiveDateTime::parse_from_str(value, format).ok()?;
        tz.from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
    })
}

/// Parses an RFC 3339 timestamp or a naive local datetime
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    parse_timestamp_in(value, &Local)
}

/// Formats the time between `start` and `end` as "1h 30m" or "45m"
///
/// Only whole minutes count. Zero, negative and unparseable ranges all
/// render as "0m".
pub fn format_duration(start: &str, end: &str) -> String {
    let minutes = match (parse_timestamp(start), parse_timestamp(end)) {
        (Some(start), Some(end)) => (end - start).num_minutes(),
        _ => 0,
    };
    format_minutes(minutes)
}

/// Formats a whole-minute count as "1h 30m" or "45m"
pub fn format_minutes(minutes: i64) -> String {
    if minutes <= 0 {
        return "0m".to_string();
    }
    let hours = minutes / 60;
    let rest = minutes % 60;
    if hours > 0 {
        format!("{}h {}m", hours, rest)
    } else {
        format!("{}m", rest)
    }
}

/// Returns true when `end` is strictly after `start`
///
/// Unparseable values never form a valid range.
pub fn is_valid_date_range(start: &str, end: &str) -> bool {
    match (parse_timestamp(start), parse_timestamp(end)) {
        (Some(start), Some(end)) => end > start,
        _ => false,
    }
}

/// Converts an ISO 8601 timestamp to a `YYYY-MM-DDTHH:MM` value in `tz`
pub fn to_datetime_local_in<Tz: TimeZone>(iso: &str, tz: &Tz) -> Option<String>
where
    Tz::Offset: std::fmt::Display,
{
    let dt = parse_timestamp_in(iso, tz)?;
    Some(dt.with_timezone(tz).format(LOCAL_INPUT_FORMAT).to_string())
}

/// Converts an ISO 8601 timestamp to a local `YYYY-MM-DDTHH:MM` value
pub fn to_datetime_local(iso: &str) -> Option<String> {
    to_datetime_local_in(iso, &Local)
}

/// Converts a `YYYY-MM-DDTHH:MM` value in `tz` to ISO 8601 UTC
pub fn to_iso_string_in<Tz: TimeZone>(local: &str, tz: &Tz) -> Option<String> {
    let dt = parse_timestamp_in(local, tz)?;
    Some(dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
}

/// Converts a local `YYYY-MM-DDTHH:MM` value to ISO 8601 UTC
///
/// e.g. `2024-01-15T09:00` in UTC+1 becomes `2024-01-15T08:00:00.000Z`
pub fn to_iso_string(local: &str) -> Option<String> {
    to_iso_string_in(local, &Local)
}

/// Formats a timestamp for tables as "Jan 15, 2024, 9:00 AM" in `tz`
///
/// Unparseable input is returned unchanged.
pub fn format_date_time_in<Tz: TimeZone>(iso: &str, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    match parse_timestamp_in(iso, tz) {
        Some(dt) => dt
            .with_timezone(tz)
            .format("%b %-d, %Y, %-I:%M %p")
            .to_string(),
        None => iso.to_string(),
    }
}

/// Formats a timestamp for tables as "Jan 15, 2024, 9:00 AM" in local time
pub fn format_date_time(iso: &str) -> String {
    format_date_time_in(iso, &Local)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    #[test]
    fn test_duration_hours_and_minutes() {
        assert_eq!(
            format_duration("2024-01-15T09:00:00Z", "2024-01-15T10:30:00Z"),
            "1h 30m"
        );
    }

    #[test]
    fn test_duration_minutes_only() {
        assert_eq!(
            format_duration("2024-01-15T09:00:00Z", "2024-01-15T09:45:00Z"),
            "45m"
        );
    }

    #[test]
    fn test_duration_whole_hours_keep_minutes() {
        assert_eq!(
            format_duration("2024-01-15T09:00:00Z", "2024-01-15T12:00:00Z"),
            "3h 0m"
        );
    }

    #[test]
    fn test_duration_negative_is_zero() {
        assert_eq!(
            format_duration("2024-01-15T10:00:00Z", "2024-01-15T09:00:00Z"),
            "0m"
        );
    }

    #[test]
    fn test_duration_equal_is_zero() {
        assert_eq!(
            format_duration("2024-01-15T09:00:00Z", "2024-01-15T09:00:00Z"),
            "0m"
        );
    }

    #[test]
    fn test_duration_truncates_partial_minutes() {
        assert_eq!(
            format_duration("2024-01-15T09:00:00Z", "2024-01-15T09:01:59Z"),
            "1m"
        );
        assert_eq!(
            format_duration("2024-01-15T09:00:00Z", "2024-01-15T09:00:30Z"),
            "0m"
        );
    }

    #[test]
    fn test_duration_unparseable_is_zero() {
        assert_eq!(format_duration("garbage", "2024-01-15T09:00:00Z"), "0m");
    }

    #[test]
    fn test_valid_range_requires_end_after_start() {
        assert!(is_valid_date_range("2024-01-15T09:00:00Z", "2024-01-15T09:01:00Z"));
        assert!(!is_valid_date_range("2024-01-15T09:00:00Z", "2024-01-15T09:00:00Z"));
        assert!(!is_valid_date_range("2024-01-15T10:00:00Z", "2024-01-15T09:00:00Z"));
    }

    #[test]
    fn test_valid_range_across_midnight() {
        assert!(is_valid_date_range("2024-01-15T23:00", "2024-01-16T01:00"));
        assert!(!is_valid_date_range("2024-01-15T23:00", "2024-01-15T01:00"));
    }

    #[test]
    fn test_valid_range_rejects_empty_values() {
        assert!(!is_valid_date_range("", "2024-01-15T09:00"));
        assert!(!is_valid_date_range("2024-01-15T09:00", ""));
    }

    #[test]
    fn test_to_datetime_local_in_offset() {
        let tz = FixedOffset::east_opt(3600).unwrap();
        assert_eq!(
            to_datetime_local_in("2024-01-15T09:00:00.000Z", &tz).as_deref(),
            Some("2024-01-15T10:00")
        );
    }

    #[test]
    fn test_to_iso_string_in_offset() {
        let tz = FixedOffset::east_opt(3600).unwrap();
        assert_eq!(
            to_iso_string_in("2024-01-15T10:00", &tz).as_deref(),
            Some("2024-01-15T09:00:00.000Z")
        );
    }

    #[test]
    fn test_local_round_trip_preserves_minute() {
        let iso = "2024-06-01T14:25:00.000Z";
        let local = to_datetime_local(iso).expect("should convert to local");
        assert_eq!(to_iso_string(&local).as_deref(), Some(iso));
    }

    #[test]
    fn test_to_iso_string_rejects_garbage() {
        assert!(to_iso_string("not a date").is_none());
        assert!(to_iso_string("").is_none());
    }

    #[test]
    fn test_format_date_time_in_utc() {
        assert_eq!(
            format_date_time_in("2024-01-15T09:00:00.000Z", &Utc),
            "Jan 15, 2024, 9:00 AM"
        );
        assert_eq!(
            format_date_time_in("2024-12-03T17:05:00Z", &Utc),
            "Dec 3, 2024, 5:05 PM"
        );
    }

    #[test]
    fn test_format_date_time_passes_through_garbage() {
        assert_eq!(format_date_time("unknown"), "unknown");
    }

    #[test]
    fn test_format_minutes() {
        assert_eq!(format_minutes(0), "0m");
        assert_eq!(format_minutes(59), "59m");
        assert_eq!(format_minutes(60), "1h 0m");
        assert_eq!(format_minutes(135), "2h 15m");
    }
}
