use time::format_description::BorrowedFormatItem;
use time::macros::{datetime, format_description};
use time::{Date, Duration, PrimitiveDateTime};

// Tried in order after the offset has been stripped. The first successful parse wins.
const DATETIME_FORMATS: &[&[BorrowedFormatItem<'static>]] = &[
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]"),
    format_description!(
        "[month padding:none]/[day padding:none]/[year] [hour padding:none]:[minute]:[second]"
    ),
    format_description!("[month padding:none]/[day padding:none]/[year] [hour padding:none]:[minute]"),
];

const DATE_ONLY_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Day zero of the spreadsheet serial-date system (1900 date system, leap-bug adjusted).
const SPREADSHEET_EPOCH: PrimitiveDateTime = datetime!(1899-12-30 0:00);

/// Drop a trailing `Z` or `±HH:MM` offset. The wall-clock value is kept as-is.
fn strip_offset(raw: &str) -> &str {
    if let Some(stripped) = raw.strip_suffix('Z').or_else(|| raw.strip_suffix('z')) {
        return stripped;
    }
    let bytes = raw.as_bytes();
    if bytes.len() > 6 {
        let tail = &bytes[bytes.len() - 6..];
        let is_offset = (tail[0] == b'+' || tail[0] == b'-')
            && tail[1].is_ascii_digit()
            && tail[2].is_ascii_digit()
            && tail[3] == b':'
            && tail[4].is_ascii_digit()
            && tail[5].is_ascii_digit();
        // A date-only value ends in "-MM-DD", which never contains ':'.
        if is_offset && raw[..raw.len() - 6].contains(':') {
            return &raw[..raw.len() - 6];
        }
    }
    raw
}

/// Parse a timestamp string into a naive datetime.
///
/// Unparseable input yields `None`; a single bad cell never fails the row.
pub fn parse_timestamp_text(raw: &str) -> Option<PrimitiveDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let candidate = strip_offset(trimmed);

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = PrimitiveDateTime::parse(candidate, fmt) {
            return Some(dt);
        }
    }

    Date::parse(candidate, DATE_ONLY_FORMAT)
        .ok()
        .map(|d| d.midnight())
}

/// Convert a spreadsheet serial date (days since 1899-12-30, fractional time) to a datetime.
pub fn serial_to_datetime(serial: f64) -> Option<PrimitiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let secs = (serial * 86_400.0).round();
    if secs > i64::MAX as f64 {
        return None;
    }
    SPREADSHEET_EPOCH.checked_add(Duration::seconds(secs as i64))
}

/// Convert a spreadsheet serial duration (fractional days) to elapsed time.
pub fn serial_to_duration(serial: f64) -> Option<Duration> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let secs = (serial * 86_400.0).round();
    if secs > i64::MAX as f64 {
        return None;
    }
    Some(Duration::seconds(secs as i64))
}

/// Parse an `H:MM` / `HH:MM` elapsed time. Minutes must be exactly two digits.
pub fn parse_duration_text(raw: &str) -> Option<Duration> {
    let (hours, minutes) = raw.trim().split_once(':')?;
    if hours.is_empty() || !hours.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if minutes.len() != 2 || !minutes.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i64 = hours.parse().ok()?;
    let minutes: i64 = minutes.parse().ok()?;
    let secs = hours.checked_mul(3600)?.checked_add(minutes * 60)?;
    Some(Duration::seconds(secs))
}

/// Whole minutes of an elapsed time, truncated toward zero.
pub fn duration_minutes(d: Duration) -> i64 {
    d.whole_minutes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn iso_offsets_are_stripped_not_applied() {
        assert_eq!(
            parse_timestamp_text("2025-08-04T13:45:00Z"),
            Some(datetime!(2025-08-04 13:45))
        );
        assert_eq!(
            parse_timestamp_text("2025-08-04T13:45:00+05:00"),
            Some(datetime!(2025-08-04 13:45))
        );
        assert_eq!(
            parse_timestamp_text("2025-08-04T13:45:00-05:00"),
            Some(datetime!(2025-08-04 13:45))
        );
    }

    #[test]
    fn accepts_allowlisted_patterns() {
        assert_eq!(
            parse_timestamp_text("2025-08-04 13:45:10"),
            Some(datetime!(2025-08-04 13:45:10))
        );
        assert_eq!(
            parse_timestamp_text("2025-08-04 13:45:10.250"),
            Some(datetime!(2025-08-04 13:45:10.25))
        );
        assert_eq!(
            parse_timestamp_text("8/4/2025 9:05"),
            Some(datetime!(2025-08-04 9:05))
        );
        assert_eq!(
            parse_timestamp_text("08/04/2025 09:05:30"),
            Some(datetime!(2025-08-04 9:05:30))
        );
        assert_eq!(
            parse_timestamp_text("2025-08-04"),
            Some(datetime!(2025-08-04 0:00))
        );
    }

    #[test]
    fn garbage_timestamps_are_absent() {
        for raw in ["", "   ", "not-a-date", "2025/08/04 10:00", "Aug 4, 2025", "2025-13-01"] {
            assert_eq!(parse_timestamp_text(raw), None, "input {raw:?}");
        }
    }

    #[test]
    fn duration_text_parses_to_minutes() {
        let d = parse_duration_text("1:07").expect("duration");
        assert_eq!(duration_minutes(d), 67);
        assert_eq!(parse_duration_text("0:41").map(duration_minutes), Some(41));
        assert_eq!(parse_duration_text("12:30").map(duration_minutes), Some(750));
        assert_eq!(parse_duration_text(" 2:00 ").map(duration_minutes), Some(120));
    }

    #[test]
    fn malformed_durations_are_absent() {
        for raw in ["", "1:7", "1:070", ":07", "abc", "1.5", "-1:00", "1:07:00"] {
            assert_eq!(parse_duration_text(raw), None, "input {raw:?}");
        }
    }

    #[test]
    fn serial_dates_follow_spreadsheet_epoch() {
        // 45000 = 2023-03-15; .5 = noon.
        assert_eq!(serial_to_datetime(45000.5), Some(datetime!(2023-03-15 12:00)));
        assert_eq!(serial_to_datetime(-1.0), None);
        assert_eq!(serial_to_duration(1.0 / 24.0).map(duration_minutes), Some(60));
    }
}
