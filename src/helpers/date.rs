//! Date helper functions

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone};
use chrono_tz::Tz;

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

const OFFSET_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%z",
    "%Y-%m-%d %H:%M%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];

/// Parse a metadata date string
///
/// Strings carrying an offset keep it; naive dates and datetimes are
/// interpreted in `tz`.
pub fn parse_date(s: &str, tz: Tz) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(localize(naive, tz));
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(localize(d.and_hms_opt(0, 0, 0)?, tz));
        }
    }

    None
}

fn localize(naive: NaiveDateTime, tz: Tz) -> DateTime<FixedOffset> {
    // Times skipped by a DST jump have no local mapping; read them as UTC
    let local = tz
        .from_local_datetime(&naive)
        .earliest()
        .unwrap_or_else(|| tz.from_utc_datetime(&naive));
    local.with_timezone(&local.offset().fix())
}

/// Format a date with a strftime pattern
pub fn format_date<Tz2: TimeZone>(date: &DateTime<Tz2>, format: &str) -> String
where
    Tz2::Offset: std::fmt::Display,
{
    date.format(format).to_string()
}

/// Format a date for RSS `pubDate`
pub fn date_rfc2822<Tz2: TimeZone>(date: &DateTime<Tz2>) -> String
where
    Tz2::Offset: std::fmt::Display,
{
    date.to_rfc2822()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_only_in_timezone() {
        let dt = parse_date("2018-01-01", chrono_tz::Europe::Paris).unwrap();
        assert_eq!(dt.to_rfc3339(), "2018-01-01T00:00:00+01:00");
    }

    #[test]
    fn test_parse_datetime_formats() {
        let dt = parse_date("2018-07-14 10:30", chrono_tz::UTC).unwrap();
        assert_eq!(dt.to_rfc3339(), "2018-07-14T10:30:00+00:00");

        let dt = parse_date("2018/07/14 10:30:05", chrono_tz::UTC).unwrap();
        assert_eq!(dt.to_rfc3339(), "2018-07-14T10:30:05+00:00");
    }

    #[test]
    fn test_parse_keeps_explicit_offset() {
        let dt = parse_date("2018-01-01T12:00:00+05:00", chrono_tz::Europe::Paris).unwrap();
        assert_eq!(dt.to_rfc3339(), "2018-01-01T12:00:00+05:00");
    }

    #[test]
    fn test_parse_garbage() {
        assert!(parse_date("yesterday", chrono_tz::UTC).is_none());
        assert!(parse_date("2018-13-45", chrono_tz::UTC).is_none());
    }

    #[test]
    fn test_format_date() {
        let dt = parse_date("2018-01-01", chrono_tz::UTC).unwrap();
        assert_eq!(format_date(&dt, "%a %d %B %Y"), "Mon 01 January 2018");
        let rfc = date_rfc2822(&dt);
        assert!(rfc.starts_with("Mon, "));
        assert!(rfc.ends_with("Jan 2018 00:00:00 +0000"));
    }
}
