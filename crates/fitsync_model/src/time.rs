//! Timestamp and calendar-date helpers.

use chrono::NaiveDate;

/// Milliseconds since the Unix epoch.
///
/// Remote rows carry their change times in this unit and watermarks are
/// stored in it.
pub type Timestamp = i64;

/// Parses a `YYYY-MM-DD` calendar date.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

/// Extracts the calendar date from an ISO-8601 date-time such as
/// `2024-03-01T07:45:00+01:00`.
///
/// The date part is taken literally (local wall-clock date of the
/// measurement), not converted to UTC.
pub fn date_prefix(value: &str) -> Option<NaiveDate> {
    let date = value.split('T').next()?;
    parse_date(date.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_dates() {
        assert_eq!(
            parse_date("2024-02-29"),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
        assert_eq!(parse_date("2023-02-29"), None);
        assert_eq!(parse_date("yesterday"), None);
    }

    #[test]
    fn date_prefix_keeps_local_date() {
        assert_eq!(
            date_prefix("2024-03-01T23:30:00-05:00"),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert_eq!(
            date_prefix("2024-03-01"),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert_eq!(date_prefix(""), None);
    }
}
