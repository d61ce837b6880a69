use chrono::{DateTime, Datelike, Duration, NaiveDate, SecondsFormat, Utc};

use crate::error::{Error, Result};

/// Get the last day of a given month.
pub fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    first_of_next.expect("first day of a month is always valid") - Duration::days(1)
}

/// Midnight UTC on the first day of the given month.
pub fn start_of_month(year: i32, month: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .expect("first day of a month is always valid")
        .and_utc()
}

/// Last millisecond (23:59:59.999 UTC) of the given month.
pub fn end_of_month(year: i32, month: u32) -> DateTime<Utc> {
    last_day_of_month(year, month)
        .and_hms_milli_opt(23, 59, 59, 999)
        .expect("23:59:59.999 is always a valid time")
        .and_utc()
}

/// Year and month of the month preceding the one containing `d`.
pub fn previous_month<D: Datelike>(d: &D) -> (i32, u32) {
    if d.month() == 1 {
        (d.year() - 1, 12)
    } else {
        (d.year(), d.month() - 1)
    }
}

/// Render an instant the way it is stored: fixed-width RFC 3339, millisecond
/// precision, `Z` suffix. Lexicographic order equals chronological order.
pub fn to_iso(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// The current instant in storage form.
pub fn now_iso() -> String {
    to_iso(&Utc::now())
}

/// Parse either a full RFC 3339 timestamp or a bare `YYYY-MM-DD` date
/// (taken as midnight UTC).
pub fn parse_instant(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Ok(t.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| Error::Validation(format!("invalid date or timestamp: {s}")))
}
