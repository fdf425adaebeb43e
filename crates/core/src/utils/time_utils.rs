use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Formats accepted for upstream date strings, tried in order after RFC 3339.
const NAIVE_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Current UTC time as a naive timestamp (the storage representation).
pub fn now_naive() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Parses a date or datetime string in any of the shapes the catalog API
/// has been observed to send. Offsets are normalized to UTC; bare dates
/// resolve to midnight.
///
/// Returns `None` for empty or unparseable input.
pub fn parse_flexible_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc).naive_utc());
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
