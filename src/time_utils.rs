//! Shared helpers for date/time formatting.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
///
/// Microsecond precision keeps the strings fixed-width so that
/// lexicographic ordering matches chronological ordering, which the
/// feed cursor queries rely on.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Current UTC time as an RFC3339 string.
pub fn now_rfc3339() -> String {
    format_utc_rfc3339(Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn rfc3339_is_fixed_width_and_ordered() {
        let early = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 1).unwrap();

        let a = format_utc_rfc3339(early);
        let b = format_utc_rfc3339(late);

        assert_eq!(a.len(), b.len());
        assert!(a < b);
    }
}
