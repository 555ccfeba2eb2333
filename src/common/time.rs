//! Timestamp helpers.
//!
//! All persisted timestamps are Unix milliseconds (`i64`); conversion to a
//! display timezone is a presentation concern and stays out of the core.

use chrono::Utc;

/// Current time as Unix milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Render a stored timestamp as RFC 3339 for logs.
pub fn millis_to_rfc3339(millis: i64) -> String {
    chrono::DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| millis.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_is_after_2020() {
        assert!(now_millis() > 1_577_836_800_000);
    }

    #[test]
    fn renders_known_timestamp() {
        assert!(millis_to_rfc3339(0).starts_with("1970-01-01"));
    }
}
