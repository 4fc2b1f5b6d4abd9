//! Timestamp helpers
//!
//! Every date the service stores is written as RFC 3339 UTC with millisecond
//! precision and a `Z` suffix, so lexicographic order equals chronological
//! order inside SQLite.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

/// Format a timestamp in the canonical stored form (`2024-01-15T10:30:00.000Z`)
pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time truncated to the stored millisecond precision
pub fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    millis_to_datetime(now.timestamp_millis()).unwrap_or(now)
}

/// Parse RFC 3339 or a bare `YYYY-MM-DD` date (midnight UTC)
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Convert epoch milliseconds to a UTC timestamp
pub fn millis_to_datetime(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
}

/// Midnight UTC of the given timestamp's day
pub fn start_of_day(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .unwrap_or(dt)
}

/// Serde adapter writing timestamps in the canonical stored form
pub mod canonical {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(*dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw)))
    }
}
