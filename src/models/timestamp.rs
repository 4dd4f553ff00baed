//! Timestamps as they appear in stored documents.
//!
//! Documents written by this service carry ISO-8601 strings, but imported
//! records may hold `{ "_seconds": n }` wire timestamps or arbitrary values.
//! [`RecordDate`] accepts all of them and resolves to an instant when it can.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordDate {
    /// `{ "_seconds": 1700000000, "_nanoseconds": 0 }`
    Wire {
        #[serde(rename = "_seconds")]
        seconds: i64,
        #[serde(rename = "_nanoseconds", default)]
        nanoseconds: u32,
    },
    Instant(DateTime<Utc>),
    Text(String),
    Other(serde_json::Value),
}

impl RecordDate {
    /// Resolve to an instant; `None` when the value cannot be read as a date.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Wire {
                seconds,
                nanoseconds,
            } => Utc.timestamp_opt(*seconds, *nanoseconds).single(),
            Self::Instant(dt) => Some(*dt),
            Self::Text(text) => parse_text(text),
            Self::Other(_) => None,
        }
    }
}

impl From<DateTime<Utc>> for RecordDate {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::Instant(dt)
    }
}

fn parse_text(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_timestamp_resolves_to_seconds_since_epoch() {
        let date: RecordDate = serde_json::from_value(json!({"_seconds": 1_700_000_000})).unwrap();
        assert_eq!(date.to_datetime().unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn iso_string_deserializes_as_instant() {
        let date: RecordDate = serde_json::from_value(json!("2024-03-15T10:00:00.000Z")).unwrap();
        assert!(matches!(date, RecordDate::Instant(_)));
        assert_eq!(
            date.to_datetime().unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn date_only_string_is_midnight_utc() {
        let date: RecordDate = serde_json::from_value(json!("2024-03-15")).unwrap();
        assert!(matches!(date, RecordDate::Text(_)));
        assert_eq!(
            date.to_datetime().unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn unparseable_values_resolve_to_none() {
        let garbage: RecordDate = serde_json::from_value(json!("not a date")).unwrap();
        assert!(garbage.to_datetime().is_none());
        let number: RecordDate = serde_json::from_value(json!(12345)).unwrap();
        assert!(number.to_datetime().is_none());
    }

    #[test]
    fn instant_serializes_as_iso_string() {
        let date = RecordDate::from(Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap());
        let json = serde_json::to_value(&date).unwrap();
        assert!(json.as_str().unwrap().starts_with("2025-01-02T03:04:05"));
    }
}
