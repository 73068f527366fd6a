//! Normalization of raw wire records into `Entry` values.
//!
//! # Design
//! The remote service is loose about types: ids arrive as strings or
//! integers, text fields may be `null`, dates may be missing. Instead of a
//! derived `Deserialize` (which would either reject those records or let
//! `null` through), each field has an explicit coercion rule. Anything with
//! no viable default is a `ApiError::Validation`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::types::{Entry, Mood};

/// Normalize a single record, supplying the current time for a missing date.
pub fn normalize_entry(value: &Value) -> Result<Entry, ApiError> {
    normalize_entry_at(value, Utc::now())
}

/// Normalize a list body. `null` is an empty list.
pub fn normalize_entries(value: &Value) -> Result<Vec<Entry>, ApiError> {
    let now = Utc::now();
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(records) => records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                normalize_entry_at(record, now).map_err(|err| match err {
                    ApiError::Validation(msg) => {
                        ApiError::Validation(format!("entry {index}: {msg}"))
                    }
                    other => other,
                })
            })
            .collect(),
        other => Err(ApiError::Validation(format!(
            "expected an array of entries, found {}",
            describe(other)
        ))),
    }
}

pub(crate) fn normalize_entry_at(value: &Value, now: DateTime<Utc>) -> Result<Entry, ApiError> {
    let record = value.as_object().ok_or_else(|| {
        ApiError::Validation(format!("expected an entry object, found {}", describe(value)))
    })?;

    Ok(Entry {
        id: normalize_id(record.get("id"))?,
        title: text_field(record, "title")?,
        content: text_field(record, "content")?,
        date: normalize_date(record.get("date"), now)?,
        sentiment: normalize_sentiment(record.get("sentiment")),
    })
}

/// Parse an RFC 3339 timestamp, or a naive `YYYY-MM-DDTHH:MM:SS[.f]` /
/// `YYYY-MM-DD` value interpreted as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn normalize_id(value: Option<&Value>) -> Result<String, ApiError> {
    match value {
        Some(Value::String(id)) if !id.trim().is_empty() => Ok(id.clone()),
        Some(Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(n.to_string()),
        Some(Value::Null) | None => Err(ApiError::Validation("entry is missing an id".to_string())),
        Some(other) => Err(ApiError::Validation(format!(
            "entry id must be a non-empty string or an integer, found {}",
            describe(other)
        ))),
    }
}

fn text_field(record: &Map<String, Value>, field: &str) -> Result<String, ApiError> {
    match record.get(field) {
        Some(Value::String(text)) => Ok(text.clone()),
        Some(Value::Null) | None => Ok(String::new()),
        Some(other) => Err(ApiError::Validation(format!(
            "entry {field} must be a string, found {}",
            describe(other)
        ))),
    }
}

fn normalize_date(value: Option<&Value>, now: DateTime<Utc>) -> Result<String, ApiError> {
    match value {
        Some(Value::String(raw)) if !raw.trim().is_empty() => match parse_timestamp(raw) {
            Some(_) => Ok(raw.clone()),
            None => Err(ApiError::Validation(format!(
                "entry date `{raw}` is not a valid timestamp"
            ))),
        },
        Some(Value::String(_)) | Some(Value::Null) | None => {
            Ok(now.to_rfc3339_opts(SecondsFormat::Millis, true))
        }
        Some(other) => Err(ApiError::Validation(format!(
            "entry date must be a string, found {}",
            describe(other)
        ))),
    }
}

fn normalize_sentiment(value: Option<&Value>) -> Option<String> {
    let label = value?.as_str()?.trim();
    label.parse::<Mood>().ok().map(|_| label.to_string())
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixed_now() -> DateTime<Utc> {
        parse_timestamp("2025-03-01T12:00:00Z").unwrap()
    }

    #[test]
    fn integer_id_becomes_string() {
        let entry = normalize_entry(&json!({
            "id": 42, "title": "a", "content": "b", "date": "2024-01-15T08:30:00Z"
        }))
        .unwrap();
        assert_eq!(entry.id, "42");
    }

    #[test]
    fn sample_record_normalizes_verbatim() {
        let entry = normalize_entry(&json!({
            "id": 7,
            "title": "Morning",
            "content": "Walk",
            "date": "2024-01-15T08:30:00Z",
            "sentiment": "Happy"
        }))
        .unwrap();
        assert_eq!(
            entry,
            Entry {
                id: "7".to_string(),
                title: "Morning".to_string(),
                content: "Walk".to_string(),
                date: "2024-01-15T08:30:00Z".to_string(),
                sentiment: Some("Happy".to_string()),
            }
        );
    }

    #[test]
    fn null_fields_get_defaults() {
        let entry = normalize_entry_at(
            &json!({ "id": "abc", "title": null, "content": null, "date": null }),
            fixed_now(),
        )
        .unwrap();
        assert_eq!(entry.title, "");
        assert_eq!(entry.content, "");
        assert_eq!(entry.date, "2025-03-01T12:00:00.000Z");
        assert_eq!(entry.sentiment, None);
    }

    #[test]
    fn absent_fields_get_defaults() {
        let entry = normalize_entry_at(&json!({ "id": "abc" }), fixed_now()).unwrap();
        assert_eq!(entry.title, "");
        assert_eq!(entry.content, "");
        assert_eq!(entry.timestamp(), fixed_now());
    }

    #[test]
    fn missing_date_defaults_to_a_parseable_current_time() {
        let before = Utc::now();
        let entry = normalize_entry(&json!({ "id": 1 })).unwrap();
        let ts = parse_timestamp(&entry.date).unwrap();
        assert!(ts >= before - chrono::Duration::milliseconds(1));
    }

    #[test]
    fn normalization_is_idempotent() {
        let first = normalize_entry(&json!({
            "id": 3, "title": null, "content": "c", "sentiment": "SAD"
        }))
        .unwrap();
        let second = normalize_entry(&serde_json::to_value(&first).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn unknown_sentiment_is_dropped() {
        for raw in [json!("meh"), json!(""), json!(3), json!(null)] {
            let entry = normalize_entry(&json!({ "id": 1, "sentiment": raw })).unwrap();
            assert_eq!(entry.sentiment, None, "sentiment {raw}");
        }
    }

    #[test]
    fn naive_and_date_only_timestamps_are_accepted() {
        let entry = normalize_entry(&json!({ "id": 1, "date": "2024-01-15T08:30:00.123" })).unwrap();
        assert_eq!(entry.date, "2024-01-15T08:30:00.123");
        assert_eq!(
            entry.timestamp(),
            parse_timestamp("2024-01-15T08:30:00.123Z").unwrap()
        );
        assert!(parse_timestamp("2024-01-15").is_some());
        assert!(parse_timestamp("2024-01-15T08:30:00+02:00").is_some());
    }

    #[test]
    fn rejects_records_without_viable_defaults() {
        let cases = [
            json!({ "title": "no id" }),
            json!({ "id": null }),
            json!({ "id": "  " }),
            json!({ "id": 1.5 }),
            json!({ "id": true }),
            json!({ "id": 1, "title": 5 }),
            json!({ "id": 1, "content": ["x"] }),
            json!({ "id": 1, "date": "not a date" }),
            json!({ "id": 1, "date": 1700000000 }),
            json!("just a string"),
        ];
        for case in cases {
            let err = normalize_entry(&case).unwrap_err();
            assert!(matches!(err, ApiError::Validation(_)), "case {case}");
        }
    }

    #[test]
    fn list_null_is_empty() {
        assert!(normalize_entries(&Value::Null).unwrap().is_empty());
    }

    #[test]
    fn list_rejects_non_array() {
        let err = normalize_entries(&json!({ "entries": [] })).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn list_error_names_offending_index() {
        let err = normalize_entries(&json!([{ "id": 1 }, { "id": null }])).unwrap_err();
        assert_eq!(err, ApiError::Validation("entry 1: entry is missing an id".to_string()));
    }
}
