use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use super::SourceError;

static LD_JSON_SCRIPT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<script[^>]*type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#)
        .expect("ld+json script regex is valid")
});

// Provider-native event record. The page markup is an external contract, so
// every field is optional; the normalizer decides what is required.
#[derive(Debug, Clone, Default)]
pub struct RawEvent {
    pub title: Option<String>,
    pub starts_at: Option<RawTimestamp>,
    pub ends_at: Option<RawTimestamp>,
    pub venue: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawTimestamp {
    Zoned(DateTime<FixedOffset>),
    Floating(NaiveDateTime),
}

// Extracts schema.org Event objects from the ld+json blocks in document
// order. A block that is not valid JSON is skipped; a page without any
// ld+json block at all is malformed.
pub fn parse_events(html: &str) -> Result<Vec<RawEvent>, SourceError> {
    let mut blocks = 0usize;
    let mut events = Vec::new();

    for capture in LD_JSON_SCRIPT.captures_iter(html) {
        blocks += 1;
        let Some(payload) = capture.get(1) else {
            continue;
        };
        match serde_json::from_str::<Value>(payload.as_str()) {
            Ok(value) => collect_events(&value, &mut events),
            Err(e) => debug!("skipping unparseable ld+json block: {}", e),
        }
    }

    if blocks == 0 {
        return Err(SourceError::MalformedBody(
            "no ld+json event data in page".to_string(),
        ));
    }

    Ok(events)
}

fn collect_events(value: &Value, out: &mut Vec<RawEvent>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_events(item, out);
            }
        }
        Value::Object(object) => {
            if let Some(graph) = object.get("@graph") {
                collect_events(graph, out);
            }
            if is_event_type(object.get("@type")) {
                out.push(raw_event_from_object(object));
            }
        }
        _ => {}
    }
}

fn is_event_type(type_field: Option<&Value>) -> bool {
    match type_field {
        Some(Value::String(name)) => name.ends_with("Event"),
        Some(Value::Array(names)) => names
            .iter()
            .filter_map(Value::as_str)
            .any(|name| name.ends_with("Event")),
        _ => false,
    }
}

fn raw_event_from_object(object: &serde_json::Map<String, Value>) -> RawEvent {
    RawEvent {
        title: non_empty_string(object.get("name")),
        starts_at: object
            .get("startDate")
            .and_then(Value::as_str)
            .and_then(parse_raw_timestamp),
        ends_at: object
            .get("endDate")
            .and_then(Value::as_str)
            .and_then(parse_raw_timestamp),
        venue: venue_name(object.get("location")),
        url: non_empty_string(object.get("url")),
        description: non_empty_string(object.get("description")),
    }
}

fn non_empty_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
}

fn venue_name(location: Option<&Value>) -> Option<String> {
    match location {
        Some(Value::String(name)) => {
            let name = name.trim();
            (!name.is_empty()).then(|| name.to_string())
        }
        Some(Value::Object(object)) => non_empty_string(object.get("name")),
        Some(Value::Array(items)) => items.iter().find_map(|item| venue_name(Some(item))),
        _ => None,
    }
}

// RFC 3339 (offset or Z) yields a zoned timestamp; YYYY-MM-DDTHH:MM[:SS]
// and bare YYYY-MM-DD yield floating wall-clock values.
pub fn parse_raw_timestamp(value: &str) -> Option<RawTimestamp> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(zoned) = DateTime::parse_from_rfc3339(value) {
        return Some(RawTimestamp::Zoned(zoned));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(floating) = NaiveDateTime::parse_from_str(value, format) {
            return Some(RawTimestamp::Floating(floating));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(RawTimestamp::Floating(date.and_time(NaiveTime::MIN)));
    }

    None
}
