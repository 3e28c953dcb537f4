use chrono::{DateTime, LocalResult, TimeZone};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::meetup::{RawEvent, RawTimestamp};

static LINK_IN_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://\S+").expect("link regex is valid"));

// The start is always timezone-aware: floating provider times get the
// group's effective zone attached, zoned ones are converted into it.
#[derive(Debug, Clone)]
pub struct NormalizedEvent {
    pub title: String,
    pub starts_at: DateTime<Tz>,
    pub ends_at: Option<DateTime<Tz>>,
    pub venue: Option<String>,
    pub url: String,
    pub group: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidEvent {
    #[error("event has no title")]
    MissingTitle,

    #[error("event '{0}' has no start time")]
    MissingStart(String),

    #[error("start time of '{title}' does not exist in {zone} (daylight saving gap)")]
    UnresolvableStart { title: String, zone: Tz },
}

pub fn normalize(raw: RawEvent, group: &str, zone: Tz) -> Result<NormalizedEvent, InvalidEvent> {
    let title = raw
        .title
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .to_string();
    if title.is_empty() {
        return Err(InvalidEvent::MissingTitle);
    }

    let starts_at = match raw.starts_at {
        None => return Err(InvalidEvent::MissingStart(title)),
        Some(ts) => match resolve_timestamp(ts, zone) {
            Some(dt) => dt,
            None => return Err(InvalidEvent::UnresolvableStart { title, zone }),
        },
    };

    // An end time that cannot be resolved degrades to "unknown" instead of
    // invalidating the whole event.
    let ends_at = raw.ends_at.and_then(|ts| resolve_timestamp(ts, zone));

    let url = raw
        .url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .or_else(|| raw.description.as_deref().and_then(link_from_text))
        .unwrap_or_default();

    Ok(NormalizedEvent {
        title,
        starts_at,
        ends_at,
        venue: raw.venue,
        url,
        group: group.to_string(),
    })
}

fn resolve_timestamp(ts: RawTimestamp, zone: Tz) -> Option<DateTime<Tz>> {
    match ts {
        RawTimestamp::Zoned(dt) => Some(dt.with_timezone(&zone)),
        RawTimestamp::Floating(wall) => match zone.from_local_datetime(&wall) {
            LocalResult::Single(dt) => Some(dt),
            LocalResult::Ambiguous(earliest, _) => Some(earliest),
            LocalResult::None => None,
        },
    }
}

fn link_from_text(text: &str) -> Option<String> {
    LINK_IN_TEXT
        .find(text)
        .map(|m| m.as_str().trim_end_matches(')').to_string())
}
