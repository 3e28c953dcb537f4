use chrono::{DateTime, Duration, LocalResult, NaiveTime, TimeZone};
use chrono_tz::Tz;
use serde::Serialize;

use crate::routing::RoutedEvent;

// One event as served to the workflow engine. start/end are RFC 3339 in
// the group's effective zone; the display strings are pre-rendered so the
// downstream workflow posts them verbatim.
#[derive(Debug, Clone, Serialize)]
pub struct EventPayload {
    pub title: String,
    pub start: String,
    pub end: Option<String>,
    pub url: String,
    pub destination: Option<String>,
    pub venue: Option<String>,
    pub time_display: String,
    pub time_local: String,
    pub days_diff: i64,
    pub reminder: bool,
}

// Start of the reporting window: 01:00 today in the event zone. Events
// before it are over or already underway and get filtered out.
pub(crate) fn day_baseline(now: DateTime<Tz>) -> DateTime<Tz> {
    let wall = now
        .date_naive()
        .and_time(NaiveTime::from_hms_opt(1, 0, 0).expect("01:00 is a valid wall time"));
    match now.timezone().from_local_datetime(&wall) {
        LocalResult::Single(baseline) => baseline,
        LocalResult::Ambiguous(earliest, _) => earliest,
        // Zones that spring forward over 01:00 open the window after the gap.
        LocalResult::None => now
            .timezone()
            .from_local_datetime(&(wall + Duration::hours(1)))
            .earliest()
            .unwrap_or(now),
    }
}

// Whole days between the baseline and the event start: 0 for later today,
// 1 for tomorrow.
pub(crate) fn days_until(baseline: DateTime<Tz>, starts_at: DateTime<Tz>) -> i64 {
    (starts_at - baseline).num_days()
}

pub(crate) fn format_display(at: DateTime<Tz>) -> String {
    at.format("%A, %B %d, %Y at %I:%M %p").to_string()
}

pub(crate) fn format_local_hm(at: DateTime<Tz>) -> String {
    at.format("%I:%M %p").to_string()
}

pub(crate) fn build_payload(routed: RoutedEvent, baseline: DateTime<Tz>) -> EventPayload {
    let event = routed.event;
    EventPayload {
        time_display: format_display(event.starts_at),
        time_local: format_local_hm(event.starts_at),
        days_diff: days_until(baseline, event.starts_at),
        title: event.title,
        start: event.starts_at.to_rfc3339(),
        end: event.ends_at.map(|at| at.to_rfc3339()),
        url: event.url,
        destination: routed.destination,
        venue: event.venue,
        reminder: routed.reminder,
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use chrono_tz::America::New_York;
    use chrono_tz::Europe::London;

    use super::{build_payload, day_baseline, days_until, format_display, format_local_hm};
    use crate::events::NormalizedEvent;
    use crate::routing::RoutedEvent;

    fn new_york(y: i32, m: u32, d: u32, h: u32, min: u32) -> chrono::DateTime<chrono_tz::Tz> {
        New_York.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn day_baseline_is_one_am_of_the_current_day() {
        let baseline = day_baseline(new_york(2024, 5, 1, 17, 30));
        assert_eq!(baseline.to_rfc3339(), "2024-05-01T01:00:00-04:00");
    }

    #[test]
    fn day_baseline_before_one_am_still_uses_today() {
        let baseline = day_baseline(new_york(2024, 5, 1, 0, 15));
        assert_eq!(baseline.to_rfc3339(), "2024-05-01T01:00:00-04:00");
    }

    #[test]
    fn day_baseline_on_fall_back_morning_takes_earlier_instant() {
        // 01:00 occurs twice on 2024-11-03 in America/New_York.
        let baseline = day_baseline(new_york(2024, 11, 3, 12, 0));
        assert_eq!(baseline.to_rfc3339(), "2024-11-03T01:00:00-04:00");
    }

    #[test]
    fn day_baseline_skips_spring_forward_gap() {
        // London jumps 01:00 -> 02:00 on 2024-03-31, so 01:00 never occurs.
        let now = London.with_ymd_and_hms(2024, 3, 31, 12, 0, 0).unwrap();

        let baseline = day_baseline(now);

        assert_eq!(baseline.to_rfc3339(), "2024-03-31T02:00:00+01:00");
    }

    #[test]
    fn days_until_is_zero_for_later_today() {
        let baseline = day_baseline(new_york(2024, 5, 1, 9, 0));
        assert_eq!(days_until(baseline, new_york(2024, 5, 1, 18, 0)), 0);
    }

    #[test]
    fn days_until_is_one_for_tomorrow_evening() {
        let baseline = day_baseline(new_york(2024, 5, 1, 9, 0));
        assert_eq!(days_until(baseline, new_york(2024, 5, 2, 18, 0)), 1);
    }

    #[test]
    fn format_display_spells_out_the_date() {
        let formatted = format_display(new_york(2024, 5, 1, 18, 0));
        assert_eq!(formatted, "Wednesday, May 01, 2024 at 06:00 PM");
    }

    #[test]
    fn format_local_hm_is_twelve_hour_clock() {
        let formatted = format_local_hm(new_york(2024, 5, 1, 18, 0));
        assert_eq!(formatted, "06:00 PM");
    }

    #[test]
    fn build_payload_fills_every_field() {
        let routed = RoutedEvent {
            event: NormalizedEvent {
                title: "Python Workshop Night".to_string(),
                starts_at: new_york(2024, 5, 2, 18, 0),
                ends_at: Some(new_york(2024, 5, 2, 20, 0)),
                venue: Some("Community Hall".to_string()),
                url: "https://www.meetup.com/pythonmeetup/events/1/".to_string(),
                group: "pythonmeetup".to_string(),
            },
            destination: Some("#workshops".to_string()),
            reminder: true,
        };
        let baseline = day_baseline(new_york(2024, 5, 1, 9, 0));

        let payload = build_payload(routed, baseline);

        assert_eq!(payload.title, "Python Workshop Night");
        assert_eq!(payload.start, "2024-05-02T18:00:00-04:00");
        assert_eq!(payload.end.as_deref(), Some("2024-05-02T20:00:00-04:00"));
        assert_eq!(payload.url, "https://www.meetup.com/pythonmeetup/events/1/");
        assert_eq!(payload.destination.as_deref(), Some("#workshops"));
        assert_eq!(payload.venue.as_deref(), Some("Community Hall"));
        assert_eq!(payload.time_display, "Thursday, May 02, 2024 at 06:00 PM");
        assert_eq!(payload.time_local, "06:00 PM");
        assert_eq!(payload.days_diff, 1);
        assert!(payload.reminder);
    }

    #[test]
    fn build_payload_keeps_unknown_end_and_destination_empty() {
        let routed = RoutedEvent {
            event: NormalizedEvent {
                title: "Monthly Social".to_string(),
                starts_at: new_york(2024, 5, 1, 18, 0),
                ends_at: None,
                venue: None,
                url: String::new(),
                group: "pythonmeetup".to_string(),
            },
            destination: None,
            reminder: false,
        };

        let payload = build_payload(routed, day_baseline(new_york(2024, 5, 1, 9, 0)));

        assert!(payload.end.is_none());
        assert!(payload.destination.is_none());
        assert!(payload.venue.is_none());
        assert!(!payload.reminder);
    }
}
