use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

static FETCHES_ATTEMPTED: AtomicU64 = AtomicU64::new(0);
static FETCHES_FAILED: AtomicU64 = AtomicU64::new(0);
static EVENTS_PARSED: AtomicU64 = AtomicU64::new(0);
static EVENTS_DROPPED: AtomicU64 = AtomicU64::new(0);
static EVENTS_FILTERED: AtomicU64 = AtomicU64::new(0);
static EVENTS_ROUTED: AtomicU64 = AtomicU64::new(0);

// Process-lifetime counters for the pipeline; the handler serves a
// point-in-time snapshot.
pub struct Metrics;

impl Metrics {
    pub fn fetch_attempted() {
        FETCHES_ATTEMPTED.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fetch_failed() {
        FETCHES_FAILED.fetch_add(1, Ordering::Relaxed);
    }

    pub fn events_parsed(count: u64) {
        EVENTS_PARSED.fetch_add(count, Ordering::Relaxed);
    }

    pub fn event_dropped() {
        EVENTS_DROPPED.fetch_add(1, Ordering::Relaxed);
    }

    pub fn event_filtered() {
        EVENTS_FILTERED.fetch_add(1, Ordering::Relaxed);
    }

    pub fn event_routed() {
        EVENTS_ROUTED.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct MetricsSnapshot {
    pub fetches_attempted: u64,
    pub fetches_failed: u64,
    pub events_parsed: u64,
    pub events_dropped: u64,
    pub events_filtered: u64,
    pub events_routed: u64,
}

pub fn snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        fetches_attempted: FETCHES_ATTEMPTED.load(Ordering::Relaxed),
        fetches_failed: FETCHES_FAILED.load(Ordering::Relaxed),
        events_parsed: EVENTS_PARSED.load(Ordering::Relaxed),
        events_dropped: EVENTS_DROPPED.load(Ordering::Relaxed),
        events_filtered: EVENTS_FILTERED.load(Ordering::Relaxed),
        events_routed: EVENTS_ROUTED.load(Ordering::Relaxed),
    }
}
