use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use chrono_tz::Tz;
use futures::future::join_all;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;
use crate::events::normalize;
use crate::meetup::EventSource;
use crate::routing::RoutingTable;
use crate::web::metrics::Metrics;

pub use self::logic::EventPayload;

mod logic;

// Response key for a ?url= source that is not a configured group.
pub const ADHOC_GROUP_KEY: &str = "adhoc";

#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("unknown group '{key}' (known groups: {})", .known.join(", "))]
    UnknownGroup { key: String, known: Vec<String> },

    #[error("no meetup groups configured; pass ?url= or add groups to the config")]
    NoGroupsSelected,

    #[error("invalid tz '{0}'")]
    InvalidTimezone(String),
}

#[derive(Debug, Clone)]
pub struct GroupTarget {
    pub key: String,
    pub url: String,
    pub zone: Tz,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupStatus {
    Ok,
    Error,
}

// A failed fetch reports status "error" here instead of failing the
// whole response.
#[derive(Debug, Serialize)]
pub struct GroupReport {
    pub status: GroupStatus,
    pub events: Vec<EventPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GroupReport {
    fn ok(events: Vec<EventPayload>) -> Self {
        Self {
            status: GroupStatus::Ok,
            events,
            error: None,
        }
    }

    fn failed(reason: String) -> Self {
        Self {
            status: GroupStatus::Error,
            events: Vec::new(),
            error: Some(reason),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub groups: BTreeMap<String, GroupReport>,
}

// Resolves which sources to read, fans the fetches out, and runs
// normalize -> filter -> route per group. Holds no request state.
pub struct EventPipeline {
    config: Arc<Config>,
    table: RoutingTable,
    source: Arc<dyn EventSource>,
}

impl EventPipeline {
    pub fn new(config: Arc<Config>, source: Arc<dyn EventSource>) -> Self {
        let table = RoutingTable::from_config(&config);
        Self {
            config,
            table,
            source,
        }
    }

    // url beats group; with neither, every configured group is fetched.
    // A tz override replaces the effective zone of all selected sources.
    pub fn select(
        &self,
        group: Option<&str>,
        url: Option<&str>,
        tz: Option<&str>,
    ) -> Result<Vec<GroupTarget>, SelectionError> {
        let override_zone = match tz {
            Some(name) => Some(
                name.parse::<Tz>()
                    .map_err(|_| SelectionError::InvalidTimezone(name.to_string()))?,
            ),
            None => None,
        };

        if let Some(url) = url {
            return Ok(vec![GroupTarget {
                key: ADHOC_GROUP_KEY.to_string(),
                url: url.to_string(),
                zone: override_zone.unwrap_or_else(|| self.config.default_zone()),
            }]);
        }

        if let Some(key) = group {
            let Some(group_config) = self.config.meetup_groups.get(key) else {
                return Err(SelectionError::UnknownGroup {
                    key: key.to_string(),
                    known: self.config.meetup_groups.keys().cloned().collect(),
                });
            };
            return Ok(vec![GroupTarget {
                key: key.to_string(),
                url: group_config.url().to_string(),
                zone: override_zone.unwrap_or_else(|| self.config.group_zone(key)),
            }]);
        }

        let targets: Vec<GroupTarget> = self
            .config
            .meetup_groups
            .iter()
            .map(|(key, group_config)| GroupTarget {
                key: key.clone(),
                url: group_config.url().to_string(),
                zone: override_zone.unwrap_or_else(|| self.config.group_zone(key)),
            })
            .collect();

        if targets.is_empty() {
            return Err(SelectionError::NoGroupsSelected);
        }
        Ok(targets)
    }

    // Fetches every target concurrently; one group's failure never
    // disturbs the others.
    pub async fn collect(&self, targets: Vec<GroupTarget>) -> EventsResponse {
        let reports = join_all(targets.iter().map(|target| self.collect_group(target))).await;
        let groups = targets
            .into_iter()
            .map(|target| target.key)
            .zip(reports)
            .collect();
        EventsResponse { groups }
    }

    async fn collect_group(&self, target: &GroupTarget) -> GroupReport {
        Metrics::fetch_attempted();
        let raw_events = match self.source.fetch_events(&target.url).await {
            Ok(raw_events) => raw_events,
            Err(err) => {
                Metrics::fetch_failed();
                warn!(group = %target.key, error = %err, "event fetch failed");
                return GroupReport::failed(err.to_string());
            }
        };

        Metrics::events_parsed(raw_events.len() as u64);
        let baseline = logic::day_baseline(Utc::now().with_timezone(&target.zone));

        let mut events = Vec::new();
        for raw in raw_events {
            let normalized = match normalize(raw, &target.key, target.zone) {
                Ok(event) => event,
                Err(reason) => {
                    Metrics::event_dropped();
                    warn!(group = %target.key, %reason, "dropping invalid event");
                    continue;
                }
            };
            if normalized.starts_at < baseline {
                Metrics::event_filtered();
                debug!(
                    group = %target.key,
                    title = %normalized.title,
                    "event starts before the reporting window"
                );
                continue;
            }
            Metrics::event_routed();
            events.push(logic::build_payload(self.table.route(normalized), baseline));
        }

        GroupReport::ok(events)
    }

    pub fn group_count(&self) -> usize {
        self.table.group_count()
    }

    pub fn rule_count(&self) -> usize {
        self.table.rule_count()
    }
}
