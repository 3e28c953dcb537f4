use std::collections::BTreeMap;

use crate::config::Config;
use crate::events::NormalizedEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingRule {
    pub pattern: String,
    pub destination: String,
    pub reminder: bool,
}

#[derive(Debug, Clone, Default)]
pub struct GroupRoutes {
    rules: Vec<RoutingRule>,
    default_destination: Option<String>,
}

impl GroupRoutes {
    pub fn new(rules: Vec<RoutingRule>, default_destination: Option<String>) -> Self {
        Self {
            rules,
            default_destination,
        }
    }

    // Case-insensitive substring match; list order is evaluation order.
    pub fn matching_rule(&self, title: &str) -> Option<&RoutingRule> {
        let title = title.to_lowercase();
        self.rules
            .iter()
            .find(|rule| title.contains(&rule.pattern.to_lowercase()))
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

// `destination` is None when no rule matched and the group has no default.
// The event itself is never dropped here.
#[derive(Debug, Clone)]
pub struct RoutedEvent {
    pub event: NormalizedEvent,
    pub destination: Option<String>,
    pub reminder: bool,
}

// Built once from config at startup; immutable afterwards.
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    groups: BTreeMap<String, GroupRoutes>,
}

impl RoutingTable {
    pub fn from_config(config: &Config) -> Self {
        let mut groups = BTreeMap::new();
        for (key, group) in &config.meetup_groups {
            let rules = config
                .group_rules(key)
                .iter()
                .map(|rule| RoutingRule {
                    pattern: rule.pattern.clone(),
                    destination: rule.destination.clone(),
                    reminder: rule.reminder,
                })
                .collect();
            let routes = GroupRoutes::new(rules, group.default_destination().map(str::to_string));
            groups.insert(key.clone(), routes);
        }
        Self { groups }
    }

    // Sources without an entry (ad-hoc URLs) pass through with no destination.
    pub fn route(&self, event: NormalizedEvent) -> RoutedEvent {
        let Some(routes) = self.groups.get(&event.group) else {
            return RoutedEvent {
                event,
                destination: None,
                reminder: false,
            };
        };

        match routes.matching_rule(&event.title) {
            Some(rule) => RoutedEvent {
                event,
                destination: Some(rule.destination.clone()),
                reminder: rule.reminder,
            },
            None => RoutedEvent {
                destination: routes.default_destination.clone(),
                reminder: false,
                event,
            },
        }
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn rule_count(&self) -> usize {
        self.groups.values().map(GroupRoutes::rule_count).sum()
    }
}
