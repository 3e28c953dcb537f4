use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::ConfigError;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_timezone")]
    pub default_tz: String,
    #[serde(default)]
    pub meetup_groups: BTreeMap<String, GroupConfig>,
    #[serde(default)]
    pub event_config: BTreeMap<String, Vec<RuleConfig>>,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum GroupConfig {
    Url(String),
    Detailed(GroupDetails),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GroupDetails {
    pub url: String,
    #[serde(alias = "tz", default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub default_destination: Option<String>,
}

impl GroupConfig {
    pub fn url(&self) -> &str {
        match self {
            GroupConfig::Url(url) => url,
            GroupConfig::Detailed(details) => &details.url,
        }
    }

    pub fn timezone(&self) -> Option<&str> {
        match self {
            GroupConfig::Url(_) => None,
            GroupConfig::Detailed(details) => details.timezone.as_deref(),
        }
    }

    pub fn default_destination(&self) -> Option<&str> {
        match self {
            GroupConfig::Url(_) => None,
            GroupConfig::Detailed(details) => details.default_destination.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuleConfig {
    #[serde(rename = "match", alias = "pattern")]
    pub pattern: String,
    pub destination: String,
    #[serde(default)]
    pub reminder: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetchConfig {
    #[serde(default = "default_fetch_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout_secs(),
            max_body_bytes: default_max_body_bytes(),
            user_agent: default_user_agent(),
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_tz.parse::<chrono_tz::Tz>().is_err() {
            return Err(ConfigError::InvalidConfig(format!(
                "default_tz '{}' is not a known IANA timezone",
                self.default_tz
            )));
        }

        for (key, group) in &self.meetup_groups {
            if group.url().trim().is_empty() {
                return Err(ConfigError::InvalidConfig(format!(
                    "meetup_groups.{} has an empty url",
                    key
                )));
            }

            let parsed = url::Url::parse(group.url()).map_err(|e| {
                ConfigError::InvalidConfig(format!("meetup_groups.{} url is not valid: {}", key, e))
            })?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(ConfigError::InvalidConfig(format!(
                    "meetup_groups.{} url must be http or https, got '{}'",
                    key,
                    parsed.scheme()
                )));
            }

            if let Some(tz) = group.timezone() {
                if tz.parse::<chrono_tz::Tz>().is_err() {
                    return Err(ConfigError::InvalidConfig(format!(
                        "meetup_groups.{} timezone '{}' is not a known IANA timezone",
                        key, tz
                    )));
                }
            }
        }

        for (key, rules) in &self.event_config {
            if !self.meetup_groups.contains_key(key) {
                return Err(ConfigError::InvalidConfig(format!(
                    "event_config.{} does not match any configured meetup group",
                    key
                )));
            }

            for (index, rule) in rules.iter().enumerate() {
                if rule.pattern.trim().is_empty() {
                    return Err(ConfigError::InvalidConfig(format!(
                        "event_config.{} rule #{} has an empty match pattern",
                        key,
                        index + 1
                    )));
                }
                if rule.destination.trim().is_empty() {
                    return Err(ConfigError::InvalidConfig(format!(
                        "event_config.{} rule #{} has an empty destination",
                        key,
                        index + 1
                    )));
                }
            }
        }

        if self.server.port == 0 {
            return Err(ConfigError::InvalidConfig(
                "server.port must be between 1 and 65535".to_string(),
            ));
        }

        if self.fetch.timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "fetch.timeout_secs must be greater than zero".to_string(),
            ));
        }

        if self.fetch.max_body_bytes == 0 {
            return Err(ConfigError::InvalidConfig(
                "fetch.max_body_bytes must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    pub fn default_zone(&self) -> chrono_tz::Tz {
        self.default_tz
            .parse::<chrono_tz::Tz>()
            .unwrap_or(chrono_tz::America::Los_Angeles)
    }

    pub fn group_zone(&self, key: &str) -> chrono_tz::Tz {
        self.meetup_groups
            .get(key)
            .and_then(|group| group.timezone())
            .and_then(|tz| tz.parse::<chrono_tz::Tz>().ok())
            .unwrap_or_else(|| self.default_zone())
    }

    pub fn group_rules(&self, key: &str) -> &[RuleConfig] {
        self.event_config
            .get(key)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

fn default_timezone() -> String {
    "America/Los_Angeles".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_fetch_timeout_secs() -> u64 {
    12
}

fn default_max_body_bytes() -> usize {
    3_000_000
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (compatible; meetup-discord-router)".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Config {
        serde_yaml::from_str(yaml).expect("config yaml should parse")
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let config = parse("meetup_groups:\n  rustmeetup: https://www.meetup.com/rustmeetup/\n");

        assert_eq!(config.default_tz, "America/Los_Angeles");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.bind_address, "0.0.0.0");
        assert_eq!(config.fetch.timeout_secs, 12);
        assert_eq!(config.fetch.max_body_bytes, 3_000_000);
        assert!(config.event_config.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn group_accepts_bare_url_string() {
        let config = parse("meetup_groups:\n  rustmeetup: https://www.meetup.com/rustmeetup/\n");

        let group = config.meetup_groups.get("rustmeetup").unwrap();
        assert_eq!(group.url(), "https://www.meetup.com/rustmeetup/");
        assert_eq!(group.timezone(), None);
        assert_eq!(group.default_destination(), None);
    }

    #[test]
    fn group_accepts_detailed_mapping() {
        let yaml = r##"
meetup_groups:
  nycrust:
    url: https://www.meetup.com/nycrust/
    timezone: America/New_York
    default_destination: "#events"
"##;
        let config = parse(yaml);

        let group = config.meetup_groups.get("nycrust").unwrap();
        assert_eq!(group.url(), "https://www.meetup.com/nycrust/");
        assert_eq!(group.timezone(), Some("America/New_York"));
        assert_eq!(group.default_destination(), Some("#events"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rule_order_is_preserved_from_yaml() {
        let yaml = r##"
meetup_groups:
  pythonmeetup: https://www.meetup.com/pythonmeetup/
event_config:
  pythonmeetup:
    - match: Workshop
      destination: "#workshops"
    - match: Python
      destination: "#general"
"##;
        let config = parse(yaml);

        let rules = config.group_rules("pythonmeetup");
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].pattern, "Workshop");
        assert_eq!(rules[0].destination, "#workshops");
        assert_eq!(rules[1].pattern, "Python");
        assert_eq!(rules[1].destination, "#general");
    }

    #[test]
    fn rule_reminder_defaults_to_false() {
        let yaml = r##"
meetup_groups:
  pythonmeetup: https://www.meetup.com/pythonmeetup/
event_config:
  pythonmeetup:
    - match: Workshop
      destination: "#workshops"
      reminder: true
    - match: Python
      destination: "#general"
"##;
        let config = parse(yaml);

        let rules = config.group_rules("pythonmeetup");
        assert!(rules[0].reminder);
        assert!(!rules[1].reminder);
    }

    #[test]
    fn validate_rejects_unknown_default_tz() {
        let config = parse("default_tz: Mars/Olympus_Mons\n");

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Mars/Olympus_Mons"));
    }

    #[test]
    fn validate_rejects_group_with_bad_scheme() {
        let config = parse("meetup_groups:\n  files: ftp://example.org/events\n");

        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_group_timezone_typo() {
        let yaml = r#"
meetup_groups:
  nycrust:
    url: https://www.meetup.com/nycrust/
    timezone: America/NewYork
"#;
        let config = parse(yaml);

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("America/NewYork"));
    }

    #[test]
    fn validate_rejects_rules_for_unknown_group() {
        let yaml = r##"
meetup_groups:
  pythonmeetup: https://www.meetup.com/pythonmeetup/
event_config:
  pythonmeetp:
    - match: Workshop
      destination: "#workshops"
"##;
        let config = parse(yaml);

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("pythonmeetp"));
    }

    #[test]
    fn validate_rejects_empty_rule_pattern() {
        let yaml = r##"
meetup_groups:
  pythonmeetup: https://www.meetup.com/pythonmeetup/
event_config:
  pythonmeetup:
    - match: "  "
      destination: "#workshops"
"##;
        let config = parse(yaml);

        assert!(config.validate().is_err());
    }

    #[test]
    fn group_zone_prefers_group_override() {
        let yaml = r#"
default_tz: America/Los_Angeles
meetup_groups:
  nycrust:
    url: https://www.meetup.com/nycrust/
    timezone: America/New_York
  bayrust: https://www.meetup.com/bayrust/
"#;
        let config = parse(yaml);

        assert_eq!(config.group_zone("nycrust"), chrono_tz::America::New_York);
        assert_eq!(
            config.group_zone("bayrust"),
            chrono_tz::America::Los_Angeles
        );
    }

    #[test]
    fn load_from_file_reads_and_validates() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file should be created");
        std::io::Write::write_all(
            &mut file,
            b"default_tz: America/New_York\nmeetup_groups:\n  nycrust: https://www.meetup.com/nycrust/\nserver:\n  port: 9090\n",
        )
        .expect("temp file should be writable");

        let config = Config::load_from_file(file.path()).unwrap();

        assert_eq!(config.default_tz, "America/New_York");
        assert!(config.meetup_groups.contains_key("nycrust"));
        assert_eq!(config.server.port, 9090);
    }

    #[test]
    fn load_from_file_reports_missing_file_as_io_error() {
        let err = Config::load_from_file("/nonexistent/router.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn load_from_file_reports_bad_yaml() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file should be created");
        std::io::Write::write_all(&mut file, b"meetup_groups: [not, a, mapping\n")
            .expect("temp file should be writable");

        let err = Config::load_from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn load_from_file_rejects_invalid_config() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file should be created");
        std::io::Write::write_all(&mut file, b"default_tz: Mars/Olympus_Mons\n")
            .expect("temp file should be writable");

        let err = Config::load_from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfig(_)));
    }
}
