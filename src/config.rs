//! Static board configuration: feed endpoints, the stop table, locations
//! and per-line service hours.
//!
//! Stored as a JSON document; a default for the Vincennes/Joinville
//! dashboard is compiled in from `config/default.json`.

use std::collections::HashMap;

use anyhow::{Context, Result, bail};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::service_hours::ServiceHours;

const DEFAULT_CONFIG: &str = include_str!("../config/default.json");

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_timezone")]
    pub timezone: Tz,
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u64,
    pub feeds: FeedsConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    pub stops: HashMap<String, StopConfig>,
    #[serde(default)]
    pub locations: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub service_hours: ServiceHours,
}

/// Where the two GTFS-RT feeds are fetched from.
///
/// `base_url` may point at the upstream producer or at a running proxy;
/// both expose the feeds under the same endpoint names.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedsConfig {
    pub base_url: String,
    pub trips: String,
    pub alerts: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl FeedsConfig {
    pub fn trips_url(&self) -> String {
        self.url_for(&self.trips)
    }

    pub fn alerts_url(&self) -> String {
        self.url_for(&self.alerts)
    }

    pub fn url_for(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), endpoint)
    }

    /// Endpoint names the proxy is allowed to forward.
    pub fn endpoints(&self) -> [&str; 2] {
        [self.trips.as_str(), self.alerts.as_str()]
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    #[serde(default = "default_cache_max_age")]
    pub cache_max_age_secs: u32,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            cache_max_age_secs: default_cache_max_age(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopKind {
    Rer,
    Bus,
    Noctilien,
    Navette,
}

/// One physical stop point and the lines that call there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopConfig {
    pub stop_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    pub kind: StopKind,
    pub lines: Vec<String>,
}

fn default_timezone() -> Tz {
    chrono_tz::Europe::Paris
}

fn default_refresh_secs() -> u64 {
    30
}

fn default_cache_max_age() -> u32 {
    30
}

fn default_user_agent() -> String {
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string()
}

impl AppConfig {
    /// Loads the config from a JSON file at `path`, or the built-in default.
    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file '{path}'"))?;
                Self::from_json(&content).with_context(|| format!("Invalid config file '{path}'"))
            }
            None => Self::from_json(DEFAULT_CONFIG).context("Invalid built-in config"),
        }
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for (location, keys) in &self.locations {
            if let Some(missing) = keys.iter().find(|k| !self.stops.contains_key(*k)) {
                bail!("location '{location}' references unknown stop '{missing}'");
            }
        }
        if self.feeds.trips == self.feeds.alerts {
            bail!("trips and alerts feeds must use distinct endpoint names");
        }
        Ok(())
    }

    pub fn stop(&self, key: &str) -> Option<&StopConfig> {
        self.stops.get(key)
    }

    pub fn location(&self, name: &str) -> Option<&[String]> {
        self.locations.get(name).map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_config_loads() {
        let config = AppConfig::load(None).unwrap();

        assert_eq!(config.timezone, chrono_tz::Europe::Paris);
        assert_eq!(config.refresh_secs, 30);
        assert_eq!(config.stops.len(), 8);
        assert_eq!(config.location("joinville").unwrap().len(), 6);
        assert_eq!(config.stop("hippodrome").unwrap().stop_id, "IDFM:463641");
        assert!(config.service_hours.get("RER A").unwrap().saturday.is_some());
        assert_eq!(
            config.feeds.trips_url(),
            "http://gtfsidfm.clarifygdps.com/gtfs-rt-trips-idfm"
        );
    }

    #[test]
    fn test_every_default_line_has_hours() {
        let config = AppConfig::load(None).unwrap();
        for stop in config.stops.values() {
            for line in &stop.lines {
                assert!(
                    config.service_hours.get(line).is_some(),
                    "line {line} has no service hours"
                );
            }
        }
    }

    #[test]
    fn test_location_with_unknown_stop_is_rejected() {
        let json = r#"{
            "feeds": { "base_url": "http://x", "trips": "t", "alerts": "a" },
            "stops": {},
            "locations": { "nowhere": ["missing"] }
        }"#;
        let err = AppConfig::from_json(json).unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_bad_clock_time_is_rejected() {
        let json = r#"{
            "feeds": { "base_url": "http://x", "trips": "t", "alerts": "a" },
            "stops": {},
            "service_hours": { "77": { "weekday": { "start": "5h30", "end": "0:45" } } }
        }"#;
        assert!(AppConfig::from_json(json).is_err());
    }

    #[test]
    fn test_defaults_apply() {
        let json = r#"{
            "feeds": { "base_url": "http://x/", "trips": "t", "alerts": "a" },
            "stops": {}
        }"#;
        let config = AppConfig::from_json(json).unwrap();
        assert_eq!(config.timezone, chrono_tz::Europe::Paris);
        assert_eq!(config.proxy.cache_max_age_secs, 30);
        assert_eq!(config.feeds.alerts_url(), "http://x/a");
        assert!(config.service_hours.is_empty());
    }
}
