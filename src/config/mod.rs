//! Configuration management
//!
//! Two TOML files drive a run: the application file (service settings,
//! pipeline tuning, localized form labels and the entity catalog) and the user
//! file (credentials and applicant data, see [`user`]).

pub mod form;
pub mod user;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::models::{Entity, EntityKind};
use crate::reservation::{LockRace, SuccessPolicy};
use crate::session::headers::{DEFAULT_ACCEPT_LANGUAGE, DEFAULT_USER_AGENT};
use crate::session::RetryPolicy;

pub use form::Strings;
pub use user::{AdditionalApplication, ResidenceType, UserConfig};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote service and HTTP client settings
    pub service: ServiceConfig,

    /// Queue, worker and lock race tuning
    pub pipeline: PipelineConfig,

    /// External captcha solver
    pub captcha: CaptchaConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Localized form labels
    pub strings: Strings,

    /// City queues (legalization of foreigners)
    pub cities: Vec<Entity>,

    /// Heads of departments
    pub departments: Vec<Entity>,
}

/// Remote service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Service root, e.g. `https://rezerwacje.duw.pl`
    pub base_url: String,

    /// User agent string
    pub user_agent: String,

    /// Accept-Language header
    pub accept_language: String,

    /// Cookie seeded into the jar before the first request
    pub language_cookie: Option<String>,

    /// Skip TLS certificate verification
    pub accept_invalid_certs: bool,

    /// Per-request timeout in seconds (0 disables it)
    pub request_timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: String::from("https://rezerwacje.duw.pl"),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
            language_cookie: Some(String::from("config[lang]=pol")),
            accept_invalid_certs: false,
            request_timeout_secs: 30,
        }
    }
}

/// Pipeline tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Reservation workers draining the queue
    pub workers: usize,

    /// Concurrent scan loops per tracked entity
    pub scanners_per_entity: usize,

    /// Maximum queued tasks before the stalest is evicted
    pub queue_capacity: usize,

    /// Parallel lock requests per attempt
    pub lock_fanout: usize,

    /// Which lock response decides an attempt
    pub lock_race: LockRace,

    /// Pause between scan passes in milliseconds (0 = rescan immediately)
    pub scan_interval_ms: u64,

    /// What to do after a reservation went through
    pub on_success: SuccessPolicy,

    /// Attempts per request before giving up (unset = retry forever)
    pub max_send_attempts: Option<u32>,

    /// Pause between request retries in milliseconds
    pub retry_delay_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            scanners_per_entity: 1,
            queue_capacity: 100,
            lock_fanout: 5,
            lock_race: LockRace::default(),
            scan_interval_ms: 0,
            on_success: SuccessPolicy::default(),
            max_send_attempts: None,
            retry_delay_ms: 0,
        }
    }
}

impl PipelineConfig {
    /// Get scan interval as Duration
    #[must_use]
    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms)
    }

    /// Retry policy for every request of the session
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        let policy = match self.max_send_attempts {
            Some(max) => RetryPolicy::bounded(max),
            None => RetryPolicy::unlimited(),
        };
        policy.with_delay(Duration::from_millis(self.retry_delay_ms))
    }
}

/// External captcha solver invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptchaConfig {
    /// Program receiving the image on stdin and printing the answer
    pub command: String,

    /// Program arguments
    pub args: Vec<String>,
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            command: String::from("tesseract"),
            args: ["stdin", "stdout", "--psm", "8"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config file {}: {e}", path.display()))
        })?;

        Self::from_toml(&content).map_err(|e| {
            Error::config(format!("Failed to parse config file {}: {e}", path.display()))
        })
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content)?;
        config.assign_kinds();
        Ok(config)
    }

    fn assign_kinds(&mut self) {
        for city in &mut self.cities {
            city.kind = EntityKind::City;
        }
        for department in &mut self.departments {
            department.kind = EntityKind::Department;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.workers == 0 {
            return Err(Error::config("workers must be greater than 0"));
        }

        if self.pipeline.scanners_per_entity == 0 {
            return Err(Error::config("scanners_per_entity must be greater than 0"));
        }

        if self.pipeline.queue_capacity == 0 {
            return Err(Error::config("queue_capacity must be greater than 0"));
        }

        if self.pipeline.lock_fanout == 0 {
            return Err(Error::config("lock_fanout must be greater than 0"));
        }

        if url::Url::parse(&self.service.base_url).is_err() {
            return Err(Error::config(format!(
                "base_url is not a valid URL: {:?}",
                self.service.base_url
            )));
        }

        for (section, entities) in [("cities", &self.cities), ("departments", &self.departments)] {
            let mut seen = HashSet::new();
            for entity in entities {
                if !seen.insert(entity.short_name.as_str()) {
                    return Err(Error::config(format!(
                        "duplicate short_name {:?} in {section}",
                        entity.short_name
                    )));
                }
            }
        }

        Ok(())
    }

    /// Resolve city short codes; no codes selects every city
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownEntity` for a code missing from the catalog and
    /// `Error::Config` when nothing is left to track
    pub fn select_cities(&self, codes: &[String]) -> Result<Vec<Arc<Entity>>> {
        let selected: Vec<Arc<Entity>> = if codes.is_empty() {
            self.cities.iter().cloned().map(Arc::new).collect()
        } else {
            codes
                .iter()
                .map(|code| {
                    self.cities
                        .iter()
                        .find(|city| city.short_name == *code)
                        .cloned()
                        .map(Arc::new)
                        .ok_or_else(|| Error::unknown_entity("city", code.clone()))
                })
                .collect::<Result<_>>()?
        };

        if selected.is_empty() {
            return Err(Error::config("no cities configured"));
        }
        Ok(selected)
    }

    /// Resolve exactly one department short code
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownEntity` when the code is not in the catalog
    pub fn select_department(&self, code: &str) -> Result<Arc<Entity>> {
        self.departments
            .iter()
            .find(|department| department.short_name == code)
            .cloned()
            .map(Arc::new)
            .ok_or_else(|| Error::unknown_entity("department", code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[service]
base_url = "http://localhost:8080"
accept_invalid_certs = true

[pipeline]
workers = 2
lock_race = "first_success"
on_success = "keep_hunting"
max_send_attempts = 5

[[cities]]
name = "Wrocław"
short_name = "WRO"
queue = "10"
id = "100"

[[cities]]
name = "Legnica"
short_name = "LG"
queue = "11"
id = "110"

[[departments]]
name = "Head of the LP I department"
short_name = "LP1"
queue = "20"
id = "200"
"#;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_sample() {
        let config = Config::from_toml(SAMPLE).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.pipeline.workers, 2);
        assert_eq!(config.pipeline.lock_fanout, 5);
        assert_eq!(config.pipeline.lock_race, LockRace::FirstSuccess);
        assert_eq!(config.pipeline.on_success, SuccessPolicy::KeepHunting);
        assert_eq!(config.pipeline.retry_policy(), RetryPolicy::bounded(5));
        assert!(config.service.accept_invalid_certs);
        assert_eq!(config.cities[0].kind, EntityKind::City);
        assert_eq!(config.departments[0].kind, EntityKind::Department);
    }

    #[test]
    fn test_invalid_workers() {
        let mut config = Config::default();
        config.pipeline.workers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_base_url() {
        let mut config = Config::default();
        config.service.base_url = String::from("nope");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_short_name() {
        let mut config = Config::from_toml(SAMPLE).unwrap();
        let duplicate = config.cities[0].clone();
        config.cities.push(duplicate);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_select_all_cities() {
        let config = Config::from_toml(SAMPLE).unwrap();
        let cities = config.select_cities(&[]).unwrap();
        assert_eq!(cities.len(), 2);
    }

    #[test]
    fn test_select_some_cities() {
        let config = Config::from_toml(SAMPLE).unwrap();
        let cities = config.select_cities(&["LG".to_string()]).unwrap();
        assert_eq!(cities.len(), 1);
        assert_eq!(cities[0].name, "Legnica");
    }

    #[test]
    fn test_unknown_city_is_fatal() {
        let config = Config::from_toml(SAMPLE).unwrap();
        let err = config
            .select_cities(&["WRO".to_string(), "XYZ".to_string()])
            .unwrap_err();
        assert!(matches!(err, Error::UnknownEntity { kind: "city", .. }));
    }

    #[test]
    fn test_select_department() {
        let config = Config::from_toml(SAMPLE).unwrap();
        let department = config.select_department("LP1").unwrap();
        assert_eq!(department.queue, "20");
        assert_eq!(department.kind, EntityKind::Department);

        let err = config.select_department("LP2").unwrap_err();
        assert_eq!(err.to_string(), "Unknown department [LP2]");
    }

    #[test]
    fn test_scan_interval_conversion() {
        let mut config = Config::default();
        config.pipeline.scan_interval_ms = 250;
        assert_eq!(config.pipeline.scan_interval(), Duration::from_millis(250));
    }
}
