//! drowse.toml configuration parser.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{CounterId, SamplerKey};

pub const DEFAULT_UPDATE_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_IDLE_TIMEOUT: u32 = 3;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DrowseConfig {
    #[serde(default)]
    pub defaults: SamplerConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub watch: Vec<WatchConfig>,
}

/// Defaults applied to samplers the registry creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplerConfig {
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,
    /// Ticks a sampler keeps polling after the last read.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout: u32,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            update_interval_ms: DEFAULT_UPDATE_INTERVAL_MS,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

/// One counter the CLI should watch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    pub category: String,
    pub counter: String,
    #[serde(default)]
    pub instance: String,
    pub interval_ms: Option<u64>,
    #[serde(default = "default_true")]
    pub easing: bool,
}

impl WatchConfig {
    pub fn counter_id(&self) -> CounterId {
        CounterId::new(&self.category, &self.counter, &self.instance)
    }

    /// The sampler key, falling back to the default interval.
    pub fn key(&self, defaults: &SamplerConfig) -> SamplerKey {
        SamplerKey {
            counter: self.counter_id(),
            interval_ms: self.interval_ms.unwrap_or(defaults.update_interval_ms),
        }
    }
}

impl DrowseConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: DrowseConfig = content.parse()?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.defaults.update_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "defaults.update_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.defaults.idle_timeout == 0 {
            return Err(ConfigError::Invalid(
                "defaults.idle_timeout must be greater than 0".to_string(),
            ));
        }
        for (i, w) in self.watch.iter().enumerate() {
            if w.category.trim().is_empty() || w.counter.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "watch[{i}]: category and counter are required"
                )));
            }
            if w.interval_ms == Some(0) {
                return Err(ConfigError::Invalid(format!(
                    "watch[{i}] ({}): interval_ms must be greater than 0",
                    w.counter_id()
                )));
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for DrowseConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(s)?)
    }
}

fn default_update_interval_ms() -> u64 {
    DEFAULT_UPDATE_INTERVAL_MS
}

fn default_idle_timeout() -> u32 {
    DEFAULT_IDLE_TIMEOUT
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config: DrowseConfig = "".parse().unwrap();
        assert_eq!(config.defaults.update_interval_ms, 1000);
        assert_eq!(config.defaults.idle_timeout, 3);
        assert_eq!(config.log.filter, "info");
        assert!(config.watch.is_empty());
        config.validate().unwrap();
    }

    #[test]
    fn parse_watch_entries() {
        let toml_str = r#"
[defaults]
update_interval_ms = 500

[log]
json = true

[[watch]]
category = "Processor"
counter = "% Processor Time"
instance = "_Total"

[[watch]]
category = "Memory"
counter = "Available MBytes"
interval_ms = 2000
easing = false
"#;
        let config: DrowseConfig = toml_str.parse().unwrap();
        config.validate().unwrap();
        assert!(config.log.json);
        assert_eq!(config.defaults.idle_timeout, 3);
        assert_eq!(config.watch.len(), 2);

        let cpu = &config.watch[0];
        assert!(cpu.easing);
        assert_eq!(
            cpu.key(&config.defaults),
            SamplerKey::new("Processor", "% Processor Time", "_Total", 500)
        );

        let mem = &config.watch[1];
        assert!(!mem.easing);
        assert_eq!(mem.instance, "");
        assert_eq!(mem.key(&config.defaults).interval_ms, 2000);
    }

    #[test]
    fn rejects_zero_interval() {
        let toml_str = r#"
[[watch]]
category = "Memory"
counter = "Available MBytes"
interval_ms = 0
"#;
        let config: DrowseConfig = toml_str.parse().unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("interval_ms"));
    }

    #[test]
    fn rejects_zero_idle_timeout() {
        let config: DrowseConfig = "[defaults]\nidle_timeout = 0\n".parse().unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_blank_counter() {
        let toml_str = r#"
[[watch]]
category = "Memory"
counter = " "
"#;
        let config: DrowseConfig = toml_str.parse().unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn round_trips_through_toml() {
        let mut config = DrowseConfig::default();
        config.watch.push(WatchConfig {
            category: "System".to_string(),
            counter: "Processes".to_string(),
            instance: String::new(),
            interval_ms: None,
            easing: true,
        });
        let text = config.to_toml_string().unwrap();
        assert!(text.contains("Processes"));
        let back: DrowseConfig = text.parse().unwrap();
        assert_eq!(back.watch.len(), 1);
    }
}
