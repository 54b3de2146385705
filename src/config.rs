use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("no hydrometers configured")]
    NoHydrometers,
}

/// Run configuration loaded from a JSON file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Tilt color name to CSV log path.
    pub hydrometers: HashMap<String, PathBuf>,
    #[serde(default)]
    pub readings: ReadingSettings,
    #[serde(default)]
    pub mail_to: Vec<String>,
    #[serde(default)]
    pub mail_from: Option<String>,
}

/// Reading cycle settings with the historical defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadingSettings {
    /// Number of reading cycles per run.
    #[serde(default = "default_number")]
    pub number: u32,
    /// Pause between cycles.
    #[serde(default = "default_wait_seconds")]
    pub wait_seconds: f64,
    /// Give-up budget for the whole run.
    #[serde(default = "default_give_up_minutes")]
    pub give_up_minutes: f64,
}

fn default_number() -> u32 {
    1
}

fn default_wait_seconds() -> f64 {
    10.0
}

fn default_give_up_minutes() -> f64 {
    10.0
}

impl Default for ReadingSettings {
    fn default() -> Self {
        Self {
            number: default_number(),
            wait_seconds: default_wait_seconds(),
            give_up_minutes: default_give_up_minutes(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&raw)?;
        if config.hydrometers.is_empty() {
            return Err(ConfigError::NoHydrometers);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let raw = r#"{
            "hydrometers": {"Orange": "/var/log/tilt/orange.csv"},
            "readings": {"number": 3, "wait_seconds": 5.0, "give_up_minutes": 2.5},
            "mail_to": ["brewer@example.com"],
            "mail_from": "tilt@example.com"
        }"#;

        let config: Config = serde_json::from_str(raw).unwrap();
        assert_eq!(
            config.hydrometers.get("Orange"),
            Some(&PathBuf::from("/var/log/tilt/orange.csv"))
        );
        assert_eq!(config.readings.number, 3);
        assert_eq!(config.readings.wait_seconds, 5.0);
        assert_eq!(config.readings.give_up_minutes, 2.5);
        assert_eq!(config.mail_to, vec!["brewer@example.com"]);
        assert_eq!(config.mail_from.as_deref(), Some("tilt@example.com"));
    }

    #[test]
    fn reading_settings_default_when_omitted() {
        let raw = r#"{"hydrometers": {"Red": "red.csv"}}"#;
        let config: Config = serde_json::from_str(raw).unwrap();
        assert_eq!(config.readings.number, 1);
        assert_eq!(config.readings.wait_seconds, 10.0);
        assert_eq!(config.readings.give_up_minutes, 10.0);
        assert!(config.mail_to.is_empty());
        assert!(config.mail_from.is_none());
    }

    #[test]
    fn partial_reading_settings_fill_in_defaults() {
        let raw = r#"{"hydrometers": {"Red": "red.csv"}, "readings": {"number": 4}}"#;
        let config: Config = serde_json::from_str(raw).unwrap();
        assert_eq!(config.readings.number, 4);
        assert_eq!(config.readings.wait_seconds, 10.0);
    }
}
