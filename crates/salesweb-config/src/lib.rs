//! Configuration management for salesweb
//!
//! This module handles loading, validation, and management of
//! salesweb configuration from YAML files.

pub mod error;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use error::{ConfigError, ConfigResult};

// ==================== Configuration Types ====================

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,
    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8081
}

/// Record batch directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Root directory holding the fetched record batches
    #[serde(default = "default_data_path")]
    pub path: PathBuf,
    /// Sub-directory with payment batches (relative to path)
    #[serde(default = "default_payments_dir")]
    pub payments_dir: String,
    /// Sub-directory with referral batches (relative to path)
    #[serde(default = "default_referrals_dir")]
    pub referrals_dir: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: default_data_path(),
            payments_dir: default_payments_dir(),
            referrals_dir: default_referrals_dir(),
        }
    }
}

fn default_data_path() -> PathBuf {
    PathBuf::from("./data")
}

fn default_payments_dir() -> String {
    "payments".to_string()
}

fn default_referrals_dir() -> String {
    "referrals".to_string()
}

/// Report defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// IANA timezone name of the reporting calendar
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Default bucket width
    #[serde(default)]
    pub default_interval: Interval,
    /// Default grouping dimension
    #[serde(default)]
    pub default_dimension: Dimension,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            default_interval: Interval::default(),
            default_dimension: Dimension::default(),
        }
    }
}

fn default_timezone() -> String {
    "UTC".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level() }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Bucket width for period aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    Daily,
    /// Buckets anchored on the Monday of the ISO week
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl Default for Interval {
    fn default() -> Self {
        Interval::Monthly
    }
}

impl std::str::FromStr for Interval {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(Interval::Daily),
            "weekly" => Ok(Interval::Weekly),
            "monthly" => Ok(Interval::Monthly),
            "quarterly" => Ok(Interval::Quarterly),
            "yearly" => Ok(Interval::Yearly),
            _ => Err(format!("Invalid interval: {}", s)),
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Interval::Daily => write!(f, "daily"),
            Interval::Weekly => write!(f, "weekly"),
            Interval::Monthly => write!(f, "monthly"),
            Interval::Quarterly => write!(f, "quarterly"),
            Interval::Yearly => write!(f, "yearly"),
        }
    }
}

/// Secondary grouping key inside a period bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    /// One row per native currency
    Currency,
    /// One row per referral code (and currency)
    RefCode,
}

impl Default for Dimension {
    fn default() -> Self {
        Dimension::Currency
    }
}

impl std::str::FromStr for Dimension {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "currency" => Ok(Dimension::Currency),
            "ref_code" | "refcode" => Ok(Dimension::RefCode),
            _ => Err(format!("Invalid dimension: {}", s)),
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dimension::Currency => write!(f, "currency"),
            Dimension::RefCode => write!(f, "ref_code"),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Record batch settings
    #[serde(default)]
    pub data: DataConfig,
    /// Report defaults
    #[serde(default)]
    pub report: ReportConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::FileNotFound {
                path: path.display().to_string(),
            },
            _ => ConfigError::IoError { message: e.to_string() },
        })?;

        let config = Self::from_yaml(&content)?;
        log::debug!(target: "salesweb::config", "Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)
            .map_err(|e| ConfigError::InvalidYaml { message: e.to_string() })?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                reason: "Port must be greater than 0".to_string(),
            });
        }

        self.timezone()?;

        for (field, dir) in [
            ("data.payments_dir", &self.data.payments_dir),
            ("data.referrals_dir", &self.data.referrals_dir),
        ] {
            if dir.is_empty() || dir.contains("..") {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    reason: "Directory must be a non-empty path inside data.path".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Resolve the configured reporting timezone
    pub fn timezone(&self) -> ConfigResult<Tz> {
        self.report.timezone.parse::<Tz>().map_err(|e| ConfigError::InvalidValue {
            field: "report.timezone".to_string(),
            reason: format!("Unknown timezone '{}': {}", self.report.timezone, e),
        })
    }

    /// Generate a default configuration file
    pub fn generate_default() -> &'static str {
        include_str!("../templates/default_config.yaml")
    }

    /// Directory holding the batches of one record kind
    pub fn batch_dir(&self, kind_dir: &str) -> PathBuf {
        self.data.path.join(kind_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_template_parses() {
        let config = Config::from_yaml(Config::generate_default()).unwrap();
        assert_eq!(config.report.default_interval, Interval::Monthly);
        assert_eq!(config.timezone().unwrap(), Tz::UTC);
    }

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config.server.port, 8081);
        assert_eq!(config.data.payments_dir, "payments");
        assert_eq!(config.report.default_dimension, Dimension::Currency);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_invalid_timezone_rejected() {
        let err = Config::from_yaml("report:\n  timezone: Mars/Olympus\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "report.timezone"));
    }

    #[test]
    fn test_batch_dir_outside_data_path_rejected() {
        let err = Config::from_yaml("data:\n  payments_dir: ../elsewhere\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "data.payments_dir"));
    }

    #[test]
    fn test_zero_port_rejected() {
        let err = Config::from_yaml("server:\n  port: 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "server.port"));
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load(Path::new("/nonexistent/salesweb.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn test_interval_from_str() {
        assert_eq!("daily".parse::<Interval>().unwrap(), Interval::Daily);
        assert_eq!("Weekly".parse::<Interval>().unwrap(), Interval::Weekly);
        assert_eq!("QUARTERLY".parse::<Interval>().unwrap(), Interval::Quarterly);
        assert!("fortnightly".parse::<Interval>().is_err());
        assert_eq!(Interval::Yearly.to_string(), "yearly");
    }

    #[test]
    fn test_dimension_from_str() {
        assert_eq!("currency".parse::<Dimension>().unwrap(), Dimension::Currency);
        assert_eq!("ref_code".parse::<Dimension>().unwrap(), Dimension::RefCode);
        assert!("vm".parse::<Dimension>().is_err());
    }
}
