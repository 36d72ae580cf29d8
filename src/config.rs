use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const CONFIG_PATH_ENV: &str = "FTOS_CHECK_CONFIG";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub snmp: SnmpConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Thresholds {
    #[serde(default = "default_uptime_crit_secs")]
    pub uptime_crit_secs: u64,
    #[serde(default = "default_uptime_warn_secs")]
    pub uptime_warn_secs: u64,
    #[serde(default = "default_psu_usage_warn_percent")]
    pub psu_usage_warn_percent: i64,
    #[serde(default = "default_psu_usage_crit_percent")]
    pub psu_usage_crit_percent: i64,
    #[serde(default = "default_cpu_warn_percent")]
    pub cpu_warn_percent: i64,
    #[serde(default = "default_cpu_crit_percent")]
    pub cpu_crit_percent: i64,
    #[serde(default = "default_mem_warn_percent")]
    pub mem_warn_percent: i64,
    #[serde(default = "default_mem_crit_percent")]
    pub mem_crit_percent: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SnmpConfig {
    #[serde(default = "default_snmp_version")]
    pub version: String,
    #[serde(default = "default_snmp_port")]
    pub port: u16,
    #[serde(default = "default_snmp_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_snmp_retries")]
    pub retries: u32,
    #[serde(default = "default_snmpget_path")]
    pub snmpget_path: String,
    #[serde(default = "default_snmpwalk_path")]
    pub snmpwalk_path: String,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            uptime_crit_secs: default_uptime_crit_secs(),
            uptime_warn_secs: default_uptime_warn_secs(),
            psu_usage_warn_percent: default_psu_usage_warn_percent(),
            psu_usage_crit_percent: default_psu_usage_crit_percent(),
            cpu_warn_percent: default_cpu_warn_percent(),
            cpu_crit_percent: default_cpu_crit_percent(),
            mem_warn_percent: default_mem_warn_percent(),
            mem_crit_percent: default_mem_crit_percent(),
        }
    }
}

impl Default for SnmpConfig {
    fn default() -> Self {
        Self {
            version: default_snmp_version(),
            port: default_snmp_port(),
            timeout_secs: default_snmp_timeout_secs(),
            retries: default_snmp_retries(),
            snmpget_path: default_snmpget_path(),
            snmpwalk_path: default_snmpwalk_path(),
        }
    }
}

impl SnmpConfig {
    pub fn command_deadline(&self) -> Duration {
        let attempts = u64::from(self.retries).saturating_add(1);
        Duration::from_secs(self.timeout_secs.saturating_mul(attempts).saturating_add(2))
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse YAML in {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("invalid configuration: {0}")]
    Validation(String),
}

impl Config {
    pub fn load_from_env() -> Result<Self, ConfigError> {
        match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::load_from_file(path.trim()),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let path_display = path_ref.display().to_string();
        let text = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_display.clone(),
            source,
        })?;
        Self::from_yaml(&text, &path_display)
    }

    fn from_yaml(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let cfg: Config = serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_thresholds(&self.thresholds)?;
        validate_snmp(&self.snmp)?;
        Ok(())
    }

    pub fn example_yaml() -> &'static str {
        include_str!("../config.yaml.example")
    }
}

fn validate_thresholds(t: &Thresholds) -> Result<(), ConfigError> {
    if t.uptime_crit_secs > t.uptime_warn_secs {
        return Err(ConfigError::Validation(
            "thresholds.uptime_crit_secs must be <= uptime_warn_secs".to_string(),
        ));
    }

    let pairs = [
        ("psu_usage", t.psu_usage_warn_percent, t.psu_usage_crit_percent),
        ("cpu", t.cpu_warn_percent, t.cpu_crit_percent),
        ("mem", t.mem_warn_percent, t.mem_crit_percent),
    ];
    for (name, warn, crit) in pairs {
        if !(0..=100).contains(&warn) || !(0..=100).contains(&crit) {
            return Err(ConfigError::Validation(format!(
                "thresholds.{name}_*_percent must be in range 0..100"
            )));
        }
        if warn > crit {
            return Err(ConfigError::Validation(format!(
                "thresholds.{name}_warn_percent must be <= {name}_crit_percent"
            )));
        }
    }
    Ok(())
}

fn validate_snmp(cfg: &SnmpConfig) -> Result<(), ConfigError> {
    if !matches!(cfg.version.as_str(), "1" | "2c") {
        return Err(ConfigError::Validation(format!(
            "snmp.version '{}' is not supported, use '1' or '2c'",
            cfg.version
        )));
    }
    if cfg.port == 0 {
        return Err(ConfigError::Validation(
            "snmp.port must be in range 1..65535".to_string(),
        ));
    }
    if cfg.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "snmp.timeout_secs must be >= 1".to_string(),
        ));
    }
    if cfg.snmpget_path.trim().is_empty() || cfg.snmpwalk_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "snmp.snmpget_path and snmp.snmpwalk_path must not be empty".to_string(),
        ));
    }
    Ok(())
}

const fn default_uptime_crit_secs() -> u64 {
    600
}

const fn default_uptime_warn_secs() -> u64 {
    1800
}

const fn default_psu_usage_warn_percent() -> i64 {
    75
}

const fn default_psu_usage_crit_percent() -> i64 {
    90
}

const fn default_cpu_warn_percent() -> i64 {
    85
}

const fn default_cpu_crit_percent() -> i64 {
    95
}

const fn default_mem_warn_percent() -> i64 {
    75
}

const fn default_mem_crit_percent() -> i64 {
    90
}

fn default_snmp_version() -> String {
    "2c".to_string()
}

const fn default_snmp_port() -> u16 {
    161
}

const fn default_snmp_timeout_secs() -> u64 {
    5
}

const fn default_snmp_retries() -> u32 {
    1
}

fn default_snmpget_path() -> String {
    "snmpget".to_string()
}

fn default_snmpwalk_path() -> String {
    "snmpwalk".to_string()
}
