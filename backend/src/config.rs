//! Engine configuration: window durations and reschedule rules.
//!
//! Values come from, in order of precedence:
//! 1. `ACCESS_*` environment variables
//! 2. the `[engine]` table of an `access.toml` file
//! 3. built-in defaults
//!
//! ```toml
//! [engine]
//! fixed_duration_minutes = 60
//! grace_duration_minutes = 30
//! min_reason_len = 10
//! max_reason_len = 500
//! min_lead_minutes = 60
//! max_horizon_days = 90
//! ```

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::db::repository::RepositoryError;

/// Runtime configuration of the access engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Length of a rescheduled (and default-assigned) window.
    pub fixed_duration: Duration,
    /// Grace period appended after the window end.
    pub grace_duration: Duration,
    /// Bounds on the trimmed reschedule reason, in characters.
    pub min_reason_len: usize,
    pub max_reason_len: usize,
    /// A new start closer than this to `now` produces a warning.
    pub min_lead_time: Duration,
    /// A new start further than this from `now` is rejected.
    pub max_horizon: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fixed_duration: Duration::minutes(default_fixed_duration_minutes()),
            grace_duration: Duration::minutes(default_grace_duration_minutes()),
            min_reason_len: default_min_reason_len(),
            max_reason_len: default_max_reason_len(),
            min_lead_time: Duration::minutes(default_min_lead_minutes()),
            max_horizon: Duration::days(default_max_horizon_days()),
        }
    }
}

/// File representation of the `[engine]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default = "default_fixed_duration_minutes")]
    pub fixed_duration_minutes: i64,
    #[serde(default = "default_grace_duration_minutes")]
    pub grace_duration_minutes: i64,
    #[serde(default = "default_min_reason_len")]
    pub min_reason_len: usize,
    #[serde(default = "default_max_reason_len")]
    pub max_reason_len: usize,
    #[serde(default = "default_min_lead_minutes")]
    pub min_lead_minutes: i64,
    #[serde(default = "default_max_horizon_days")]
    pub max_horizon_days: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    engine: EngineSettings,
}

fn default_fixed_duration_minutes() -> i64 {
    60
}

fn default_grace_duration_minutes() -> i64 {
    30
}

fn default_min_reason_len() -> usize {
    10
}

fn default_max_reason_len() -> usize {
    500
}

fn default_min_lead_minutes() -> i64 {
    60
}

fn default_max_horizon_days() -> i64 {
    90
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            fixed_duration_minutes: default_fixed_duration_minutes(),
            grace_duration_minutes: default_grace_duration_minutes(),
            min_reason_len: default_min_reason_len(),
            max_reason_len: default_max_reason_len(),
            min_lead_minutes: default_min_lead_minutes(),
            max_horizon_days: default_max_horizon_days(),
        }
    }
}

fn minutes_setting(name: &str, value: i64) -> Result<Duration, RepositoryError> {
    Duration::try_minutes(value).ok_or_else(|| {
        RepositoryError::configuration(format!("{} = {} is out of range", name, value))
    })
}

impl TryFrom<EngineSettings> for EngineConfig {
    type Error = RepositoryError;

    /// Fails on values too large to represent as a duration.
    fn try_from(s: EngineSettings) -> Result<Self, Self::Error> {
        Ok(Self {
            fixed_duration: minutes_setting("fixed_duration_minutes", s.fixed_duration_minutes)?,
            grace_duration: minutes_setting("grace_duration_minutes", s.grace_duration_minutes)?,
            min_reason_len: s.min_reason_len,
            max_reason_len: s.max_reason_len,
            min_lead_time: minutes_setting("min_lead_minutes", s.min_lead_minutes)?,
            max_horizon: Duration::try_days(s.max_horizon_days).ok_or_else(|| {
                RepositoryError::configuration(format!(
                    "max_horizon_days = {} is out of range",
                    s.max_horizon_days
                ))
            })?,
        })
    }
}

impl EngineSettings {
    /// Parse settings from TOML text. A missing `[engine]` table yields defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, RepositoryError> {
        let file: ConfigFile = toml::from_str(content).map_err(|e| {
            RepositoryError::configuration(format!("Failed to parse config file: {}", e))
        })?;
        Ok(file.engine)
    }

    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RepositoryError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            RepositoryError::configuration(format!("Failed to read config file: {}", e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Search `access.toml` in the current directory, `backend/` and the parent.
    pub fn from_default_location() -> Option<Result<Self, RepositoryError>> {
        let search_paths = [
            PathBuf::from("access.toml"),
            PathBuf::from("backend/access.toml"),
            PathBuf::from("../access.toml"),
        ];

        search_paths
            .iter()
            .find(|path| path.exists())
            .map(Self::from_file)
    }

    /// Override fields from `ACCESS_*` environment variables.
    pub fn apply_env(mut self) -> Result<Self, RepositoryError> {
        if let Some(v) = env_parse("ACCESS_FIXED_DURATION_MINUTES")? {
            self.fixed_duration_minutes = v;
        }
        if let Some(v) = env_parse("ACCESS_GRACE_DURATION_MINUTES")? {
            self.grace_duration_minutes = v;
        }
        if let Some(v) = env_parse("ACCESS_MIN_REASON_LEN")? {
            self.min_reason_len = v;
        }
        if let Some(v) = env_parse("ACCESS_MAX_REASON_LEN")? {
            self.max_reason_len = v;
        }
        if let Some(v) = env_parse("ACCESS_MIN_LEAD_MINUTES")? {
            self.min_lead_minutes = v;
        }
        if let Some(v) = env_parse("ACCESS_MAX_HORIZON_DAYS")? {
            self.max_horizon_days = v;
        }
        Ok(self)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>, RepositoryError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            RepositoryError::configuration(format!("{} must be a valid number, got '{}'", key, raw))
        }),
        Err(_) => Ok(None),
    }
}

impl EngineConfig {
    /// Defaults overridden by environment variables only.
    pub fn from_env() -> Result<Self, RepositoryError> {
        let config = Self::try_from(EngineSettings::default().apply_env()?)?;
        config.validate()?;
        Ok(config)
    }

    /// File (if one is found) then environment, then validation.
    pub fn load() -> Result<Self, RepositoryError> {
        let settings = match EngineSettings::from_default_location() {
            Some(result) => result?,
            None => EngineSettings::default(),
        };
        let config = Self::try_from(settings.apply_env()?)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot honour.
    pub fn validate(&self) -> Result<(), RepositoryError> {
        if self.fixed_duration <= Duration::zero() {
            return Err(RepositoryError::configuration(
                "fixed window duration must be positive",
            ));
        }
        if self.grace_duration < Duration::zero() {
            return Err(RepositoryError::configuration(
                "grace duration must not be negative",
            ));
        }
        if self.min_reason_len == 0 {
            return Err(RepositoryError::configuration(
                "minimum reason length must be at least 1",
            ));
        }
        if self.min_reason_len > self.max_reason_len {
            return Err(RepositoryError::configuration(format!(
                "minimum reason length {} exceeds maximum {}",
                self.min_reason_len, self.max_reason_len
            )));
        }
        if self.min_lead_time < Duration::zero() {
            return Err(RepositoryError::configuration(
                "minimum lead time must not be negative",
            ));
        }
        if self.max_horizon <= Duration::zero() {
            return Err(RepositoryError::configuration(
                "maximum scheduling horizon must be positive",
            ));
        }
        Ok(())
    }
}
