//! Runtime configuration.
//!
//! Resolved once at startup and passed into the session. Nothing in the core
//! reads the process environment while handling user intents.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::DEFAULT_FUZZY_THRESHOLD;
use crate::clinical::UnevaluatedAlertPolicy;

/// File name of the patient profile export.
pub const PROFILES_FILE_NAME: &str = "patient_profiles_rxchecker.json";

/// Medications shown before "show all" is requested.
pub const DEFAULT_DISPLAY_LIMIT: usize = 8;

pub const DEFAULT_LOG_FILTER: &str = "arm=info";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Clinical values assumed when a lookup returns a partial record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileDefaults {
    pub conditions: Vec<String>,
    pub creatinine: f64,
    pub creatinine_clearance: f64,
    pub current_medications: Vec<String>,
}

impl Default for ProfileDefaults {
    fn default() -> Self {
        Self {
            conditions: vec!["Hipertensão".into(), "Diabetes Tipo 2".into()],
            creatinine: 1.2,
            creatinine_clearance: 65.0,
            current_medications: vec!["Lisinopril".into(), "Metformina".into()],
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArmConfig {
    /// Directory holding the patient profile file
    pub data_dir: PathBuf,
    pub profiles_file: String,
    /// Copy the profile file from the user's Desktop when missing
    pub desktop_fallback: bool,
    pub display_limit: usize,
    pub unevaluated_alerts: UnevaluatedAlertPolicy,
    pub fuzzy_threshold: f64,
    pub log_filter: String,
    pub profile_defaults: ProfileDefaults,
}

impl Default for ArmConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data").join("patients"),
            profiles_file: PROFILES_FILE_NAME.into(),
            desktop_fallback: true,
            display_limit: DEFAULT_DISPLAY_LIMIT,
            unevaluated_alerts: UnevaluatedAlertPolicy::default(),
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            log_filter: DEFAULT_LOG_FILTER.into(),
            profile_defaults: ProfileDefaults::default(),
        }
    }
}

impl ArmConfig {
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Apply `ARM_DATA_DIR`, `ARM_DISPLAY_LIMIT` and `ARM_LOG` overrides.
    ///
    /// `lookup` is the variable source, normally `|k| std::env::var(k).ok()`.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(dir) = value("ARM_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(limit) = value("ARM_DISPLAY_LIMIT") {
            self.display_limit = limit.parse().map_err(|_| {
                ConfigError::InvalidValue(format!("ARM_DISPLAY_LIMIT is not a number: {}", limit))
            })?;
        }
        if let Some(filter) = value("ARM_LOG") {
            self.log_filter = filter;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.display_limit == 0 {
            return Err(ConfigError::InvalidValue(
                "display_limit must be at least 1".into(),
            ));
        }
        if !(self.fuzzy_threshold > 0.0 && self.fuzzy_threshold <= 1.0) {
            return Err(ConfigError::InvalidValue(format!(
                "fuzzy_threshold must be in (0, 1], got {}",
                self.fuzzy_threshold
            )));
        }
        if self.profiles_file.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "profiles_file cannot be empty".into(),
            ));
        }
        Ok(())
    }

    /// Full path of the patient profile file.
    pub fn profiles_path(&self) -> PathBuf {
        self.data_dir.join(&self.profiles_file)
    }
}
