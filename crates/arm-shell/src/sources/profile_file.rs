//! Patient profile export on disk.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use arm_core::models::PatientProfile;
use arm_core::profiles::{PatientSource, SourceError, SourceResult};
use arm_core::{ArmConfig, ProfileDefaults};

use super::{into_profiles, ProfileRecord};

/// Accepted layouts of the export: a bare array or `{ "profiles": [...] }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ProfileDocument {
    List(Vec<ProfileRecord>),
    Wrapped {
        #[serde(default)]
        profiles: Vec<ProfileRecord>,
    },
}

/// JSON profile file. A missing file is an empty source.
#[derive(Debug, Clone)]
pub struct ProfileFile {
    path: PathBuf,
    defaults: ProfileDefaults,
}

impl ProfileFile {
    pub fn new<P: Into<PathBuf>>(path: P, defaults: ProfileDefaults) -> Self {
        Self {
            path: path.into(),
            defaults,
        }
    }

    pub fn from_config(config: &ArmConfig) -> Self {
        Self::new(config.profiles_path(), config.profile_defaults.clone())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Raw records in file order.
    pub fn read_records(&self) -> SourceResult<Vec<ProfileRecord>> {
        read_records(&self.path)
    }

    /// Copy the export from the user's Desktop when the data file is absent.
    ///
    /// Returns `true` if a file was copied.
    pub fn copy_from_desktop_if_needed(&self) -> SourceResult<bool> {
        match dirs::desktop_dir() {
            Some(desktop) => self.copy_from_dir_if_needed(&desktop),
            None => {
                tracing::warn!("No Desktop directory on this platform; skipping profile copy");
                Ok(false)
            }
        }
    }

    /// Copy `<dir>/<file name>` into place when the data file is absent.
    pub fn copy_from_dir_if_needed(&self, dir: &Path) -> SourceResult<bool> {
        if self.exists() {
            tracing::debug!(path = %self.path.display(), "patient profiles already present");
            return Ok(false);
        }

        let file_name = self.path.file_name().ok_or_else(|| {
            SourceError::Format(format!("{} has no file name", self.path.display()))
        })?;
        let candidate = dir.join(file_name);
        if !candidate.is_file() {
            tracing::warn!(
                path = %candidate.display(),
                "patient profiles not found; continuing with manual patient input only"
            );
            return Ok(false);
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(&candidate, &self.path)?;
        tracing::info!(
            from = %candidate.display(),
            to = %self.path.display(),
            "patient profiles copied"
        );
        Ok(true)
    }
}

impl PatientSource for ProfileFile {
    fn load_all(&self) -> SourceResult<Vec<PatientProfile>> {
        Ok(into_profiles(self.read_records()?, &self.defaults))
    }
}

/// Read profile records from `path`; an absent file yields none.
pub(crate) fn read_records(path: &Path) -> SourceResult<Vec<ProfileRecord>> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "no patient profile file");
        return Ok(Vec::new());
    }

    let json = fs::read_to_string(path)?;
    let document: ProfileDocument = serde_json::from_str(&json).map_err(|e| {
        SourceError::Format(format!("{}: {}", path.display(), e))
    })?;

    Ok(match document {
        ProfileDocument::List(records) => records,
        ProfileDocument::Wrapped { profiles } => profiles,
    })
}
