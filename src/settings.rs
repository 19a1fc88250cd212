//! Persisted user settings

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::LOCAL_STORAGE_ID;
use crate::error::Result;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct SettingsData {
    /// Whether the initial setup has never been completed
    first_run: bool,
    /// ID of the storage new task lists are created in
    storage_location: String,
}

impl Default for SettingsData {
    fn default() -> Self {
        Self {
            first_run: true,
            storage_location: LOCAL_STORAGE_ID.to_string(),
        }
    }
}

/// The settings of the application.
///
/// Every change is written to the backing file (if any) right away.
#[derive(Debug, PartialEq)]
pub struct Settings {
    backing_file: Option<PathBuf>,
    data: SettingsData,
}

impl Settings {
    /// The default location of the settings file, if the platform has a config directory
    pub fn default_file() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("todo-larder").join("settings.json"))
    }

    /// Settings that are not saved anywhere
    pub fn in_memory() -> Self {
        Self { backing_file: None, data: SettingsData::default() }
    }

    /// Load the settings from a file.
    /// Default settings are used in case the file does not exist yet
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = match std::fs::File::open(path) {
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No settings file at {:?}, using the default settings", path);
                SettingsData::default()
            },
            Err(err) => return Err(err.into()),
            Ok(file) => serde_json::from_reader(file)?,
        };

        Ok(Self {
            backing_file: Some(PathBuf::from(path)),
            data,
        })
    }

    /// Store the current settings to the backing file
    pub fn save_to_file(&self) -> Result<()> {
        let path = match &self.backing_file {
            None => return Ok(()),
            Some(path) => path,
        };
        if let Some(folder) = path.parent() {
            std::fs::create_dir_all(folder)?;
        }
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, &self.data)?;
        Ok(())
    }

    fn save_or_warn(&self) {
        if let Err(err) = self.save_to_file() {
            log::warn!("Unable to save settings to {:?}: {}", self.backing_file, err);
        }
    }

    pub fn first_run(&self) -> bool {
        self.data.first_run
    }

    pub fn set_first_run(&mut self, first_run: bool) {
        self.data.first_run = first_run;
        self.save_or_warn();
    }

    pub fn storage_location(&self) -> &str {
        &self.data.storage_location
    }

    pub fn set_storage_location(&mut self, location: &str) {
        self.data.storage_location = location.to_string();
        self.save_or_warn();
    }
}
