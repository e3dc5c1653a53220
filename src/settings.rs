use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::SettingsError;

const APP_DIRECTORY_NAME: &str = "citizenmon";
const HIDDEN_APP_DIRECTORY_NAME: &str = ".citizenmon";
const STATS_DIRECTORY_NAME: &str = "feeds";
const SETTINGS_FILE_NAME: &str = "settings.json";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerSettings {
    pub log_path: Option<PathBuf>,
    pub stats_dir: Option<PathBuf>,
    pub show_raw_lines: bool,
    pub report_unattributed_state_changes: bool,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            log_path: None,
            stats_dir: None,
            show_raw_lines: false,
            report_unattributed_state_changes: true,
        }
    }
}

impl TrackerSettings {
    pub fn resolved_stats_dir(&self) -> Result<PathBuf, String> {
        match &self.stats_dir {
            Some(stats_dir) => Ok(stats_dir.clone()),
            None => default_stats_dir(),
        }
    }
}

pub fn load_settings(path: &Path) -> Result<TrackerSettings, SettingsError> {
    let raw_json = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(error) if error.kind() == ErrorKind::NotFound => {
            tracing::debug!(settings_path = %path.display(), "No settings file, using defaults");
            return Ok(TrackerSettings::default());
        }
        Err(source) => {
            return Err(SettingsError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    serde_json::from_str(&raw_json).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_configured_settings(config_path: Option<&Path>) -> Result<TrackerSettings, SettingsError> {
    load_settings_from(config_path, default_settings_path())
}

fn load_settings_from(
    config_path: Option<&Path>,
    default_path: Result<PathBuf, String>,
) -> Result<TrackerSettings, SettingsError> {
    if let Some(config_path) = config_path {
        return load_settings(config_path);
    }

    match default_path {
        Ok(settings_path) => load_settings(&settings_path),
        Err(error) => {
            tracing::warn!(settings_error = %error, "Using default settings");
            Ok(TrackerSettings::default())
        }
    }
}

pub fn default_settings_path() -> Result<PathBuf, String> {
    Ok(app_directory()?.join(SETTINGS_FILE_NAME))
}

pub fn default_stats_dir() -> Result<PathBuf, String> {
    Ok(app_directory()?.join(STATS_DIRECTORY_NAME))
}

fn app_directory() -> Result<PathBuf, String> {
    app_directory_from(
        std::env::var("APPDATA").ok(),
        std::env::var("USERPROFILE")
            .or_else(|_| std::env::var("HOME"))
            .ok(),
    )
    .ok_or_else(|| "Unable to determine home directory".to_string())
}

fn app_directory_from(app_data: Option<String>, home_dir: Option<String>) -> Option<PathBuf> {
    if let Some(app_data) = app_data.filter(|value| !value.trim().is_empty()) {
        return Some(Path::new(&app_data).join(APP_DIRECTORY_NAME));
    }

    home_dir
        .filter(|value| !value.trim().is_empty())
        .map(|home_dir| Path::new(&home_dir).join(HIDDEN_APP_DIRECTORY_NAME))
}
