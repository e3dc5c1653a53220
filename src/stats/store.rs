use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::StatsRecord;
use crate::error::PersistenceError;

const STATS_FILE_SUFFIX: &str = "_stats.json";

pub trait StatsStore {
    fn load(&self, player: &str) -> StatsRecord;

    fn save(&mut self, player: &str, record: &StatsRecord) -> Result<(), PersistenceError>;
}

#[derive(Debug, Clone)]
pub struct JsonStatsStore {
    directory: PathBuf,
}

impl JsonStatsStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn stats_file_path(&self, player: &str) -> PathBuf {
        self.directory
            .join(format!("{}{STATS_FILE_SUFFIX}", sanitize_player_key(player)))
    }

    pub fn list_players(&self) -> Result<Vec<String>, PersistenceError> {
        let entries = match std::fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(PersistenceError::Io {
                    path: self.directory.clone(),
                    source,
                })
            }
        };

        let mut players = Vec::new();
        for entry_result in entries {
            let entry = entry_result.map_err(|source| PersistenceError::Io {
                path: self.directory.clone(),
                source,
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let Some(player) = path
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| name.strip_suffix(STATS_FILE_SUFFIX))
                .filter(|name| !name.is_empty())
            else {
                continue;
            };
            players.push(player.to_string());
        }

        players.sort();
        Ok(players)
    }
}

impl StatsStore for JsonStatsStore {
    fn load(&self, player: &str) -> StatsRecord {
        if player.is_empty() {
            return StatsRecord::default();
        }

        let stats_path = self.stats_file_path(player);
        let raw_json = match std::fs::read_to_string(&stats_path) {
            Ok(content) => content,
            Err(error) if error.kind() == ErrorKind::NotFound => return StatsRecord::default(),
            Err(error) => {
                tracing::warn!(
                    stats_path = %stats_path.display(),
                    stats_error = %error,
                    "Failed to read stats, starting from empty"
                );
                return StatsRecord::default();
            }
        };

        serde_json::from_str::<StatsRecord>(&raw_json).unwrap_or_else(|error| {
            tracing::warn!(
                stats_path = %stats_path.display(),
                stats_error = %error,
                "Failed to parse stats, starting from empty"
            );
            StatsRecord::default()
        })
    }

    fn save(&mut self, player: &str, record: &StatsRecord) -> Result<(), PersistenceError> {
        if player.is_empty() {
            return Ok(());
        }

        std::fs::create_dir_all(&self.directory).map_err(|source| PersistenceError::Io {
            path: self.directory.clone(),
            source,
        })?;

        let stats_path = self.stats_file_path(player);
        let temp_path = temporary_stats_path(&stats_path);
        let serialized = serde_json::to_string_pretty(record)?;

        std::fs::write(&temp_path, serialized).map_err(|source| PersistenceError::Io {
            path: temp_path.clone(),
            source,
        })?;

        if let Err(error) = std::fs::rename(&temp_path, &stats_path) {
            let cleanup_error = std::fs::remove_file(&temp_path).err();
            let message = match cleanup_error {
                Some(cleanup_error) => format!(
                    "{error}; temporary cleanup failed '{}': {cleanup_error}",
                    temp_path.display()
                ),
                None => error.to_string(),
            };

            return Err(PersistenceError::Finalize {
                path: stats_path,
                message,
            });
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStatsStore {
    records: HashMap<String, StatsRecord>,
}

impl StatsStore for MemoryStatsStore {
    fn load(&self, player: &str) -> StatsRecord {
        self.records.get(player).cloned().unwrap_or_default()
    }

    fn save(&mut self, player: &str, record: &StatsRecord) -> Result<(), PersistenceError> {
        self.records.insert(player.to_string(), record.clone());
        Ok(())
    }
}

pub(crate) fn sanitize_player_key(player: &str) -> String {
    player
        .trim()
        .chars()
        .map(|character| {
            if character.is_ascii_alphanumeric() || matches!(character, '_' | '-') {
                character
            } else {
                '_'
            }
        })
        .collect()
}

fn temporary_stats_path(stats_path: &Path) -> PathBuf {
    let Some(file_name) = stats_path.file_name().and_then(|value| value.to_str()) else {
        return stats_path.with_extension("json.tmp");
    };

    stats_path.with_file_name(format!("{file_name}.tmp"))
}
