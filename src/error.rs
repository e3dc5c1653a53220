use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to access stats file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize stats: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to finalize stats file '{path}': {message}")]
    Finalize { path: PathBuf, message: String },
}

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to read game log '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("file watcher error: {0}")]
    Notify(#[from] notify::Error),

    #[error("invalid game log path '{0}'")]
    InvalidPath(PathBuf),
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
