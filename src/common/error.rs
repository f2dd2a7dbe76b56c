//! Error types for the fallible edges of the game: configuration and persistence.
//!
//! Gameplay systems never fail. Only loading and saving can, and their callers
//! log the error and carry on with defaults.

use std::fmt;
use std::io;
use std::path::PathBuf;

#[derive(Debug)]
pub enum GameError {
    /// Reading or writing a file failed.
    Io { path: PathBuf, source: io::Error },

    /// The persisted progress file is not valid JSON for `PersistedProgress`.
    Json { path: PathBuf, source: serde_json::Error },

    /// The tunables file is not valid TOML for `Tunables`.
    Toml { path: PathBuf, source: toml::de::Error },

    /// No data directory could be resolved, so there is nowhere to save.
    StorageUnavailable,
}

impl fmt::Display for GameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameError::Io { path, source } => {
                write!(f, "i/o error on '{}': {}", path.display(), source)
            }
            GameError::Json { path, source } => {
                write!(f, "invalid progress data in '{}': {}", path.display(), source)
            }
            GameError::Toml { path, source } => {
                write!(f, "invalid tunables in '{}': {}", path.display(), source)
            }
            GameError::StorageUnavailable => write!(f, "no writable data directory available"),
        }
    }
}

impl std::error::Error for GameError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GameError::Io { source, .. } => Some(source),
            GameError::Json { source, .. } => Some(source),
            GameError::Toml { source, .. } => Some(source),
            GameError::StorageUnavailable => None,
        }
    }
}

impl GameError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        GameError::Io { path: path.into(), source }
    }

    /// True when the underlying cause is a file that simply does not exist yet.
    pub fn is_not_found(&self) -> bool {
        matches!(self, GameError::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

pub type GameResult<T> = Result<T, GameError>;
