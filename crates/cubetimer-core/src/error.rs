//! Core error types for cubetimer-core.
//!
//! The timer, the solve store and the statistics engine never fail: invalid
//! transitions and unknown ids are ordinary flow control. Errors only exist at
//! the boundaries (configuration, validation, persistence, collaborators).

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for cubetimer-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Persistence-related errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Scramble generator errors
    #[error("Scramble error: {0}")]
    Scramble(#[from] ScrambleError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Snapshot storage errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// A stored row could not be turned back into a record
    #[error("Corrupt row in '{table}': {message}")]
    CorruptRow { table: String, message: String },

    /// The data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Name was empty after trimming
    #[error("Name for {0} must not be empty")]
    EmptyName(String),

    /// Inspection duration outside the supported set
    #[error("Inspection time must be one of 8, 15 or 30 seconds (got {0})")]
    InspectionTime(u32),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Scramble generator errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScrambleError {
    /// The generator does not know this puzzle
    #[error("Unsupported cube type: {0}")]
    UnsupportedCubeType(String),

    /// The generator produced nothing usable
    #[error("Generator returned an empty scramble for {0}")]
    Empty(String),

    /// Any other collaborator failure
    #[error("Scramble generator failed: {0}")]
    Failed(String),
}

/// Audio feedback errors. Always swallowed by the caller after logging.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedbackError {
    /// The host has no audio output
    #[error("Audio playback unsupported")]
    Unsupported,

    /// Playback started but failed
    #[error("Audio playback failed: {0}")]
    PlaybackFailed(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _msg) => {
                if code.code == rusqlite::ErrorCode::DatabaseLocked {
                    StorageError::Locked
                } else {
                    StorageError::QueryFailed(err.to_string())
                }
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Storage(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
