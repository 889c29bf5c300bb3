mod config;
pub mod database;
pub mod migrations;
mod snapshot;

pub use config::{AppSettings, Config, ScrambleConfig, SettingsPatch, INSPECTION_CHOICES};
pub use database::Database;
pub use snapshot::{JsonFileStore, Snapshot, SnapshotStore};

use std::path::PathBuf;

use crate::error::StorageError;

/// Returns `~/.config/cubetimer[-dev]/` based on CUBETIMER_ENV.
///
/// Set CUBETIMER_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, StorageError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("CUBETIMER_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("cubetimer-dev")
    } else {
        base_dir.join("cubetimer")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| StorageError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
