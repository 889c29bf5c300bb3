//! The persisted application state and the stores that hold it.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

use super::config::AppSettings;
use crate::error::{CoreError, Result};
use crate::session::{Session, SessionManager, DEFAULT_CUBE_TYPE};

/// Everything needed to restore the timer after a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub sessions: Vec<Session>,
    #[serde(default)]
    pub current_session_id: Option<Uuid>,
    #[serde(default)]
    pub app_settings: AppSettings,
    #[serde(default = "default_cube_type")]
    pub cube_type: String,
}

fn default_cube_type() -> String {
    DEFAULT_CUBE_TYPE.to_string()
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            sessions: Vec::new(),
            current_session_id: None,
            app_settings: AppSettings::default(),
            cube_type: default_cube_type(),
        }
    }
}

impl Snapshot {
    pub fn capture(sessions: &SessionManager, app_settings: &AppSettings) -> Self {
        Self {
            sessions: sessions.sessions().to_vec(),
            current_session_id: sessions.current_session_id(),
            app_settings: app_settings.clone(),
            cube_type: sessions.cube_type().to_string(),
        }
    }

    /// Split into a session manager (pointer repaired) and settings.
    pub fn into_state(self) -> (SessionManager, AppSettings) {
        let manager =
            SessionManager::from_parts(self.sessions, self.current_session_id, self.cube_type);
        (manager, self.app_settings)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(json)?;
        snapshot.app_settings.validate()?;
        Ok(snapshot)
    }
}

/// External sync point for persisted state.
pub trait SnapshotStore {
    /// `Ok(None)` when nothing has been saved yet.
    fn load_snapshot(&mut self) -> Result<Option<Snapshot>>;
    fn save_snapshot(&mut self, snapshot: &Snapshot) -> Result<()>;
}

/// Snapshot kept as a single pretty-printed JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for JsonFileStore {
    fn load_snapshot(&mut self) -> Result<Option<Snapshot>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Snapshot::from_json(&content).map(Some),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(CoreError::Io(err)),
        }
    }

    fn save_snapshot(&mut self, snapshot: &Snapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, snapshot.to_json()?)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), sessions = snapshot.sessions.len(), "snapshot written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ms_to_datetime;
    use crate::error::ValidationError;

    fn sample() -> Snapshot {
        let mut mgr = SessionManager::new();
        let entry = mgr.record_solve(12_340, "R U R' U'", false, ms_to_datetime(1_700_000_000_123));
        mgr.toggle_plus_two(entry.id);
        mgr.record_solve(0, "F2 B2", true, ms_to_datetime(1_700_000_060_456));
        Snapshot::capture(&mgr, &AppSettings::default())
    }

    #[test]
    fn json_uses_camel_case_fields() {
        let json = sample().to_json().unwrap();
        assert!(json.contains("\"currentSessionId\""));
        assert!(json.contains("\"appSettings\""));
        assert!(json.contains("\"plusTwo\": true"));
        assert!(json.contains("\"autoDnf\": true"));
        assert!(json.contains("\"timestamp\": 1700000000123"));
    }

    #[test]
    fn json_round_trip_is_lossless() {
        let snapshot = sample();
        let back = Snapshot::from_json(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let snapshot = Snapshot::from_json("{}").unwrap();
        assert_eq!(snapshot, Snapshot::default());
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let err = Snapshot::from_json(r#"{"appSettings": {"inspectionTime": 12}}"#).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::InspectionTime(12))
        ));
    }

    #[test]
    fn into_state_repairs_pointer() {
        let mut snapshot = sample();
        snapshot.current_session_id = Some(Uuid::new_v4());
        let expected = snapshot.sessions[0].id;
        let (mgr, _) = snapshot.into_state();
        assert_eq!(mgr.current_session_id(), Some(expected));
    }

    #[test]
    fn json_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("state").join("cubetimer.json"));
        assert!(store.load_snapshot().unwrap().is_none());

        let snapshot = sample();
        store.save_snapshot(&snapshot).unwrap();
        assert_eq!(store.load_snapshot().unwrap(), Some(snapshot));
    }
}
