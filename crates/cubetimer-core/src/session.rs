//! Sessions and the session manager.
//!
//! Once the first session exists the list is never empty again: deleting the
//! last one is refused, and deleting the current one moves the pointer to the
//! first remaining session before removal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::record::{SolveStore, TimeEntry};

pub const DEFAULT_CUBE_TYPE: &str = "3x3";

/// A named, ordered collection of solves for one puzzle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Uuid,
    pub name: String,
    pub cube_type: String,
    pub times: SolveStore,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(name: impl Into<String>, cube_type: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            cube_type: cube_type.into(),
            times: SolveStore::new(),
            created_at: at,
        }
    }
}

fn validated_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyName("session".into()));
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionManager {
    sessions: Vec<Session>,
    current_session_id: Option<Uuid>,
    cube_type: String,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionManager {
    /// An uninitialized manager. The first session is created on demand.
    pub fn new() -> Self {
        Self {
            sessions: Vec::new(),
            current_session_id: None,
            cube_type: DEFAULT_CUBE_TYPE.to_string(),
        }
    }

    /// Rebuild from persisted parts. A current pointer that names no session
    /// is repaired to the first session.
    pub fn from_parts(
        sessions: Vec<Session>,
        current_session_id: Option<Uuid>,
        cube_type: impl Into<String>,
    ) -> Self {
        let current_session_id = match current_session_id {
            Some(id) if sessions.iter().any(|s| s.id == id) => Some(id),
            stale => {
                let repaired = sessions.first().map(|s| s.id);
                if stale.is_some() {
                    debug!(?stale, ?repaired, "repaired dangling current session");
                }
                repaired
            }
        };
        let cube_type = cube_type.into();
        Self {
            sessions,
            current_session_id,
            cube_type: if cube_type.trim().is_empty() {
                DEFAULT_CUBE_TYPE.to_string()
            } else {
                cube_type
            },
        }
    }

    pub fn into_parts(self) -> (Vec<Session>, Option<Uuid>, String) {
        (self.sessions, self.current_session_id, self.cube_type)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn session(&self, id: Uuid) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn current_session_id(&self) -> Option<Uuid> {
        self.current_session_id
    }

    pub fn current_session(&self) -> Option<&Session> {
        self.current_session_id.and_then(|id| self.session(id))
    }

    pub fn cube_type(&self) -> &str {
        &self.cube_type
    }

    /// Solves of the current session, empty if there is none yet.
    pub fn current_times(&self) -> &[TimeEntry] {
        self.current_session()
            .map(|s| s.times.entries())
            .unwrap_or(&[])
    }

    pub fn last_recorded(&self) -> Option<&TimeEntry> {
        self.current_session().and_then(|s| s.times.last_recorded())
    }

    // ── Session CRUD ─────────────────────────────────────────────────

    /// Create a session for `cube_type` (the active cube type if `None`) and
    /// make it current.
    pub fn create_session(
        &mut self,
        name: &str,
        cube_type: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<Uuid, ValidationError> {
        let name = validated_name(name)?;
        let cube_type = cube_type
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(self.cube_type.as_str())
            .to_string();
        let session = Session::new(name, cube_type, at);
        let id = session.id;
        info!(%id, name = %session.name, cube_type = %session.cube_type, "session created");
        self.cube_type = session.cube_type.clone();
        self.sessions.push(session);
        self.current_session_id = Some(id);
        Ok(id)
    }

    /// Make sure a current session exists, creating `"{cube_type} Session"`
    /// if needed.
    pub fn ensure_session(&mut self, at: DateTime<Utc>) -> Uuid {
        let index = self.ensure_index(at);
        self.sessions[index].id
    }

    fn ensure_index(&mut self, at: DateTime<Utc>) -> usize {
        if let Some(current) = self.current_session_id {
            if let Some(index) = self.sessions.iter().position(|s| s.id == current) {
                return index;
            }
        }
        if let Some(first) = self.sessions.first() {
            self.current_session_id = Some(first.id);
            return 0;
        }
        let session = Session::new(format!("{} Session", self.cube_type), self.cube_type.clone(), at);
        info!(id = %session.id, name = %session.name, "default session created");
        self.current_session_id = Some(session.id);
        self.sessions.push(session);
        self.sessions.len() - 1
    }

    /// Rename a session. An empty trimmed name is rejected without changes.
    /// Returns `Ok(false)` for an unknown id.
    pub fn rename_session(&mut self, id: Uuid, name: &str) -> Result<bool, ValidationError> {
        let name = validated_name(name)?;
        match self.sessions.iter_mut().find(|s| s.id == id) {
            Some(session) => {
                debug!(%id, from = %session.name, to = %name, "session renamed");
                session.name = name;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Delete a session. Refused for the only session and for unknown ids.
    pub fn delete_session(&mut self, id: Uuid) -> Option<Session> {
        if self.sessions.len() <= 1 {
            debug!(%id, "refusing to delete the only session");
            return None;
        }
        let index = self.sessions.iter().position(|s| s.id == id)?;
        if self.current_session_id == Some(id) {
            if let Some(next) = self.sessions.iter().find(|s| s.id != id) {
                self.current_session_id = Some(next.id);
                self.cube_type = next.cube_type.clone();
            }
        }
        let removed = self.sessions.remove(index);
        info!(%id, name = %removed.name, "session deleted");
        Some(removed)
    }

    /// Switch the current session. Adopts its cube type.
    pub fn set_current_session(&mut self, id: Uuid) -> bool {
        let Some(session) = self.sessions.iter().find(|s| s.id == id) else {
            return false;
        };
        self.cube_type = session.cube_type.clone();
        self.current_session_id = Some(id);
        debug!(%id, cube_type = %self.cube_type, "current session switched");
        true
    }

    /// Remove every solve from a session, keeping the session itself.
    pub fn clear_session(&mut self, id: Uuid) -> Option<usize> {
        let session = self.sessions.iter_mut().find(|s| s.id == id)?;
        let removed = session.times.clear();
        info!(%id, removed, "session cleared");
        Some(removed)
    }

    /// Change the active cube type used for new sessions and scrambles.
    pub fn set_cube_type(&mut self, cube_type: &str) -> bool {
        let cube_type = cube_type.trim();
        if cube_type.is_empty() || cube_type == self.cube_type {
            return false;
        }
        self.cube_type = cube_type.to_string();
        true
    }

    // ── Time operations on the current session ──────────────────────

    /// Append a solve to the current session, creating one if needed.
    pub fn record_solve(
        &mut self,
        time: u64,
        scramble: &str,
        auto_dnf: bool,
        at: DateTime<Utc>,
    ) -> TimeEntry {
        let index = self.ensure_index(at);
        let session = &mut self.sessions[index];
        let entry = session.times.append(time, scramble, auto_dnf, at);
        info!(session = %session.id, entry = %entry.id, time = entry.time, auto_dnf, "solve recorded");
        entry
    }

    pub fn toggle_plus_two(&mut self, entry: Uuid) -> bool {
        self.current_store_mut()
            .is_some_and(|s| s.toggle_plus_two(entry))
    }

    pub fn toggle_dnf(&mut self, entry: Uuid) -> bool {
        self.current_store_mut().is_some_and(|s| s.toggle_dnf(entry))
    }

    pub fn delete_time(&mut self, entry: Uuid) -> Option<TimeEntry> {
        self.current_store_mut().and_then(|s| s.delete(entry))
    }

    pub fn favorite_time(&mut self, entry: Uuid, comment: &str) -> bool {
        self.current_store_mut()
            .is_some_and(|s| s.favorite(entry, comment))
    }

    fn current_store_mut(&mut self) -> Option<&mut SolveStore> {
        let id = self.current_session_id?;
        self.sessions
            .iter_mut()
            .find(|s| s.id == id)
            .map(|s| &mut s.times)
    }
}
