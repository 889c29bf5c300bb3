//! Solve records and the per-session record store.
//!
//! Penalty invariants live here:
//! - `plus_two` and `dnf` are never both set; setting one clears the other.
//! - An auto-DNF (inspection timeout) is permanently DNF; neither toggle
//!   touches it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// Milliseconds added by a +2 penalty.
pub const PLUS_TWO_MS: u64 = 2_000;

/// A single recorded solve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntry {
    pub id: Uuid,
    /// Raw measured duration in milliseconds (0 for an auto-DNF).
    pub time: u64,
    /// Scramble that was shown when the solve began.
    pub scramble: String,
    pub plus_two: bool,
    pub dnf: bool,
    #[serde(default)]
    pub auto_dnf: bool,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

/// Penalty state of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Penalty {
    None,
    PlusTwo,
    Dnf,
}

impl TimeEntry {
    /// Build a fresh entry. An auto-DNF is always recorded with `time = 0`.
    pub fn new(time: u64, scramble: impl Into<String>, auto_dnf: bool, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            time: if auto_dnf { 0 } else { time },
            scramble: scramble.into(),
            plus_two: false,
            dnf: auto_dnf,
            auto_dnf,
            favorite: false,
            comment: None,
            timestamp: at,
        }
    }

    pub fn is_dnf(&self) -> bool {
        self.dnf || self.auto_dnf
    }

    /// Time used by statistics: `None` for a DNF, `time + 2000` for +2.
    pub fn effective_time(&self) -> Option<u64> {
        if self.is_dnf() {
            None
        } else if self.plus_two {
            Some(self.time.saturating_add(PLUS_TWO_MS))
        } else {
            Some(self.time)
        }
    }

    pub fn penalty(&self) -> Penalty {
        if self.is_dnf() {
            Penalty::Dnf
        } else if self.plus_two {
            Penalty::PlusTwo
        } else {
            Penalty::None
        }
    }
}

/// Ordered solves of one session plus the "last recorded" pointer used for
/// quick post-solve actions.
///
/// Equality compares entries only; the pointer is process-local.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SolveStore {
    entries: Vec<TimeEntry>,
    #[serde(skip)]
    last_recorded: Option<Uuid>,
}

impl PartialEq for SolveStore {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for SolveStore {}

impl SolveStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted entries. The last-recorded pointer is
    /// process-local and starts empty.
    pub fn from_entries(entries: Vec<TimeEntry>) -> Self {
        Self {
            entries,
            last_recorded: None,
        }
    }

    pub fn entries(&self) -> &[TimeEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<TimeEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&TimeEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn last_recorded(&self) -> Option<&TimeEntry> {
        self.last_recorded.and_then(|id| self.get(id))
    }

    /// Append a solve and return a copy of the stored entry.
    ///
    /// Timestamps never go backwards within a store: an `at` earlier than the
    /// previous entry is clamped to it.
    pub fn append(
        &mut self,
        time: u64,
        scramble: impl Into<String>,
        auto_dnf: bool,
        at: DateTime<Utc>,
    ) -> TimeEntry {
        let at = match self.entries.last() {
            Some(prev) if prev.timestamp > at => prev.timestamp,
            _ => at,
        };
        let entry = TimeEntry::new(time, scramble, auto_dnf, at);
        self.last_recorded = Some(entry.id);
        self.entries.push(entry.clone());
        entry
    }

    /// Flip +2. Returns `false` when the entry is missing or auto-DNF.
    pub fn toggle_plus_two(&mut self, id: Uuid) -> bool {
        let Some(entry) = self.mutable_penalty(id) else {
            return false;
        };
        entry.plus_two = !entry.plus_two;
        if entry.plus_two {
            entry.dnf = false;
        }
        debug!(%id, plus_two = entry.plus_two, "toggled +2");
        true
    }

    /// Flip DNF. Returns `false` when the entry is missing or auto-DNF.
    pub fn toggle_dnf(&mut self, id: Uuid) -> bool {
        let Some(entry) = self.mutable_penalty(id) else {
            return false;
        };
        entry.dnf = !entry.dnf;
        if entry.dnf {
            entry.plus_two = false;
        }
        debug!(%id, dnf = entry.dnf, "toggled DNF");
        true
    }

    /// Remove an entry. Missing ids are ignored.
    pub fn delete(&mut self, id: Uuid) -> Option<TimeEntry> {
        let index = self.entries.iter().position(|e| e.id == id)?;
        if self.last_recorded == Some(id) {
            self.last_recorded = None;
        }
        Some(self.entries.remove(index))
    }

    /// Mark as favorite with a comment. Penalty flags are untouched.
    pub fn favorite(&mut self, id: Uuid, comment: impl Into<String>) -> bool {
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.favorite = true;
                entry.comment = Some(comment.into());
                true
            }
            None => false,
        }
    }

    /// Drop every entry.
    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        self.last_recorded = None;
        removed
    }

    fn mutable_penalty(&mut self, id: Uuid) -> Option<&mut TimeEntry> {
        self.entries
            .iter_mut()
            .find(|e| e.id == id)
            .filter(|e| !e.auto_dnf)
    }
}
