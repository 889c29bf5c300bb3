use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::record::Penalty;

/// What happened. Serialized as `{"type": "time-recorded", ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum NotificationKind {
    TimeRecorded {
        entry_id: Uuid,
        time: u64,
    },
    TimeDeleted {
        entry_id: Uuid,
    },
    PenaltyChanged {
        entry_id: Uuid,
        penalty: Penalty,
    },
    TimeFavorited {
        entry_id: Uuid,
    },
    SessionCreated {
        session_id: Uuid,
    },
    SessionRenamed {
        session_id: Uuid,
    },
    SessionDeleted {
        session_id: Uuid,
    },
    SessionCleared {
        session_id: Uuid,
        removed: usize,
    },
    /// Inspection ran out and an auto-DNF was recorded.
    InspectionTimeout {
        entry_id: Uuid,
    },
    ScrambleGenerated {
        cube_type: String,
    },
    SettingsUpdated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Error,
    Info,
}

/// A semantic message for the presentation layer. The core never renders it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(flatten)]
    pub kind: NotificationKind,
    pub message: String,
    pub severity: Severity,
    pub at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        kind: NotificationKind,
        message: impl Into<String>,
        severity: Severity,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            severity,
            at,
        }
    }

    pub fn success(kind: NotificationKind, message: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self::new(kind, message, Severity::Success, at)
    }

    pub fn info(kind: NotificationKind, message: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self::new(kind, message, Severity::Info, at)
    }

    pub fn error(kind: NotificationKind, message: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self::new(kind, message, Severity::Error, at)
    }
}
