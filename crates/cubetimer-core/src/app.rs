//! Application state container.
//!
//! [`CubeTimer`] owns the timer, the input dispatcher, the sessions, the
//! settings and the collaborators, and exposes the action set a UI shell
//! calls. Every user-visible outcome is queued as a [`Notification`] for the
//! host to drain.

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::{ms_to_datetime, Clock, SystemClock};
use crate::error::{Result, ValidationError};
use crate::events::{Notification, NotificationKind};
use crate::feedback::{play_cue, Cue, Silent, SoundPlayer};
use crate::format::format_entry;
use crate::input::{InputDispatcher, InputEvent, InputGate};
use crate::record::{Penalty, TimeEntry};
use crate::scramble::{scramble_or_fallback, FaceTurnScrambler, MoveScrambler, ScrambleGenerator};
use crate::session::{Session, SessionManager};
use crate::stats::SessionStats;
use crate::storage::{AppSettings, Config, SettingsPatch, Snapshot, SnapshotStore};
use crate::timer::{TimerEvent, TimerMachine, TimerSettings, TimerSnapshot};

pub struct CubeTimer<C: Clock = SystemClock> {
    timer: TimerMachine<C>,
    input: InputDispatcher,
    sessions: SessionManager,
    settings: AppSettings,
    scrambler: Box<dyn ScrambleGenerator>,
    fallback: Box<dyn ScrambleGenerator>,
    sound: Box<dyn SoundPlayer>,
    scramble: String,
    /// Scramble shown when the current solve began.
    solve_scramble: Option<String>,
    notifications: Vec<Notification>,
}

impl<C: Clock> CubeTimer<C> {
    pub fn new(clock: C, config: &Config) -> Self {
        let (scrambler, fallback): (Box<dyn ScrambleGenerator>, Box<dyn ScrambleGenerator>) =
            match config.scramble.seed {
                Some(seed) => (
                    Box::new(MoveScrambler::seeded(seed)),
                    Box::new(FaceTurnScrambler::seeded(seed.wrapping_add(1))),
                ),
                None => (
                    Box::new(MoveScrambler::from_entropy()),
                    Box::new(FaceTurnScrambler::from_entropy()),
                ),
            };
        let settings = config.timer.clone();
        let mut sessions = SessionManager::new();
        sessions.set_cube_type(&config.default_cube_type);

        let mut app = Self {
            timer: TimerMachine::new(clock, TimerSettings::from(&settings), config.thresholds),
            input: InputDispatcher::default(),
            sessions,
            settings,
            scrambler,
            fallback,
            sound: Box::new(Silent),
            scramble: String::new(),
            solve_scramble: None,
            notifications: Vec::new(),
        };
        app.regenerate_scramble();
        app
    }

    /// Replace the primary scramble generator and draw a new scramble.
    pub fn with_scrambler(mut self, scrambler: impl ScrambleGenerator + 'static) -> Self {
        self.scrambler = Box::new(scrambler);
        self.regenerate_scramble();
        self
    }

    pub fn with_sound_player(mut self, player: impl SoundPlayer + 'static) -> Self {
        self.sound = Box::new(player);
        self
    }

    pub fn with_input_gate(mut self, gate: impl InputGate + 'static) -> Self {
        self.input.set_gate(gate);
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn timer(&self) -> &TimerMachine<C> {
        &self.timer
    }

    pub fn timer_snapshot(&self) -> TimerSnapshot {
        self.timer.snapshot()
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn current_session(&self) -> Option<&Session> {
        self.sessions.current_session()
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub fn scramble(&self) -> &str {
        &self.scramble
    }

    pub fn cube_type(&self) -> &str {
        self.sessions.cube_type()
    }

    pub fn last_recorded(&self) -> Option<&TimeEntry> {
        self.sessions.last_recorded()
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats::from_entries(self.sessions.current_times())
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    /// Take every queued notification.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    // ── Timer input ──────────────────────────────────────────────────

    pub fn handle_input(&mut self, event: &InputEvent) -> Option<TimerEvent> {
        let event = self.input.dispatch(event, &mut self.timer)?;
        self.on_timer_event(event);
        Some(event)
    }

    pub fn set_input_disabled(&mut self, disabled: bool) {
        self.input.set_disabled(disabled);
    }

    pub fn press(&mut self) -> Option<TimerEvent> {
        let event = self.timer.press()?;
        self.on_timer_event(event);
        Some(event)
    }

    pub fn release(&mut self) -> Option<TimerEvent> {
        let event = self.timer.release()?;
        self.on_timer_event(event);
        Some(event)
    }

    /// Call periodically from the host loop.
    pub fn tick(&mut self) -> Option<TimerEvent> {
        let event = self.timer.tick()?;
        self.on_timer_event(event);
        Some(event)
    }

    /// Cancel pending ticks. The timer ignores input afterwards.
    pub fn shutdown(&mut self) {
        self.timer.shutdown();
    }

    fn on_timer_event(&mut self, event: TimerEvent) {
        match event {
            TimerEvent::InspectionStarted { .. } => self.cue(Cue::Inspection),
            TimerEvent::SolveStarted { .. } => {
                self.solve_scramble = Some(self.scramble.clone());
                self.cue(Cue::Start);
            }
            TimerEvent::SolveStopped { elapsed_ms } => {
                self.cue(Cue::Stop);
                let entry = self.record(elapsed_ms, false);
                self.notify_success(
                    NotificationKind::TimeRecorded {
                        entry_id: entry.id,
                        time: entry.time,
                    },
                    format!("Time recorded: {}", format_entry(&entry)),
                );
            }
            TimerEvent::InspectionTimedOut { .. } => {
                let entry = self.record(0, true);
                self.push(Notification::error(
                    NotificationKind::InspectionTimeout { entry_id: entry.id },
                    "Inspection time exceeded, DNF recorded",
                    self.now(),
                ));
            }
            TimerEvent::Reset => {}
        }
    }

    fn record(&mut self, time: u64, auto_dnf: bool) -> TimeEntry {
        let scramble = self
            .solve_scramble
            .take()
            .unwrap_or_else(|| self.scramble.clone());
        let entry = self.sessions.record_solve(time, &scramble, auto_dnf, self.now());
        self.regenerate_scramble();
        entry
    }

    fn cue(&mut self, cue: Cue) {
        play_cue(
            self.sound.as_mut(),
            cue,
            self.settings.sounds,
            self.settings.sound_volume,
        );
    }

    // ── Record actions ───────────────────────────────────────────────

    pub fn toggle_plus_two(&mut self, entry: Uuid) -> bool {
        let changed = self.sessions.toggle_plus_two(entry);
        if changed {
            self.notify_penalty(entry);
        }
        changed
    }

    pub fn toggle_dnf(&mut self, entry: Uuid) -> bool {
        let changed = self.sessions.toggle_dnf(entry);
        if changed {
            self.notify_penalty(entry);
        }
        changed
    }

    pub fn delete_time(&mut self, entry: Uuid) -> Option<TimeEntry> {
        let removed = self.sessions.delete_time(entry)?;
        self.notify_info(
            NotificationKind::TimeDeleted { entry_id: entry },
            format!("Deleted {}", format_entry(&removed)),
        );
        Some(removed)
    }

    pub fn favorite_time(&mut self, entry: Uuid, comment: &str) -> bool {
        let marked = self.sessions.favorite_time(entry, comment);
        if marked {
            self.notify_success(
                NotificationKind::TimeFavorited { entry_id: entry },
                "Added to favorites",
            );
        }
        marked
    }

    fn notify_penalty(&mut self, entry: Uuid) {
        let Some(current) = self
            .sessions
            .current_session()
            .and_then(|s| s.times.get(entry))
        else {
            return;
        };
        let penalty = current.penalty();
        let message = match penalty {
            Penalty::None => "Penalty removed".to_string(),
            Penalty::PlusTwo => format!("+2 applied: {}", format_entry(current)),
            Penalty::Dnf => "Marked as DNF".to_string(),
        };
        self.notify_info(
            NotificationKind::PenaltyChanged {
                entry_id: entry,
                penalty,
            },
            message,
        );
    }

    // ── Session actions ──────────────────────────────────────────────

    pub fn create_session(
        &mut self,
        name: &str,
        cube_type: Option<&str>,
    ) -> std::result::Result<Uuid, ValidationError> {
        let previous_cube = self.cube_type().to_string();
        let id = self.sessions.create_session(name, cube_type, self.now())?;
        let name = self
            .sessions
            .session(id)
            .map(|s| s.name.clone())
            .unwrap_or_default();
        self.notify_success(
            NotificationKind::SessionCreated { session_id: id },
            format!("Session \"{name}\" created"),
        );
        if previous_cube != self.cube_type() {
            self.regenerate_scramble();
        }
        Ok(id)
    }

    pub fn rename_session(
        &mut self,
        id: Uuid,
        name: &str,
    ) -> std::result::Result<bool, ValidationError> {
        let renamed = self.sessions.rename_session(id, name)?;
        if renamed {
            self.notify_success(
                NotificationKind::SessionRenamed { session_id: id },
                format!("Session renamed to \"{}\"", name.trim()),
            );
        }
        Ok(renamed)
    }

    /// Refused (returns `false`) for the only session.
    pub fn delete_session(&mut self, id: Uuid) -> bool {
        let previous_cube = self.cube_type().to_string();
        let Some(removed) = self.sessions.delete_session(id) else {
            return false;
        };
        self.notify_info(
            NotificationKind::SessionDeleted { session_id: id },
            format!("Session \"{}\" deleted", removed.name),
        );
        if previous_cube != self.cube_type() {
            self.regenerate_scramble();
        }
        true
    }

    pub fn set_current_session(&mut self, id: Uuid) -> bool {
        let previous_cube = self.cube_type().to_string();
        if !self.sessions.set_current_session(id) {
            return false;
        }
        if previous_cube != self.cube_type() {
            self.regenerate_scramble();
        }
        true
    }

    pub fn clear_session(&mut self, id: Uuid) -> Option<usize> {
        let removed = self.sessions.clear_session(id)?;
        self.notify_info(
            NotificationKind::SessionCleared {
                session_id: id,
                removed,
            },
            format!("Cleared {removed} solves"),
        );
        Some(removed)
    }

    pub fn set_cube_type(&mut self, cube_type: &str) -> bool {
        if !self.sessions.set_cube_type(cube_type) {
            return false;
        }
        self.new_scramble();
        true
    }

    // ── Scramble & settings ──────────────────────────────────────────

    pub fn new_scramble(&mut self) -> &str {
        self.regenerate_scramble();
        let cube_type = self.cube_type().to_string();
        self.notify_info(
            NotificationKind::ScrambleGenerated {
                cube_type: cube_type.clone(),
            },
            format!("New {cube_type} scramble"),
        );
        &self.scramble
    }

    fn regenerate_scramble(&mut self) {
        let cube_type = self.sessions.cube_type().to_string();
        self.scramble =
            scramble_or_fallback(self.scrambler.as_mut(), self.fallback.as_mut(), &cube_type);
        debug!(%cube_type, scramble = %self.scramble, "scramble generated");
    }

    /// Apply a settings patch. Nothing changes if the result is invalid.
    /// A solve in progress keeps running with the old settings.
    pub fn update_settings(
        &mut self,
        patch: &SettingsPatch,
    ) -> std::result::Result<(), ValidationError> {
        let merged = patch.merge(&self.settings)?;
        self.timer.apply_settings(TimerSettings::from(&merged));
        self.settings = merged;
        self.notify_success(NotificationKind::SettingsUpdated, "Settings updated");
        Ok(())
    }

    // ── Persistence ──────────────────────────────────────────────────

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.sessions, &self.settings)
    }

    /// Replace sessions and settings with `snapshot`. The timer is reset.
    pub fn restore(&mut self, snapshot: Snapshot) -> std::result::Result<(), ValidationError> {
        snapshot.app_settings.validate()?;
        let (sessions, settings) = snapshot.into_state();
        self.timer.reset();
        self.timer.apply_settings(TimerSettings::from(&settings));
        self.solve_scramble = None;
        self.sessions = sessions;
        self.settings = settings;
        self.regenerate_scramble();
        info!(sessions = self.sessions.sessions().len(), "state restored");
        Ok(())
    }

    /// Restore from `store` if it holds a snapshot. Returns whether it did.
    pub fn restore_from(&mut self, store: &mut dyn SnapshotStore) -> Result<bool> {
        match store.load_snapshot()? {
            Some(snapshot) => {
                self.restore(snapshot)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Write the current state to `store`.
    pub fn sync(&self, store: &mut dyn SnapshotStore) -> Result<()> {
        store.save_snapshot(&self.snapshot()).inspect_err(|err| {
            warn!(%err, "failed to persist snapshot");
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn now(&self) -> chrono::DateTime<chrono::Utc> {
        ms_to_datetime(self.timer.clock().now_ms())
    }

    fn push(&mut self, notification: Notification) {
        debug!(kind = ?notification.kind, "notification queued");
        self.notifications.push(notification);
    }

    fn notify_success(&mut self, kind: NotificationKind, message: impl Into<String>) {
        let n = Notification::success(kind, message, self.now());
        self.push(n);
    }

    fn notify_info(&mut self, kind: NotificationKind, message: impl Into<String>) {
        let n = Notification::info(kind, message, self.now());
        self.push(n);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::ScrambleError;
    use crate::events::Severity;
    use crate::storage::Database;
    use crate::timer::TimerState;

    fn app() -> (ManualClock, CubeTimer<ManualClock>) {
        let clock = ManualClock::new(1_700_000_000_000);
        let mut config = Config::default();
        config.scramble.seed = Some(7);
        (clock.clone(), CubeTimer::new(clock, &config))
    }

    fn solve(clock: &ManualClock, app: &mut CubeTimer<ManualClock>, ms: u64) -> TimeEntry {
        app.release();
        clock.advance(ms);
        app.press();
        let entry = app.last_recorded().cloned().unwrap();
        clock.advance(600);
        app.press();
        entry
    }

    #[test]
    fn solve_records_scramble_from_start() {
        let (clock, mut app) = app();
        let scramble = app.scramble().to_string();
        assert!(!scramble.is_empty());

        app.release();
        clock.advance(5_000);
        app.new_scramble();
        clock.advance(7_340);
        assert_eq!(
            app.press(),
            Some(TimerEvent::SolveStopped { elapsed_ms: 12_340 })
        );

        let entry = app.last_recorded().unwrap();
        assert_eq!(entry.time, 12_340);
        assert_eq!(entry.scramble, scramble);
        assert_ne!(app.scramble(), scramble);
        assert_eq!(app.current_session().unwrap().name, "3x3 Session");
    }

    #[test]
    fn recorded_solve_notifies() {
        let (clock, mut app) = app();
        app.drain_notifications();
        solve(&clock, &mut app, 9_800);
        let notes = app.drain_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].severity, Severity::Success);
        assert_eq!(notes[0].message, "Time recorded: 9.80");
        assert!(app.notifications().is_empty());
    }

    #[test]
    fn inspection_timeout_records_auto_dnf() {
        let (clock, mut app) = app();
        app.update_settings(&SettingsPatch {
            use_inspection: Some(true),
            ..Default::default()
        })
        .unwrap();
        app.drain_notifications();

        app.release();
        for _ in 0..160 {
            clock.advance(100);
            app.tick();
        }
        assert_eq!(app.timer().state(), TimerState::Stopped);

        let times = app.sessions().current_times();
        assert_eq!(times.len(), 1);
        assert!(times[0].auto_dnf && times[0].dnf);
        assert_eq!(times[0].time, 0);

        let notes = app.drain_notifications();
        assert_eq!(notes.len(), 1);
        assert!(matches!(notes[0].kind, NotificationKind::InspectionTimeout { .. }));
        assert_eq!(notes[0].severity, Severity::Error);
    }

    #[test]
    fn penalty_toggles_notify() {
        let (clock, mut app) = app();
        let entry = solve(&clock, &mut app, 10_000);
        app.drain_notifications();

        assert!(app.toggle_plus_two(entry.id));
        assert!(app.toggle_dnf(entry.id));
        assert!(!app.toggle_dnf(Uuid::new_v4()));
        let notes = app.drain_notifications();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].message, "+2 applied: 12.00+");
        assert!(matches!(
            notes[1].kind,
            NotificationKind::PenaltyChanged {
                penalty: Penalty::Dnf,
                ..
            }
        ));
    }

    #[test]
    fn invalid_settings_change_nothing() {
        let (_, mut app) = app();
        let before = app.settings().clone();
        let err = app
            .update_settings(&SettingsPatch {
                inspection_time: Some(10),
                use_inspection: Some(true),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err, ValidationError::InspectionTime(10));
        assert_eq!(app.settings(), &before);
        assert!(!app.timer().settings().use_inspection);
    }

    #[test]
    fn cube_type_changes_regenerate_scramble() {
        let (_, mut app) = app();
        assert!(app.set_cube_type("2x2"));
        assert_eq!(app.scramble().split_whitespace().count(), 9);
        assert!(!app.set_cube_type("2x2"));

        let pyra = app.create_session("Pyra", Some("pyra")).unwrap();
        assert_eq!(app.scramble().split_whitespace().count(), 10);
        let other = app.create_session("Main", Some("3x3")).unwrap();
        assert!(app.set_current_session(pyra));
        assert_eq!(app.cube_type(), "pyra");
        assert!(app.delete_session(pyra));
        assert_eq!(app.sessions().current_session_id(), Some(other));
        assert_eq!(app.cube_type(), "3x3");
    }

    #[test]
    fn broken_scrambler_falls_back() {
        let clock = ManualClock::new(0);
        let app = CubeTimer::new(clock, &Config::default()).with_scrambler(
            |cube: &str| -> std::result::Result<String, ScrambleError> {
                Err(ScrambleError::UnsupportedCubeType(cube.to_string()))
            },
        );
        assert_eq!(app.scramble().split_whitespace().count(), 20);
    }

    #[test]
    fn sync_and_restore_through_database() {
        let (clock, mut app) = app();
        let a = solve(&clock, &mut app, 11_200);
        solve(&clock, &mut app, 13_100);
        app.favorite_time(a.id, "nice");
        let mut db = Database::open_memory().unwrap();
        app.sync(&mut db).unwrap();

        let (_, mut fresh) = self::app();
        assert!(fresh.restore_from(&mut db).unwrap());
        assert_eq!(fresh.snapshot(), app.snapshot());
        assert_eq!(fresh.stats().solves, 2);
    }

    #[test]
    fn shutdown_stops_everything() {
        let (clock, mut app) = app();
        app.release();
        app.shutdown();
        clock.advance(5_000);
        assert_eq!(app.press(), None);
        assert_eq!(app.tick(), None);
        assert!(app.sessions().current_times().is_empty());
    }
}
