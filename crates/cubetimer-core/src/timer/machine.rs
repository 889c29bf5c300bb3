//! Solve timer state machine.
//!
//! The machine is wall-clock based and has no internal thread. The host feeds
//! it `press`/`release` signals and calls `tick()` from its event loop; each
//! call returns `Some(TimerEvent)` when something the caller must act on
//! happened (a solve stopped, inspection timed out, ...).
//!
//! ## State Transitions
//!
//! ```text
//! Ready -release-> Inspection -release-> Running -press-> Stopped -press-> Ready
//!   \------------------release (no inspection)--^            ^
//!                Inspection --deadline-----------------------/
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut timer = TimerMachine::new(SystemClock, TimerSettings::default(), TimerThresholds::default());
//! timer.release();
//! // In the event loop:
//! timer.tick();
//! if let Some(TimerEvent::SolveStopped { elapsed_ms }) = timer.press() { /* record it */ }
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::scheduler::{TickKind, TickScheduler};
use crate::clock::{Clock, SystemClock};
use crate::format::format_time;
use crate::storage::AppSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Ready,
    Inspection,
    Running,
    Stopped,
}

/// Normalized input signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Press,
    Release,
}

/// Guard windows and tick rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerThresholds {
    /// A press sooner than this after the solve started does not stop it.
    #[serde(default = "default_stop_guard_ms")]
    pub stop_guard_ms: u64,
    /// A release sooner than this after inspection began does not start the solve.
    #[serde(default = "default_inspection_grace_ms")]
    pub inspection_grace_ms: u64,
    /// A press sooner than this after stopping does not reset to ready.
    #[serde(default = "default_reset_cooldown_ms")]
    pub reset_cooldown_ms: u64,
    #[serde(default = "default_running_tick_ms")]
    pub running_tick_ms: u64,
    #[serde(default = "default_inspection_tick_ms")]
    pub inspection_tick_ms: u64,
}

fn default_stop_guard_ms() -> u64 {
    100
}
fn default_inspection_grace_ms() -> u64 {
    1_000
}
fn default_reset_cooldown_ms() -> u64 {
    500
}
fn default_running_tick_ms() -> u64 {
    10
}
fn default_inspection_tick_ms() -> u64 {
    100
}

impl Default for TimerThresholds {
    fn default() -> Self {
        Self {
            stop_guard_ms: default_stop_guard_ms(),
            inspection_grace_ms: default_inspection_grace_ms(),
            reset_cooldown_ms: default_reset_cooldown_ms(),
            running_tick_ms: default_running_tick_ms(),
            inspection_tick_ms: default_inspection_tick_ms(),
        }
    }
}

/// The part of [`AppSettings`] the machine reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSettings {
    pub use_inspection: bool,
    pub inspection_time_secs: u32,
    pub hide_time_while_solving: bool,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self::from(&AppSettings::default())
    }
}

impl From<&AppSettings> for TimerSettings {
    fn from(settings: &AppSettings) -> Self {
        Self {
            use_inspection: settings.use_inspection,
            inspection_time_secs: settings.inspection_time,
            hide_time_while_solving: settings.hide_time_while_solving,
        }
    }
}

/// Something the caller has to react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TimerEvent {
    InspectionStarted { duration_ms: u64 },
    SolveStarted { started_at_ms: u64 },
    /// User stopped the solve; the caller records `elapsed_ms`.
    SolveStopped { elapsed_ms: u64 },
    /// Inspection deadline passed before the solve began; the caller records
    /// an auto-DNF.
    InspectionTimedOut { inspection_ms: u64 },
    Reset,
}

/// Published view of the machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub state: TimerState,
    pub elapsed_ms: u64,
    pub inspection_remaining_ms: Option<u64>,
    /// Whole seconds left, rounded up. `None` outside inspection.
    pub inspection_seconds_left: Option<u64>,
    pub hide_time: bool,
    pub active_tick: Option<TickKind>,
}

impl TimerSnapshot {
    /// Text a display shows for the current state.
    pub fn display_text(&self) -> String {
        match self.state {
            TimerState::Inspection => self
                .inspection_seconds_left
                .map(|s| s.to_string())
                .unwrap_or_default(),
            TimerState::Running if self.hide_time => String::new(),
            _ => format_time(self.elapsed_ms as f64),
        }
    }
}

pub struct TimerMachine<C: Clock = SystemClock> {
    clock: C,
    settings: TimerSettings,
    thresholds: TimerThresholds,
    state: TimerState,
    elapsed_ms: u64,
    inspection_remaining_ms: Option<u64>,
    solve_started_ms: Option<u64>,
    inspection_started_ms: Option<u64>,
    stopped_at_ms: Option<u64>,
    scheduler: TickScheduler,
    halted: bool,
}

impl<C: Clock> TimerMachine<C> {
    /// Create a machine in the `Ready` state.
    pub fn new(clock: C, settings: TimerSettings, thresholds: TimerThresholds) -> Self {
        Self {
            clock,
            settings,
            thresholds,
            state: TimerState::Ready,
            elapsed_ms: 0,
            inspection_remaining_ms: None,
            solve_started_ms: None,
            inspection_started_ms: None,
            stopped_at_ms: None,
            scheduler: TickScheduler::new(),
            halted: false,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn inspection_remaining_ms(&self) -> Option<u64> {
        self.inspection_remaining_ms
    }

    pub fn settings(&self) -> TimerSettings {
        self.settings
    }

    pub fn thresholds(&self) -> TimerThresholds {
        self.thresholds
    }

    pub fn active_tick(&self) -> Option<TickKind> {
        self.scheduler.active()
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            state: self.state,
            elapsed_ms: self.elapsed_ms,
            inspection_remaining_ms: self.inspection_remaining_ms,
            inspection_seconds_left: self
                .inspection_remaining_ms
                .filter(|ms| *ms > 0)
                .map(|ms| ms.div_ceil(1000)),
            hide_time: self.settings.hide_time_while_solving,
            active_tick: self.scheduler.active(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn signal(&mut self, signal: Signal) -> Option<TimerEvent> {
        match signal {
            Signal::Press => self.press(),
            Signal::Release => self.release(),
        }
    }

    pub fn press(&mut self) -> Option<TimerEvent> {
        if self.halted {
            return None;
        }
        let now = self.clock.now_ms();
        match self.state {
            TimerState::Ready | TimerState::Inspection => None,
            TimerState::Running => {
                let elapsed = now.saturating_sub(self.solve_started_ms.unwrap_or(now));
                if elapsed < self.thresholds.stop_guard_ms {
                    debug!(elapsed, "press ignored: solve just started");
                    return None;
                }
                self.scheduler.cancel();
                self.elapsed_ms = elapsed;
                self.state = TimerState::Stopped;
                self.stopped_at_ms = Some(now);
                debug!(elapsed, "solve stopped");
                Some(TimerEvent::SolveStopped { elapsed_ms: elapsed })
            }
            TimerState::Stopped => {
                let since_stop = now.saturating_sub(self.stopped_at_ms.unwrap_or(0));
                if since_stop < self.thresholds.reset_cooldown_ms {
                    debug!(since_stop, "press ignored: stop cooldown");
                    return None;
                }
                self.reset()
            }
        }
    }

    pub fn release(&mut self) -> Option<TimerEvent> {
        if self.halted {
            return None;
        }
        let now = self.clock.now_ms();
        match self.state {
            TimerState::Ready => {
                if self.settings.use_inspection {
                    let duration_ms = u64::from(self.settings.inspection_time_secs) * 1000;
                    self.state = TimerState::Inspection;
                    self.inspection_remaining_ms = Some(duration_ms);
                    self.inspection_started_ms = Some(now);
                    self.scheduler.schedule(
                        TickKind::Inspection,
                        self.thresholds.inspection_tick_ms,
                        now,
                    );
                    debug!(duration_ms, "inspection started");
                    Some(TimerEvent::InspectionStarted { duration_ms })
                } else {
                    Some(self.start_solve(now))
                }
            }
            TimerState::Inspection => {
                // A host that skipped ticks must not start a solve past the deadline.
                let fired = self.scheduler.due(now);
                if let Some(timed_out) = self.count_down_inspection(fired, now) {
                    return Some(timed_out);
                }
                let since_start = now.saturating_sub(self.inspection_started_ms.unwrap_or(now));
                if since_start < self.thresholds.inspection_grace_ms {
                    debug!(since_start, "release ignored: inspection grace");
                    return None;
                }
                Some(self.start_solve(now))
            }
            TimerState::Running | TimerState::Stopped => None,
        }
    }

    /// Call periodically from the host loop.
    ///
    /// Returns `Some(TimerEvent::InspectionTimedOut)` once when the
    /// inspection deadline passes.
    pub fn tick(&mut self) -> Option<TimerEvent> {
        if self.halted {
            return None;
        }
        let now = self.clock.now_ms();
        let fired = self.scheduler.due(now);
        if fired == 0 {
            return None;
        }
        match self.state {
            TimerState::Running => {
                if let Some(start) = self.solve_started_ms {
                    self.elapsed_ms = now.saturating_sub(start);
                }
                None
            }
            TimerState::Inspection => self.count_down_inspection(fired, now),
            // Not reachable while the scheduler follows the state, but a
            // stray tick must not resurrect anything.
            TimerState::Ready | TimerState::Stopped => {
                self.scheduler.cancel();
                None
            }
        }
    }

    /// Return to `Ready` with elapsed and inspection cleared.
    pub fn reset(&mut self) -> Option<TimerEvent> {
        self.scheduler.cancel();
        self.state = TimerState::Ready;
        self.elapsed_ms = 0;
        self.inspection_remaining_ms = None;
        self.solve_started_ms = None;
        self.inspection_started_ms = None;
        self.stopped_at_ms = None;
        debug!("timer reset");
        Some(TimerEvent::Reset)
    }

    /// Settings take effect on the next transition; a solve in progress is
    /// not interrupted.
    pub fn apply_settings(&mut self, settings: TimerSettings) {
        self.settings = settings;
    }

    /// Cancel the pending tick and ignore everything afterwards.
    pub fn shutdown(&mut self) {
        self.scheduler.cancel();
        self.halted = true;
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Apply `fired` inspection ticks; moves to `Stopped` once nothing is left.
    fn count_down_inspection(&mut self, fired: u64, now: u64) -> Option<TimerEvent> {
        if fired == 0 {
            return None;
        }
        let step = fired.saturating_mul(self.thresholds.inspection_tick_ms);
        let remaining = self.inspection_remaining_ms.unwrap_or(0).saturating_sub(step);
        if remaining > 0 {
            self.inspection_remaining_ms = Some(remaining);
            return None;
        }
        self.scheduler.cancel();
        let inspection_ms = u64::from(self.settings.inspection_time_secs) * 1000;
        self.inspection_remaining_ms = None;
        self.inspection_started_ms = None;
        self.elapsed_ms = 0;
        self.state = TimerState::Stopped;
        self.stopped_at_ms = Some(now);
        debug!(inspection_ms, "inspection timed out");
        Some(TimerEvent::InspectionTimedOut { inspection_ms })
    }

    fn start_solve(&mut self, now: u64) -> TimerEvent {
        self.scheduler
            .schedule(TickKind::Elapsed, self.thresholds.running_tick_ms, now);
        self.state = TimerState::Running;
        self.solve_started_ms = Some(now);
        self.elapsed_ms = 0;
        self.inspection_remaining_ms = None;
        self.inspection_started_ms = None;
        debug!("solve started");
        TimerEvent::SolveStarted { started_at_ms: now }
    }
}

impl<C: Clock> Drop for TimerMachine<C> {
    fn drop(&mut self) {
        self.scheduler.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn machine(use_inspection: bool) -> (ManualClock, TimerMachine<ManualClock>) {
        let clock = ManualClock::new(1_000_000);
        let settings = TimerSettings {
            use_inspection,
            inspection_time_secs: 15,
            hide_time_while_solving: false,
        };
        let timer = TimerMachine::new(clock.clone(), settings, TimerThresholds::default());
        (clock, timer)
    }

    #[test]
    fn starts_ready() {
        let (_, timer) = machine(false);
        assert_eq!(timer.state(), TimerState::Ready);
        assert_eq!(timer.active_tick(), None);
    }

    #[test]
    fn full_cycle_without_inspection() {
        let (clock, mut timer) = machine(false);
        assert_eq!(timer.press(), None);
        assert!(matches!(timer.release(), Some(TimerEvent::SolveStarted { .. })));
        assert_eq!(timer.state(), TimerState::Running);
        assert_eq!(timer.active_tick(), Some(TickKind::Elapsed));

        clock.advance(12_340);
        timer.tick();
        assert_eq!(timer.elapsed_ms(), 12_340);

        assert_eq!(
            timer.press(),
            Some(TimerEvent::SolveStopped { elapsed_ms: 12_340 })
        );
        assert_eq!(timer.state(), TimerState::Stopped);
        assert_eq!(timer.active_tick(), None);

        clock.advance(500);
        assert_eq!(timer.press(), Some(TimerEvent::Reset));
        assert_eq!(timer.state(), TimerState::Ready);
        assert_eq!(timer.elapsed_ms(), 0);
    }

    #[test]
    fn stop_guard_ignores_early_press() {
        let (clock, mut timer) = machine(false);
        timer.release();
        clock.advance(99);
        assert_eq!(timer.press(), None);
        assert_eq!(timer.state(), TimerState::Running);
        clock.advance(1);
        assert!(matches!(timer.press(), Some(TimerEvent::SolveStopped { elapsed_ms: 100 })));
    }

    #[test]
    fn reset_cooldown_ignores_early_press() {
        let (clock, mut timer) = machine(false);
        timer.release();
        clock.advance(5_000);
        timer.press();
        clock.advance(499);
        assert_eq!(timer.press(), None);
        assert_eq!(timer.state(), TimerState::Stopped);
        clock.advance(1);
        assert_eq!(timer.press(), Some(TimerEvent::Reset));
    }

    #[test]
    fn inspection_grace_ignores_early_release() {
        let (clock, mut timer) = machine(true);
        assert_eq!(
            timer.release(),
            Some(TimerEvent::InspectionStarted { duration_ms: 15_000 })
        );
        assert_eq!(timer.active_tick(), Some(TickKind::Inspection));
        clock.advance(999);
        assert_eq!(timer.release(), None);
        assert_eq!(timer.state(), TimerState::Inspection);
        clock.advance(1);
        assert!(matches!(timer.release(), Some(TimerEvent::SolveStarted { .. })));
        assert_eq!(timer.inspection_remaining_ms(), None);
        assert_eq!(timer.active_tick(), Some(TickKind::Elapsed));
    }

    #[test]
    fn inspection_counts_down_per_tick() {
        let (clock, mut timer) = machine(true);
        timer.release();
        clock.advance(100);
        timer.tick();
        assert_eq!(timer.inspection_remaining_ms(), Some(14_900));
        clock.advance(1_000);
        timer.tick();
        assert_eq!(timer.inspection_remaining_ms(), Some(13_900));
        assert_eq!(timer.snapshot().inspection_seconds_left, Some(14));
    }

    #[test]
    fn inspection_timeout_fires_once() {
        let (clock, mut timer) = machine(true);
        timer.release();
        let mut timeouts = 0;
        for _ in 0..160 {
            clock.advance(100);
            if let Some(TimerEvent::InspectionTimedOut { inspection_ms }) = timer.tick() {
                assert_eq!(inspection_ms, 15_000);
                timeouts += 1;
            }
        }
        assert_eq!(timeouts, 1);
        assert_eq!(timer.state(), TimerState::Stopped);
        assert_eq!(timer.active_tick(), None);
        assert_eq!(timer.inspection_remaining_ms(), None);
    }

    #[test]
    fn release_is_noop_while_running_or_stopped() {
        let (clock, mut timer) = machine(false);
        timer.release();
        clock.advance(2_000);
        assert_eq!(timer.release(), None);
        timer.press();
        assert_eq!(timer.release(), None);
        assert_eq!(timer.state(), TimerState::Stopped);
    }

    #[test]
    fn settings_apply_to_next_solve_only() {
        let (clock, mut timer) = machine(false);
        timer.release();
        timer.apply_settings(TimerSettings {
            use_inspection: true,
            inspection_time_secs: 8,
            hide_time_while_solving: true,
        });
        assert_eq!(timer.state(), TimerState::Running);
        clock.advance(3_000);
        timer.press();
        clock.advance(600);
        timer.press();
        assert_eq!(
            timer.release(),
            Some(TimerEvent::InspectionStarted { duration_ms: 8_000 })
        );
    }

    #[test]
    fn display_text_follows_state() {
        let (clock, mut timer) = machine(true);
        assert_eq!(timer.snapshot().display_text(), "0.00");
        timer.release();
        assert_eq!(timer.snapshot().display_text(), "15");
        clock.advance(1_000);
        timer.release();
        clock.advance(1_230);
        timer.tick();
        assert_eq!(timer.snapshot().display_text(), "1.23");

        timer.apply_settings(TimerSettings {
            use_inspection: true,
            inspection_time_secs: 15,
            hide_time_while_solving: true,
        });
        assert_eq!(timer.snapshot().display_text(), "");
    }

    #[test]
    fn shutdown_cancels_pending_tick() {
        let (clock, mut timer) = machine(true);
        timer.release();
        timer.shutdown();
        assert_eq!(timer.active_tick(), None);
        clock.advance(20_000);
        assert_eq!(timer.tick(), None);
        assert_eq!(timer.release(), None);
        assert_eq!(timer.state(), TimerState::Inspection);
        assert!(timer.is_halted());
    }

    #[test]
    fn explicit_reset_from_any_state() {
        let (clock, mut timer) = machine(true);
        timer.release();
        clock.advance(300);
        assert_eq!(timer.reset(), Some(TimerEvent::Reset));
        assert_eq!(timer.state(), TimerState::Ready);
        assert_eq!(timer.active_tick(), None);
        assert_eq!(timer.inspection_remaining_ms(), None);
    }

    #[test]
    fn late_release_after_deadline_times_out() {
        let (clock, mut timer) = machine(true);
        timer.release();
        // No ticks from the host for the whole inspection.
        clock.advance(16_000);
        assert_eq!(
            timer.release(),
            Some(TimerEvent::InspectionTimedOut {
                inspection_ms: 15_000
            })
        );
        assert_eq!(timer.state(), TimerState::Stopped);
        assert_eq!(timer.active_tick(), None);
        assert_eq!(timer.tick(), None);
    }

    #[test]
    fn late_release_before_deadline_catches_up() {
        let (clock, mut timer) = machine(true);
        timer.release();
        clock.advance(14_950);
        assert!(matches!(timer.release(), Some(TimerEvent::SolveStarted { .. })));
        assert_eq!(timer.state(), TimerState::Running);
    }
}
