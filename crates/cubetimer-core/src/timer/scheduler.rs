//! Single cancellable repeating task.
//!
//! The machine owns exactly one [`TickScheduler`]; scheduling a new task
//! replaces the previous one, so two ticks can never be pending at once.

use serde::{Deserialize, Serialize};

/// What the active tick recomputes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TickKind {
    /// Recompute the running solve time.
    Elapsed,
    /// Count the inspection deadline down.
    Inspection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScheduledTick {
    kind: TickKind,
    interval_ms: u64,
    next_due_ms: u64,
}

#[derive(Debug, Clone, Default)]
pub struct TickScheduler {
    active: Option<ScheduledTick>,
}

impl TickScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `kind` every `interval_ms`, first firing one interval after
    /// `now_ms`. Any previously scheduled task is cancelled first.
    pub fn schedule(&mut self, kind: TickKind, interval_ms: u64, now_ms: u64) {
        let interval_ms = interval_ms.max(1);
        self.active = Some(ScheduledTick {
            kind,
            interval_ms,
            next_due_ms: now_ms.saturating_add(interval_ms),
        });
    }

    /// Cancel the active task, returning what it was.
    pub fn cancel(&mut self) -> Option<TickKind> {
        self.active.take().map(|t| t.kind)
    }

    pub fn active(&self) -> Option<TickKind> {
        self.active.map(|t| t.kind)
    }

    pub fn interval_ms(&self) -> Option<u64> {
        self.active.map(|t| t.interval_ms)
    }

    /// Number of whole intervals that fired since the previous call.
    ///
    /// A late host catches up in one call instead of losing ticks.
    pub fn due(&mut self, now_ms: u64) -> u64 {
        let Some(tick) = self.active.as_mut() else {
            return 0;
        };
        if now_ms < tick.next_due_ms {
            return 0;
        }
        let fired = (now_ms - tick.next_due_ms) / tick.interval_ms + 1;
        tick.next_due_ms = tick
            .next_due_ms
            .saturating_add(fired.saturating_mul(tick.interval_ms));
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_due_when_idle() {
        let mut sched = TickScheduler::new();
        assert_eq!(sched.due(10_000), 0);
        assert_eq!(sched.active(), None);
    }

    #[test]
    fn fires_once_per_interval() {
        let mut sched = TickScheduler::new();
        sched.schedule(TickKind::Inspection, 100, 0);
        assert_eq!(sched.due(99), 0);
        assert_eq!(sched.due(100), 1);
        assert_eq!(sched.due(150), 0);
        assert_eq!(sched.due(200), 1);
    }

    #[test]
    fn late_poll_catches_up() {
        let mut sched = TickScheduler::new();
        sched.schedule(TickKind::Inspection, 100, 0);
        assert_eq!(sched.due(550), 5);
        assert_eq!(sched.due(600), 1);
    }

    #[test]
    fn rescheduling_replaces_previous_task() {
        let mut sched = TickScheduler::new();
        sched.schedule(TickKind::Inspection, 100, 0);
        sched.schedule(TickKind::Elapsed, 10, 50);
        assert_eq!(sched.active(), Some(TickKind::Elapsed));
        assert_eq!(sched.interval_ms(), Some(10));
        assert_eq!(sched.due(60), 1);
    }

    #[test]
    fn cancel_stops_firing() {
        let mut sched = TickScheduler::new();
        sched.schedule(TickKind::Elapsed, 10, 0);
        assert_eq!(sched.cancel(), Some(TickKind::Elapsed));
        assert_eq!(sched.due(1_000), 0);
        assert_eq!(sched.cancel(), None);
    }

    #[test]
    fn zero_interval_is_clamped() {
        let mut sched = TickScheduler::new();
        sched.schedule(TickKind::Elapsed, 0, 0);
        assert_eq!(sched.interval_ms(), Some(1));
        assert_eq!(sched.due(3), 3);
    }
}
