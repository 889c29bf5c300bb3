mod machine;
mod scheduler;

pub use machine::{
    Signal, TimerEvent, TimerMachine, TimerSettings, TimerSnapshot, TimerState, TimerThresholds,
};
pub use scheduler::{TickKind, TickScheduler};
