//! # Cubetimer Core Library
//!
//! This library provides the core logic for a speedcubing timer. It has no UI
//! and no threads of its own: a UI shell feeds it input events, calls
//! `tick()` from its event loop and renders whatever the core publishes.
//!
//! ## Architecture
//!
//! - **Timer**: A wall-clock-based state machine (ready, inspection, running,
//!   stopped) with debounce guards and a single cancellable tick
//! - **Input**: Space / pointer / touch edges mapped to press and release,
//!   suppressed while the host reports a focused text field or dialog
//! - **Records & Stats**: Per-session solve history with +2/DNF penalties and
//!   trimmed averages
//! - **Storage**: SQLite or JSON snapshot persistence and TOML configuration
//!
//! ## Key Components
//!
//! - [`CubeTimer`]: Application state container and action API
//! - [`TimerMachine`]: Core timer state machine
//! - [`SessionManager`]: Sessions and their solves
//! - [`Database`]: Snapshot persistence
//! - [`Config`]: Application configuration management

pub mod app;
pub mod clock;
pub mod error;
pub mod events;
pub mod feedback;
pub mod format;
pub mod input;
pub mod record;
pub mod scramble;
pub mod session;
pub mod stats;
pub mod storage;
pub mod timer;

pub use app::CubeTimer;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, FeedbackError, ScrambleError, StorageError, ValidationError};
pub use events::{Notification, NotificationKind, Severity};
pub use input::{InputDispatcher, InputEvent, InputGate, Key, PointerButton};
pub use record::{Penalty, SolveStore, TimeEntry};
pub use scramble::{ScrambleGenerator, CUBE_EVENTS};
pub use session::{Session, SessionManager};
pub use stats::{Average, SessionStats};
pub use storage::{AppSettings, Config, Database, JsonFileStore, SettingsPatch, Snapshot, SnapshotStore};
pub use timer::{Signal, TimerEvent, TimerMachine, TimerSettings, TimerState, TimerThresholds};
