//! Raw input to timer signals.
//!
//! Space, the primary pointer button and touch all map to press on the way
//! down and release on the way up. Only the down edge of space counts; OS key
//! repeat while held is dropped.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::Clock;
use crate::timer::{Signal, TimerEvent, TimerMachine};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Key {
    Space,
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputEvent {
    KeyDown {
        key: Key,
        #[serde(default)]
        repeat: bool,
    },
    KeyUp {
        key: Key,
    },
    PointerDown {
        button: PointerButton,
    },
    PointerUp {
        button: PointerButton,
    },
    TouchStart,
    TouchEnd,
}

/// Host-supplied "is a text field or dialog focused" query.
pub trait InputGate {
    fn should_suppress_input(&self) -> bool;
}

impl<F: Fn() -> bool> InputGate for F {
    fn should_suppress_input(&self) -> bool {
        self()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NeverSuppress;

impl InputGate for NeverSuppress {
    fn should_suppress_input(&self) -> bool {
        false
    }
}

pub struct InputDispatcher {
    gate: Box<dyn InputGate>,
    disabled: bool,
    space_held: bool,
}

impl Default for InputDispatcher {
    fn default() -> Self {
        Self::new(NeverSuppress)
    }
}

impl InputDispatcher {
    pub fn new(gate: impl InputGate + 'static) -> Self {
        Self {
            gate: Box::new(gate),
            disabled: false,
            space_held: false,
        }
    }

    pub fn set_gate(&mut self, gate: impl InputGate + 'static) {
        self.gate = Box::new(gate);
    }

    /// Explicit suppression, e.g. while a settings panel is open.
    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn space_held(&self) -> bool {
        self.space_held
    }

    fn suppressed(&self) -> bool {
        self.disabled || self.gate.should_suppress_input()
    }

    /// Map an event to a signal, or `None` if it is ignored or suppressed.
    pub fn translate(&mut self, event: &InputEvent) -> Option<Signal> {
        if self.suppressed() {
            if matches!(event, InputEvent::KeyUp { key: Key::Space }) {
                self.space_held = false;
            }
            debug!(?event, "input suppressed");
            return None;
        }
        match event {
            InputEvent::KeyDown {
                key: Key::Space,
                repeat,
            } => {
                if *repeat || self.space_held {
                    return None;
                }
                self.space_held = true;
                Some(Signal::Press)
            }
            InputEvent::KeyUp { key: Key::Space } => {
                self.space_held = false;
                Some(Signal::Release)
            }
            InputEvent::PointerDown {
                button: PointerButton::Primary,
            }
            | InputEvent::TouchStart => Some(Signal::Press),
            InputEvent::PointerUp {
                button: PointerButton::Primary,
            }
            | InputEvent::TouchEnd => Some(Signal::Release),
            _ => None,
        }
    }

    /// Translate and deliver to `timer`.
    pub fn dispatch<C: Clock>(
        &mut self,
        event: &InputEvent,
        timer: &mut TimerMachine<C>,
    ) -> Option<TimerEvent> {
        let signal = self.translate(event)?;
        timer.signal(signal)
    }
}
