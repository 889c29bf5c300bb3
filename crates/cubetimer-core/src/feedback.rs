//! Optional audio cues.
//!
//! Playback failures are logged and swallowed; the timer never waits on or
//! reacts to a sound.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::FeedbackError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cue {
    Start,
    Stop,
    Inspection,
}

/// A short beep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tone {
    pub frequency_hz: u32,
    pub duration_ms: u32,
}

impl Cue {
    pub fn tone(self) -> Tone {
        let (frequency_hz, duration_ms) = match self {
            Cue::Start => (600, 150),
            Cue::Stop => (1000, 200),
            Cue::Inspection => (400, 100),
        };
        Tone {
            frequency_hz,
            duration_ms,
        }
    }
}

pub trait SoundPlayer {
    /// `volume` is in 0.0 ..= 1.0.
    fn play(&mut self, tone: Tone, volume: f64) -> Result<(), FeedbackError>;
}

/// Plays nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl SoundPlayer for Silent {
    fn play(&mut self, _tone: Tone, _volume: f64) -> Result<(), FeedbackError> {
        Ok(())
    }
}

/// Play `cue` if sounds are enabled. Returns whether playback succeeded.
pub fn play_cue(player: &mut dyn SoundPlayer, cue: Cue, enabled: bool, volume: f64) -> bool {
    if !enabled {
        return false;
    }
    match player.play(cue.tone(), volume.clamp(0.0, 1.0)) {
        Ok(()) => true,
        Err(err) => {
            warn!(?cue, %err, "sound playback failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        played: Vec<(Tone, f64)>,
        fail: bool,
    }

    impl SoundPlayer for Recorder {
        fn play(&mut self, tone: Tone, volume: f64) -> Result<(), FeedbackError> {
            if self.fail {
                return Err(FeedbackError::Unsupported);
            }
            self.played.push((tone, volume));
            Ok(())
        }
    }

    #[test]
    fn cue_tones() {
        assert_eq!(Cue::Start.tone(), Tone { frequency_hz: 600, duration_ms: 150 });
        assert_eq!(Cue::Stop.tone(), Tone { frequency_hz: 1000, duration_ms: 200 });
        assert_eq!(Cue::Inspection.tone(), Tone { frequency_hz: 400, duration_ms: 100 });
    }

    #[test]
    fn disabled_plays_nothing() {
        let mut rec = Recorder::default();
        assert!(!play_cue(&mut rec, Cue::Start, false, 0.5));
        assert!(rec.played.is_empty());
    }

    #[test]
    fn volume_is_clamped() {
        let mut rec = Recorder::default();
        assert!(play_cue(&mut rec, Cue::Stop, true, 3.0));
        assert_eq!(rec.played, vec![(Cue::Stop.tone(), 1.0)]);
    }

    #[test]
    fn failures_are_swallowed() {
        let mut rec = Recorder {
            fail: true,
            ..Default::default()
        };
        assert!(!play_cue(&mut rec, Cue::Inspection, true, 0.5));
        assert!(play_cue(&mut Silent, Cue::Inspection, true, 0.5));
    }
}
