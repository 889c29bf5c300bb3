//! Scramble generation.
//!
//! The core only needs *some* non-empty scramble before a solve starts.
//! [`ScrambleGenerator`] is the seam for a real scrambling library; the two
//! local random-move generators here serve as default and fallback.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use tracing::warn;

use crate::error::ScrambleError;

/// A puzzle the timer knows how to scramble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CubeEvent {
    pub id: &'static str,
    pub name: &'static str,
    pub scramble_length: usize,
    /// WCA event code.
    pub event: &'static str,
}

pub const CUBE_EVENTS: [CubeEvent; 14] = [
    CubeEvent {
        id: "3x3",
        name: "3×3×3",
        scramble_length: 20,
        event: "333",
    },
    CubeEvent {
        id: "2x2",
        name: "2×2×2",
        scramble_length: 9,
        event: "222",
    },
    CubeEvent {
        id: "4x4",
        name: "4×4×4",
        scramble_length: 40,
        event: "444",
    },
    CubeEvent {
        id: "5x5",
        name: "5×5×5",
        scramble_length: 60,
        event: "555",
    },
    CubeEvent {
        id: "6x6",
        name: "6×6×6",
        scramble_length: 80,
        event: "666",
    },
    CubeEvent {
        id: "7x7",
        name: "7×7×7",
        scramble_length: 100,
        event: "777",
    },
    CubeEvent {
        id: "oh",
        name: "3×3 One-Handed",
        scramble_length: 20,
        event: "333oh",
    },
    CubeEvent {
        id: "bld",
        name: "3×3 Blindfolded",
        scramble_length: 20,
        event: "333bf",
    },
    CubeEvent {
        id: "fmc",
        name: "Fewest Moves",
        scramble_length: 1,
        event: "333fm",
    },
    CubeEvent {
        id: "clock",
        name: "Clock",
        scramble_length: 1,
        event: "clock",
    },
    CubeEvent {
        id: "mega",
        name: "Megaminx",
        scramble_length: 70,
        event: "minx",
    },
    CubeEvent {
        id: "pyra",
        name: "Pyraminx",
        scramble_length: 10,
        event: "pyram",
    },
    CubeEvent {
        id: "skewb",
        name: "Skewb",
        scramble_length: 10,
        event: "skewb",
    },
    CubeEvent {
        id: "sq1",
        name: "Square-1",
        scramble_length: 15,
        event: "sq1",
    },
];

/// Look up an event, defaulting to 3x3 for unknown ids.
pub fn cube_event(id: &str) -> &'static CubeEvent {
    CUBE_EVENTS
        .iter()
        .find(|e| e.id == id)
        .unwrap_or(&CUBE_EVENTS[0])
}

/// Used when every generator failed.
pub const FALLBACK_SCRAMBLE: &str = "R U R' U' R' F R2 U' R' U' R U R' F'";

/// A source of scrambles for a cube type.
pub trait ScrambleGenerator {
    fn generate(&mut self, cube_type: &str) -> Result<String, ScrambleError>;
}

impl<F> ScrambleGenerator for F
where
    F: FnMut(&str) -> Result<String, ScrambleError>,
{
    fn generate(&mut self, cube_type: &str) -> Result<String, ScrambleError> {
        self(cube_type)
    }
}

const FACE_TURNS: [&str; 6] = ["R", "L", "U", "D", "F", "B"];
const QUARTER_HALF: [&str; 3] = ["", "'", "2"];
const QUARTER: [&str; 2] = ["", "'"];

fn opposite(face: &str) -> Option<&'static str> {
    match face {
        "R" => Some("L"),
        "L" => Some("R"),
        "U" => Some("D"),
        "D" => Some("U"),
        "F" => Some("B"),
        "B" => Some("F"),
        _ => None,
    }
}

/// Random move sequence that never turns the same face twice in a row and
/// avoids `R L R` style sandwiches on opposite faces.
fn random_sequence<R: Rng>(
    rng: &mut R,
    faces: &[&'static str],
    modifiers: &[&str],
    length: usize,
) -> Vec<String> {
    let mut picked: Vec<&'static str> = Vec::with_capacity(length);
    for _ in 0..length {
        let mut face = faces[rng.gen_range(0..faces.len())];
        for _ in 0..50 {
            let n = picked.len();
            let repeats_last = n >= 1 && picked[n - 1] == face;
            let sandwich =
                n >= 2 && picked[n - 2] == face && opposite(picked[n - 1]) == Some(face);
            if !repeats_last && !sandwich {
                break;
            }
            face = faces[rng.gen_range(0..faces.len())];
        }
        picked.push(face);
    }
    picked
        .into_iter()
        .map(|face| format!("{face}{}", modifiers[rng.gen_range(0..modifiers.len())]))
        .collect()
}

/// Event-aware random-move scrambler.
#[derive(Debug, Clone)]
pub struct MoveScrambler<R = Pcg64> {
    rng: R,
}

impl MoveScrambler<Pcg64> {
    pub fn from_entropy() -> Self {
        Self {
            rng: Pcg64::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Pcg64::seed_from_u64(seed),
        }
    }
}

impl<R: Rng> MoveScrambler<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    fn square_one(&mut self, length: usize) -> String {
        (0..length)
            .map(|_| {
                let top: i32 = self.rng.gen_range(-6..6);
                let bottom: i32 = self.rng.gen_range(-6..6);
                format!("({top}, {bottom})")
            })
            .collect::<Vec<_>>()
            .join(" / ")
    }
}

impl<R: Rng> ScrambleGenerator for MoveScrambler<R> {
    fn generate(&mut self, cube_type: &str) -> Result<String, ScrambleError> {
        let event = cube_event(cube_type);
        let length = event.scramble_length;
        let moves = match event.id {
            "sq1" => return Ok(self.square_one(length)),
            "2x2" => random_sequence(&mut self.rng, &["R", "U", "F"], &QUARTER_HALF, length),
            "pyra" | "skewb" => {
                random_sequence(&mut self.rng, &["R", "L", "U", "B"], &QUARTER, length)
            }
            "mega" => random_sequence(
                &mut self.rng,
                &["R++", "R--", "D++", "D--", "U"],
                &QUARTER,
                length,
            ),
            _ => random_sequence(&mut self.rng, &FACE_TURNS, &QUARTER_HALF, length),
        };
        let scramble = moves.join(" ");
        if scramble.is_empty() {
            return Err(ScrambleError::Empty(cube_type.to_string()));
        }
        Ok(scramble)
    }
}

/// Plain face-turn scrambler sized by cube order. Used as the fallback.
#[derive(Debug, Clone)]
pub struct FaceTurnScrambler<R = Pcg64> {
    rng: R,
}

impl FaceTurnScrambler<Pcg64> {
    pub fn from_entropy() -> Self {
        Self {
            rng: Pcg64::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Pcg64::seed_from_u64(seed),
        }
    }
}

impl<R: Rng> FaceTurnScrambler<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    pub fn length_for(cube_type: &str) -> usize {
        match cube_type {
            "2x2" => 9,
            "4x4" => 40,
            "5x5" => 60,
            _ => 20,
        }
    }
}

impl<R: Rng> ScrambleGenerator for FaceTurnScrambler<R> {
    fn generate(&mut self, cube_type: &str) -> Result<String, ScrambleError> {
        let length = Self::length_for(cube_type);
        Ok(random_sequence(&mut self.rng, &FACE_TURNS, &QUARTER_HALF, length).join(" "))
    }
}

/// Ask `primary`, then `fallback`, then use [`FALLBACK_SCRAMBLE`]. Never
/// returns an empty string.
pub fn scramble_or_fallback<'a>(
    primary: &'a mut dyn ScrambleGenerator,
    fallback: &'a mut dyn ScrambleGenerator,
    cube_type: &str,
) -> String {
    for (source, generator) in [("primary", primary), ("fallback", fallback)] {
        match generator.generate(cube_type) {
            Ok(scramble) if !scramble.trim().is_empty() => return scramble,
            Ok(_) => warn!(source, cube_type, "scramble generator returned nothing"),
            Err(err) => warn!(source, cube_type, %err, "scramble generator failed"),
        }
    }
    FALLBACK_SCRAMBLE.to_string()
}
