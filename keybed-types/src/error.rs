//! Error types.
//!
//! `KeyboardError` covers recoverable conditions on the press/release path;
//! the keyboard is left untouched when one is returned. `ConfigError` is
//! raised by constructors and setters only, never while ticking.

use std::fmt;

use crate::{NoteId, NoteKey};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyboardError {
    /// Press for a key that is already held.
    DuplicateKey(NoteKey),
    /// Release for a key that is not held.
    UnknownKey(NoteKey),
    /// Release for a generated note that is not held.
    UnknownNote(NoteId),
    /// Pitch above 127 or velocity outside 0.0-1.0.
    InvalidNote { pitch: u8, velocity: f32 },
    /// Held-note table is at its configured capacity.
    HeldFull(usize),
}

impl fmt::Display for KeyboardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateKey(key) => write!(f, "key {} is already held", key),
            Self::UnknownKey(key) => write!(f, "key {} is not held", key),
            Self::UnknownNote(id) => write!(f, "note {} is not held", id),
            Self::InvalidNote { pitch, velocity } => {
                write!(f, "invalid note: pitch {} velocity {}", pitch, velocity)
            }
            Self::HeldFull(capacity) => write!(f, "all {} held-note slots are in use", capacity),
        }
    }
}

impl std::error::Error for KeyboardError {}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    NoVoices,
    EmptyPattern,
    NoTracks,
    NoOctaves,
    OctavesOutOfRange(u8),
    CapacityOutOfRange(usize),
    PitchOutOfRange(u8),
    VelocityOutOfRange(f32),
    GateOutOfRange(f32),
    TempoOutOfRange(f32),
    StepsOutOfRange(f32),
    ProbabilityOutOfRange(f32),
    TrackOutOfRange { track: usize, tracks: usize },
    StepOutOfRange { step: usize, length: usize },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoVoices => write!(f, "keyboard needs at least one voice"),
            Self::EmptyPattern => write!(f, "sequencer pattern length must be at least 1"),
            Self::NoTracks => write!(f, "sequencer needs at least one track"),
            Self::NoOctaves => write!(f, "arpeggiator octave count must be at least 1"),
            Self::OctavesOutOfRange(n) => write!(f, "{} arpeggiator octaves out of range 1-11", n),
            Self::CapacityOutOfRange(n) => write!(f, "held capacity {} out of range 1-1024", n),
            Self::PitchOutOfRange(p) => write!(f, "pitch {} out of range 0-127", p),
            Self::VelocityOutOfRange(v) => write!(f, "velocity {} out of range 0.0-1.0", v),
            Self::GateOutOfRange(g) => write!(f, "gate {} must be greater than 0", g),
            Self::TempoOutOfRange(bpm) => write!(f, "tempo {} bpm out of range 1-999", bpm),
            Self::StepsOutOfRange(s) => write!(f, "{} steps per beat out of range 0.25-64", s),
            Self::ProbabilityOutOfRange(p) => write!(f, "probability {} out of range 0.0-1.0", p),
            Self::TrackOutOfRange { track, tracks } => {
                write!(f, "track {} out of range ({} tracks)", track, tracks)
            }
            Self::StepOutOfRange { step, length } => {
                write!(f, "step {} out of range (length {})", step, length)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            KeyboardError::DuplicateKey(NoteKey::new(7)).to_string(),
            "key 7 is already held"
        );
        assert_eq!(
            ConfigError::StepOutOfRange { step: 16, length: 16 }.to_string(),
            "step 16 out of range (length 16)"
        );
    }
}
