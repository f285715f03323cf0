use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{NoteId, NoteKey};

/// Highest valid pitch (MIDI note range).
pub const MAX_PITCH: u8 = 127;

/// Where a held note came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteOrigin {
    /// Pressed by an external input (key, MIDI note) under a caller-defined key.
    Input(NoteKey),
    /// Emitted by the arpeggiator.
    Arpeggiator,
    /// Emitted by a sequencer track.
    Sequencer { track: usize },
}

impl NoteOrigin {
    pub fn is_input(&self) -> bool {
        matches!(self, NoteOrigin::Input(_))
    }

    pub fn key(&self) -> Option<NoteKey> {
        match self {
            NoteOrigin::Input(key) => Some(*key),
            _ => None,
        }
    }
}

/// A requested pitch/velocity event. Immutable once created; the keyboard
/// owns it from press until the matching release.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Note {
    id: NoteId,
    origin: NoteOrigin,
    pitch: u8,
    velocity: f32,
    timestamp: Duration,
}

impl Note {
    pub fn new(id: NoteId, origin: NoteOrigin, pitch: u8, velocity: f32, timestamp: Duration) -> Self {
        Self {
            id,
            origin,
            pitch,
            velocity,
            timestamp,
        }
    }

    pub fn id(&self) -> NoteId {
        self.id
    }

    pub fn origin(&self) -> NoteOrigin {
        self.origin
    }

    /// The input key for notes pressed by an external input.
    pub fn key(&self) -> Option<NoteKey> {
        self.origin.key()
    }

    pub fn pitch(&self) -> u8 {
        self.pitch
    }

    /// Velocity, 0.0-1.0.
    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    /// Keyboard clock time at which the note arrived.
    pub fn timestamp(&self) -> Duration {
        self.timestamp
    }
}

/// Check pitch/velocity for a new note.
pub fn is_valid_note(pitch: u8, velocity: f32) -> bool {
    pitch <= MAX_PITCH && velocity.is_finite() && (0.0..=1.0).contains(&velocity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_key_only_for_input() {
        assert_eq!(NoteOrigin::Input(NoteKey::new(3)).key(), Some(NoteKey::new(3)));
        assert_eq!(NoteOrigin::Arpeggiator.key(), None);
        assert!(!NoteOrigin::Sequencer { track: 0 }.is_input());
    }

    #[test]
    fn note_validation() {
        assert!(is_valid_note(60, 0.8));
        assert!(is_valid_note(127, 1.0));
        assert!(!is_valid_note(128, 0.5));
        assert!(!is_valid_note(60, 1.5));
        assert!(!is_valid_note(60, f32::NAN));
    }
}
