//! # keybed-types
//!
//! Shared type definitions for the keybed note engine.
//! Plain data only: notes, voices, allocation policy, arpeggiator and
//! sequencer configuration, and the error types raised by the engine.

pub mod arpeggiator;
pub mod error;
pub mod note;
pub mod priority;
pub mod sequencer;
pub mod timing;
pub mod voice;

pub use arpeggiator::{ArpMode, ArpeggiatorConfig, OctaveDirection, MAX_OCTAVES};
pub use error::{ConfigError, KeyboardError};
pub use note::{Note, NoteOrigin, MAX_PITCH};
pub use priority::Priority;
pub use sequencer::{SequencerConfig, Step};
pub use timing::{StepRate, Timing, MAX_STEPS_PER_BEAT};
pub use voice::{KeyboardConfig, Voice, VoiceIndex, MAX_HELD_CAPACITY};

/// Caller-defined identity of a physical key or MIDI note used to press and release.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct NoteKey(u32);

impl NoteKey {
    pub fn new(key: u32) -> Self {
        Self(key)
    }
    pub fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for NoteKey {
    fn from(key: u32) -> Self {
        Self(key)
    }
}

impl std::fmt::Display for NoteKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Arrival sequence number of a note. Strictly increasing per keyboard, so it
/// doubles as the note's identity and its arrival order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct NoteId(u64);

impl NoteId {
    pub fn new(seq: u64) -> Self {
        Self(seq)
    }
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for NoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
