use serde::{Deserialize, Serialize};

use crate::{ConfigError, Note, NoteId, Priority};

pub type VoiceIndex = usize;

/// One synthesis slot. A voice is either idle or bound to exactly one held note.
///
/// Voices do NOT own notes. `note` is a back-reference by id into the
/// keyboard's held-note collection; pitch and velocity are copied at bind
/// time so a synthesis backend can read them inside a callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voice {
    index: VoiceIndex,
    note: Option<NoteId>,
    pitch: u8,
    velocity: f32,
    bind_seq: u64,
}

impl Voice {
    #[inline]
    pub fn new(index: VoiceIndex) -> Self {
        Self {
            index,
            note: None,
            pitch: 0,
            velocity: 0.0,
            bind_seq: 0,
        }
    }

    pub fn index(&self) -> VoiceIndex {
        self.index
    }

    pub fn note(&self) -> Option<NoteId> {
        self.note
    }

    pub fn is_active(&self) -> bool {
        self.note.is_some()
    }

    /// Pitch of the bound note, or of the last bound note once released.
    pub fn pitch(&self) -> u8 {
        self.pitch
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    /// Keyboard-wide bind counter at the time this voice was last bound.
    /// Higher means more recently bound.
    pub fn bind_seq(&self) -> u64 {
        self.bind_seq
    }

    /// Bind to a note. Called by the keyboard only.
    pub fn bind(&mut self, note: &Note, bind_seq: u64) {
        self.note = Some(note.id());
        self.pitch = note.pitch();
        self.velocity = note.velocity();
        self.bind_seq = bind_seq;
    }

    /// Drop the note reference. Pitch is kept for release handling downstream.
    pub fn clear(&mut self) {
        self.note = None;
        self.velocity = 0.0;
    }
}

/// Upper bound on `KeyboardConfig::held_capacity`.
pub const MAX_HELD_CAPACITY: usize = 1024;

/// Keyboard construction parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyboardConfig {
    pub voices: usize,
    pub priority: Priority,
    /// Most notes held at once, reserved up front. Presses beyond it are refused.
    pub held_capacity: usize,
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self {
            voices: 1,
            priority: Priority::Last,
            held_capacity: 128,
        }
    }
}

impl KeyboardConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.voices == 0 {
            return Err(ConfigError::NoVoices);
        }
        if !(1..=MAX_HELD_CAPACITY).contains(&self.held_capacity) {
            return Err(ConfigError::CapacityOutOfRange(self.held_capacity));
        }
        Ok(())
    }
}
