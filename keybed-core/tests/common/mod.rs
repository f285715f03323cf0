#![allow(dead_code)]
//! Test harness utilities for keybed-core integration tests.

use std::time::Duration;

use keybed_core::{Keyboard, VoiceEvent};
use keybed_types::{KeyboardConfig, NoteKey, Priority, StepRate, Timing};

pub type Recorder = Keyboard<Vec<VoiceEvent>>;

/// Build a keyboard that records every voice event.
pub fn keyboard(voices: usize, priority: Priority) -> Recorder {
    let config = KeyboardConfig {
        voices,
        priority,
        held_capacity: 32,
    };
    Keyboard::new(config, Vec::new()).expect("valid keyboard config")
}

/// 120 bpm eighth notes: 250 ms per step.
pub fn eighths(gate: f32) -> Timing {
    Timing::new(120.0, StepRate::Eighth, gate)
}

pub const STEP: Duration = Duration::from_millis(250);
pub const HALF_STEP: Duration = Duration::from_millis(125);

pub fn key(k: u32) -> NoteKey {
    NoteKey::new(k)
}

/// Pitches of every press, in order.
pub fn pressed_pitches(kb: &Recorder) -> Vec<u8> {
    kb.listener()
        .iter()
        .filter(|e| e.is_press())
        .map(|e| e.pitch())
        .collect()
}

/// Events recorded from index `from` on.
pub fn events_since(kb: &Recorder, from: usize) -> Vec<VoiceEvent> {
    kb.listener()[from..].to_vec()
}

/// Voice index a key is sounding on.
pub fn voice_of_key(kb: &Recorder, k: u32) -> Option<usize> {
    kb.voice_of_key(key(k)).map(|v| v.index())
}

/// Panic unless no two held notes share a voice and every bound voice points at a held note.
pub fn assert_bindings_consistent(kb: &Recorder) {
    let mut seen = Vec::new();
    for voice in kb.voices() {
        if let Some(id) = voice.note() {
            assert!(kb.note(id).is_some(), "voice {} bound to missing note {}", voice.index(), id);
            assert!(!seen.contains(&id), "note {} bound to two voices", id);
            seen.push(id);
            assert_eq!(kb.voice_of(id).map(|v| v.index()), Some(voice.index()));
        }
    }
}
