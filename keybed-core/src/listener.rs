//! Voice lifecycle listener: the seam between the keyboard and a synthesis backend.
//!
//! `VoiceListener` captures what the keyboard *means* to do with a voice (start
//! or stop sounding a note) independently of how the backend renders it. The
//! keyboard calls it synchronously, in call order, from inside press, release
//! and tick.

use crossbeam_channel::{Sender, TrySendError};

use keybed_types::{Note, NoteId, NoteOrigin, Voice, VoiceIndex};

pub trait VoiceListener {
    /// A voice was bound to `note` and should start sounding.
    fn voice_pressed(&mut self, voice: &Voice, note: &Note);

    /// A voice was unbound from `note` (released or stolen) and should stop.
    fn voice_released(&mut self, voice: &Voice, note: &Note);
}

/// Owned record of one listener callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VoiceEvent {
    Pressed {
        voice: VoiceIndex,
        note: NoteId,
        origin: NoteOrigin,
        pitch: u8,
        velocity: f32,
    },
    Released {
        voice: VoiceIndex,
        note: NoteId,
        origin: NoteOrigin,
        pitch: u8,
    },
}

impl VoiceEvent {
    pub fn pressed(voice: &Voice, note: &Note) -> Self {
        VoiceEvent::Pressed {
            voice: voice.index(),
            note: note.id(),
            origin: note.origin(),
            pitch: note.pitch(),
            velocity: note.velocity(),
        }
    }

    pub fn released(voice: &Voice, note: &Note) -> Self {
        VoiceEvent::Released {
            voice: voice.index(),
            note: note.id(),
            origin: note.origin(),
            pitch: note.pitch(),
        }
    }

    pub fn voice(&self) -> VoiceIndex {
        match self {
            VoiceEvent::Pressed { voice, .. } | VoiceEvent::Released { voice, .. } => *voice,
        }
    }

    pub fn pitch(&self) -> u8 {
        match self {
            VoiceEvent::Pressed { pitch, .. } | VoiceEvent::Released { pitch, .. } => *pitch,
        }
    }

    pub fn is_press(&self) -> bool {
        matches!(self, VoiceEvent::Pressed { .. })
    }
}

/// Ignores every event.
impl VoiceListener for () {
    fn voice_pressed(&mut self, _voice: &Voice, _note: &Note) {}
    fn voice_released(&mut self, _voice: &Voice, _note: &Note) {}
}

/// Records every event in order.
impl VoiceListener for Vec<VoiceEvent> {
    fn voice_pressed(&mut self, voice: &Voice, note: &Note) {
        self.push(VoiceEvent::pressed(voice, note));
    }

    fn voice_released(&mut self, voice: &Voice, note: &Note) {
        self.push(VoiceEvent::released(voice, note));
    }
}

/// Forwards events to another thread. Never blocks; if the queue is full or
/// the receiver is gone the event is dropped and logged.
impl VoiceListener for Sender<VoiceEvent> {
    fn voice_pressed(&mut self, voice: &Voice, note: &Note) {
        forward(self, VoiceEvent::pressed(voice, note));
    }

    fn voice_released(&mut self, voice: &Voice, note: &Note) {
        forward(self, VoiceEvent::released(voice, note));
    }
}

fn forward(tx: &Sender<VoiceEvent>, event: VoiceEvent) {
    match tx.try_send(event) {
        Ok(()) => {}
        Err(TrySendError::Full(e)) => {
            log::warn!(target: "listener", "voice event queue full, dropped {:?}", e)
        }
        Err(TrySendError::Disconnected(e)) => {
            log::warn!(target: "listener", "voice event receiver gone, dropped {:?}", e)
        }
    }
}

impl<L: VoiceListener + ?Sized> VoiceListener for &mut L {
    fn voice_pressed(&mut self, voice: &Voice, note: &Note) {
        (**self).voice_pressed(voice, note);
    }

    fn voice_released(&mut self, voice: &Voice, note: &Note) {
        (**self).voice_released(voice, note);
    }
}

impl<L: VoiceListener + ?Sized> VoiceListener for Box<L> {
    fn voice_pressed(&mut self, voice: &Voice, note: &Note) {
        (**self).voice_pressed(voice, note);
    }

    fn voice_released(&mut self, voice: &Voice, note: &Note) {
        (**self).voice_released(voice, note);
    }
}
