use std::time::Duration;

use keybed_types::{
    ArpeggiatorConfig, ConfigError, KeyboardConfig, KeyboardError, NoteId, NoteKey, SequencerConfig,
};

use crate::arpeggiator::Arpeggiator;
use crate::config::Config;
use crate::keyboard::Keyboard;
use crate::listener::VoiceListener;
use crate::sequencer::Sequencer;

/// Steps taken by each producer during one `Rig::tick`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickSteps {
    pub arpeggiator: usize,
    pub sequencer: usize,
}

/// A keyboard with its arpeggiator and sequencer, driven from one control loop.
///
/// `tick` advances the keyboard clock, then the arpeggiator, then the
/// sequencer, so within one tick arpeggiator notes are pressed before
/// sequencer notes.
pub struct Rig<L: VoiceListener> {
    keyboard: Keyboard<L>,
    arpeggiator: Arpeggiator,
    sequencer: Sequencer,
}

impl<L: VoiceListener> Rig<L> {
    pub fn new(
        keyboard: KeyboardConfig,
        arpeggiator: ArpeggiatorConfig,
        sequencer: SequencerConfig,
        listener: L,
    ) -> Result<Self, ConfigError> {
        let held_capacity = keyboard.held_capacity;
        Ok(Self {
            keyboard: Keyboard::new(keyboard, listener)?,
            arpeggiator: Arpeggiator::new(arpeggiator, held_capacity)?,
            sequencer: Sequencer::new(sequencer)?,
        })
    }

    pub fn from_config(config: &Config, listener: L) -> Result<Self, ConfigError> {
        Self::new(config.keyboard(), config.arpeggiator(), config.sequencer(), listener)
    }

    pub fn press(&mut self, key: NoteKey, pitch: u8, velocity: f32) -> Result<NoteId, KeyboardError> {
        self.keyboard.press(key, pitch, velocity)
    }

    pub fn release(&mut self, key: NoteKey) -> Result<(), KeyboardError> {
        self.keyboard.release(key)
    }

    pub fn set_sustain(&mut self, on: bool) {
        self.keyboard.set_sustain(on);
    }

    pub fn set_arpeggiator_enabled(&mut self, enabled: bool) {
        if enabled {
            self.arpeggiator.enable(&mut self.keyboard);
        } else {
            self.arpeggiator.disable(&mut self.keyboard);
        }
    }

    pub fn start_sequencer(&mut self) {
        self.sequencer.start();
    }

    pub fn stop_sequencer(&mut self) {
        self.sequencer.stop(&mut self.keyboard);
    }

    /// Stop both producers and silence every voice.
    pub fn all_notes_off(&mut self) {
        self.sequencer.stop(&mut self.keyboard);
        self.arpeggiator.disable(&mut self.keyboard);
        self.keyboard.release_all();
    }

    /// Advance everything by `elapsed`.
    pub fn tick(&mut self, elapsed: Duration) -> TickSteps {
        self.keyboard.advance(elapsed);
        let arpeggiator = self.arpeggiator.tick(elapsed, &mut self.keyboard);
        let sequencer = self.sequencer.tick(elapsed, &mut self.keyboard);
        TickSteps { arpeggiator, sequencer }
    }

    pub fn keyboard(&self) -> &Keyboard<L> {
        &self.keyboard
    }

    pub fn keyboard_mut(&mut self) -> &mut Keyboard<L> {
        &mut self.keyboard
    }

    pub fn arpeggiator(&self) -> &Arpeggiator {
        &self.arpeggiator
    }

    pub fn arpeggiator_mut(&mut self) -> &mut Arpeggiator {
        &mut self.arpeggiator
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    pub fn sequencer_mut(&mut self) -> &mut Sequencer {
        &mut self.sequencer
    }

    /// Split borrow for calls that need the keyboard alongside a producer.
    pub fn parts_mut(&mut self) -> (&mut Keyboard<L>, &mut Arpeggiator, &mut Sequencer) {
        (&mut self.keyboard, &mut self.arpeggiator, &mut self.sequencer)
    }

    pub fn listener(&self) -> &L {
        self.keyboard.listener()
    }
}
