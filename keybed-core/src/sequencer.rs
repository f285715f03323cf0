//! Step sequencer: plays fixed-length patterns through the keyboard.
//!
//! Every track is monophonic and owns at most one sounding note. All tracks
//! share one length and one clock, so step N of every track fires together.

use std::time::Duration;

use keybed_types::{ConfigError, NoteId, NoteOrigin, SequencerConfig, Step, Timing};

use crate::clock::{ClockEvent, StepClock};
use crate::keyboard::Keyboard;
use crate::listener::VoiceListener;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqState {
    Stopped,
    Playing,
}

#[derive(Debug, Clone)]
struct Track {
    steps: Vec<Step>,
    sounding: Option<NoteId>,
    gate: Option<f64>, // release point inside the current step
}

impl Track {
    fn new(length: usize) -> Self {
        Self {
            steps: vec![Step::rest(); length],
            sounding: None,
            gate: None,
        }
    }

    fn release<L: VoiceListener>(&mut self, keyboard: &mut Keyboard<L>) {
        self.gate = None;
        if let Some(id) = self.sounding.take() {
            if keyboard.note(id).is_some() {
                let _ = keyboard.release_note(id);
            }
        }
    }
}

pub struct Sequencer {
    tracks: Vec<Track>,
    length: usize,
    position: usize,
    fresh: bool, // `position` has not been played yet
    armed: bool, // started; the next tick steps without accumulating
    state: SeqState,
    clock: StepClock,
    resume: bool,
}

impl Sequencer {
    pub fn new(config: SequencerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            tracks: (0..config.tracks).map(|_| Track::new(config.length)).collect(),
            length: config.length,
            position: 0,
            fresh: true,
            armed: false,
            state: SeqState::Stopped,
            clock: StepClock::new(config.timing),
            resume: config.resume,
        })
    }

    /// Start playing. The current position sounds on the next tick.
    pub fn start(&mut self) {
        if self.state == SeqState::Playing {
            return;
        }
        self.state = SeqState::Playing;
        self.armed = true;
        self.clock.restart();
        log::debug!(target: "sequencer", "start at step {}", self.position);
    }

    /// Stop and release every sounding note before returning.
    pub fn stop<L: VoiceListener>(&mut self, keyboard: &mut Keyboard<L>) {
        if self.state == SeqState::Stopped {
            return;
        }
        self.state = SeqState::Stopped;
        for track in &mut self.tracks {
            track.release(keyboard);
        }
        self.clock.reset();
        if !self.resume {
            self.position = 0;
            self.fresh = true;
        }
        log::debug!(target: "sequencer", "stop at step {}", self.position);
    }

    pub fn state(&self) -> SeqState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == SeqState::Playing
    }

    /// Last step played, or the step that plays next after a reset.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn timing(&self) -> Timing {
        self.clock.timing()
    }

    pub fn set_timing(&mut self, timing: Timing) -> Result<(), ConfigError> {
        timing.validate()?;
        self.clock.set_timing(timing);
        Ok(())
    }

    pub fn resume(&self) -> bool {
        self.resume
    }

    pub fn set_resume(&mut self, resume: bool) {
        self.resume = resume;
    }

    /// Note a track is currently sounding.
    pub fn sounding(&self, track: usize) -> Option<NoteId> {
        self.tracks.get(track).and_then(|t| t.sounding)
    }

    pub fn step(&self, track: usize, index: usize) -> Option<&Step> {
        self.tracks.get(track).and_then(|t| t.steps.get(index))
    }

    pub fn set_step(&mut self, track: usize, index: usize, step: Step) -> Result<(), ConfigError> {
        step.validate()?;
        let slot = self.slot_mut(track, index)?;
        *slot = step;
        Ok(())
    }

    pub fn clear_step(&mut self, track: usize, index: usize) -> Result<(), ConfigError> {
        let slot = self.slot_mut(track, index)?;
        *slot = Step::rest();
        Ok(())
    }

    /// Replace a whole track. Missing steps are rests; extra steps are dropped.
    pub fn set_pattern(&mut self, track: usize, steps: &[Step]) -> Result<(), ConfigError> {
        for step in steps {
            step.validate()?;
        }
        let tracks = self.tracks.len();
        let t = self
            .tracks
            .get_mut(track)
            .ok_or(ConfigError::TrackOutOfRange { track, tracks })?;
        for (i, slot) in t.steps.iter_mut().enumerate() {
            *slot = steps.get(i).copied().unwrap_or_default();
        }
        Ok(())
    }

    /// Truncate or extend every track. New steps are rests.
    pub fn set_length(&mut self, length: usize) -> Result<(), ConfigError> {
        if length == 0 {
            return Err(ConfigError::EmptyPattern);
        }
        for track in &mut self.tracks {
            track.steps.resize(length, Step::rest());
        }
        self.length = length;
        if self.position >= length {
            self.position = 0;
            self.fresh = true;
        }
        Ok(())
    }

    /// Add or remove tracks. Removed tracks release their note first.
    pub fn set_tracks<L: VoiceListener>(
        &mut self,
        tracks: usize,
        keyboard: &mut Keyboard<L>,
    ) -> Result<(), ConfigError> {
        if tracks == 0 {
            return Err(ConfigError::NoTracks);
        }
        while self.tracks.len() > tracks {
            if let Some(mut track) = self.tracks.pop() {
                track.release(keyboard);
            }
        }
        while self.tracks.len() < tracks {
            self.tracks.push(Track::new(self.length));
        }
        Ok(())
    }

    /// Advance by `elapsed`. Returns the number of steps played.
    pub fn tick<L: VoiceListener>(&mut self, elapsed: Duration, keyboard: &mut Keyboard<L>) -> usize {
        if self.state != SeqState::Playing {
            return 0;
        }
        if self.armed {
            self.armed = false;
        } else {
            self.clock.accumulate(elapsed);
        }

        let mut steps = 0;
        loop {
            let gate = self
                .tracks
                .iter()
                .filter_map(|t| t.gate)
                .min_by(|a, b| a.total_cmp(b));
            match self.clock.poll(gate) {
                Some(ClockEvent::GateClose) => self.close_gates(keyboard),
                Some(ClockEvent::Step) => {
                    self.play_next(keyboard);
                    steps += 1;
                }
                None => break,
            }
        }
        steps
    }

    fn play_next<L: VoiceListener>(&mut self, keyboard: &mut Keyboard<L>) {
        let start = if self.fresh {
            self.position
        } else {
            (self.position + 1) % self.length
        };
        // Positions disabled on every track are skipped; if all are, play `start` as rests.
        let pos = (0..self.length)
            .map(|offset| (start + offset) % self.length)
            .find(|&p| self.tracks.iter().any(|t| t.steps[p].enabled))
            .unwrap_or(start);
        self.position = pos;
        self.fresh = false;

        for (index, track) in self.tracks.iter_mut().enumerate() {
            let step = track.steps[pos];
            if !step.enabled || step.is_rest() {
                track.release(keyboard);
            } else if step.tie {
                if track.sounding.is_some() {
                    track.gate = StepClock::gate_point(step.gate);
                }
            } else if let Some(pitch) = step.pitch {
                track.release(keyboard);
                let origin = NoteOrigin::Sequencer { track: index };
                match keyboard.trigger(origin, pitch, step.velocity) {
                    Ok(id) => {
                        track.sounding = Some(id);
                        track.gate = StepClock::gate_point(step.gate);
                    }
                    Err(e) => log::warn!(target: "sequencer", "track {} step {}: {}", index, pos, e),
                }
            }
        }
        log::trace!(target: "sequencer", "step {}", pos);
    }

    fn close_gates<L: VoiceListener>(&mut self, keyboard: &mut Keyboard<L>) {
        let phase = self.clock.phase();
        for track in &mut self.tracks {
            if track.gate.is_some_and(|g| g <= phase) {
                track.release(keyboard);
            }
        }
    }

    fn slot_mut(&mut self, track: usize, index: usize) -> Result<&mut Step, ConfigError> {
        let tracks = self.tracks.len();
        let length = self.length;
        let t = self
            .tracks
            .get_mut(track)
            .ok_or(ConfigError::TrackOutOfRange { track, tracks })?;
        t.steps
            .get_mut(index)
            .ok_or(ConfigError::StepOutOfRange { step: index, length })
    }
}
