//! Arpeggiator: steps through the keyboard's input notes and plays them one
//! at a time as generated notes.
//!
//! The traversal sequence is rebuilt at every step from the notes held at
//! that moment, so mode, octave and held-set changes apply to the next note.
//! The position in the sequence is tracked by the identity of the last
//! emitted entry (source note plus octave), not by index, which keeps the
//! cursor stable when notes are added or removed mid-cycle.

use std::time::Duration;

use keybed_types::arpeggiator::{validate_octaves, validate_probability};
use keybed_types::{
    ArpMode, ArpeggiatorConfig, ConfigError, NoteId, NoteOrigin, OctaveDirection, Timing,
    MAX_HELD_CAPACITY, MAX_OCTAVES, MAX_PITCH,
};

use crate::clock::{ClockEvent, StepClock};
use crate::keyboard::Keyboard;
use crate::listener::VoiceListener;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArpState {
    Idle,
    Running,
}

/// One slot in the traversal sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ArpEntry {
    pitch: u8,
    velocity: f32,
    source: NoteId,
    octave: u8,
}

impl ArpEntry {
    fn same_slot(&self, other: &ArpEntry) -> bool {
        self.source == other.source && self.octave == other.octave
    }
}

type SortKey = (i16, i16, NoteId);

/// Ordering of entries for a mode. Octave-major so each octave pass
/// covers the whole held set before the next one starts; ties go to the
/// earlier arrival. Downward octaves sort below the held notes.
fn sort_key(mode: ArpMode, direction: OctaveDirection, entry: &ArpEntry) -> SortKey {
    let octave = entry.octave as i16;
    let shift = octave * direction.semitones().signum();
    let pitch = entry.pitch as i16;
    match mode {
        ArpMode::Up | ArpMode::UpDown | ArpMode::Random => (shift, pitch, entry.source),
        ArpMode::Down | ArpMode::DownUp => (-shift, -pitch, entry.source),
        ArpMode::AsPlayed => (octave, 0, entry.source),
    }
}

pub struct Arpeggiator {
    config: ArpeggiatorConfig,
    enabled: bool,
    state: ArpState,
    clock: StepClock,
    rng_state: u64,
    ascending: bool, // UpDown/DownUp direction through the sequence
    current: Option<NoteId>,
    gate_pending: bool,
    last: Option<ArpEntry>,
    sequence: Vec<ArpEntry>,
}

impl Arpeggiator {
    /// `capacity` is the keyboard's held-note capacity. The traversal
    /// sequence is reserved for it at every octave count, so ticking never
    /// allocates.
    pub fn new(config: ArpeggiatorConfig, capacity: usize) -> Result<Self, ConfigError> {
        config.validate()?;
        let capacity = capacity.min(MAX_HELD_CAPACITY);
        Ok(Self {
            config,
            enabled: false,
            state: ArpState::Idle,
            clock: StepClock::new(config.timing),
            rng_state: config.seed,
            ascending: true,
            current: None,
            gate_pending: false,
            last: None,
            sequence: Vec::with_capacity(capacity * MAX_OCTAVES as usize),
        })
    }

    /// Take over the keyboard's input notes.
    pub fn enable<L: VoiceListener>(&mut self, keyboard: &mut Keyboard<L>) {
        if self.enabled {
            return;
        }
        self.enabled = true;
        keyboard.set_arp_engaged(true);
        log::debug!(target: "arpeggiator", "enabled ({})", self.config.mode.name());
    }

    /// Release the sounding note and hand input notes back to the keyboard.
    pub fn disable<L: VoiceListener>(&mut self, keyboard: &mut Keyboard<L>) {
        if !self.enabled {
            return;
        }
        self.enabled = false;
        self.go_idle(keyboard);
        keyboard.set_arp_engaged(false);
        log::debug!(target: "arpeggiator", "disabled");
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn state(&self) -> ArpState {
        self.state
    }

    /// Note the arpeggiator is currently sounding.
    pub fn current(&self) -> Option<NoteId> {
        self.current
    }

    pub fn config(&self) -> &ArpeggiatorConfig {
        &self.config
    }

    pub fn set_mode(&mut self, mode: ArpMode) {
        if mode != self.config.mode {
            self.config.mode = mode;
            self.ascending = true;
        }
    }

    pub fn set_octaves(&mut self, octaves: u8) -> Result<(), ConfigError> {
        validate_octaves(octaves)?;
        self.config.octaves = octaves;
        Ok(())
    }

    pub fn set_octave_direction(&mut self, direction: OctaveDirection) {
        self.config.octave_direction = direction;
    }

    pub fn set_timing(&mut self, timing: Timing) -> Result<(), ConfigError> {
        timing.validate()?;
        self.config.timing = timing;
        self.clock.set_timing(timing);
        Ok(())
    }

    pub fn set_probability(&mut self, probability: f32) -> Result<(), ConfigError> {
        validate_probability(probability)?;
        self.config.probability = probability;
        Ok(())
    }

    /// Advance by `elapsed`. Returns the number of steps taken, including
    /// steps silenced by probability.
    pub fn tick<L: VoiceListener>(&mut self, elapsed: Duration, keyboard: &mut Keyboard<L>) -> usize {
        if !self.enabled {
            return 0;
        }

        if !keyboard.has_input_notes() {
            if self.state == ArpState::Running {
                self.go_idle(keyboard);
            }
            return 0;
        }

        if self.state == ArpState::Idle {
            self.state = ArpState::Running;
            self.clock.restart();
            log::trace!(target: "arpeggiator", "running");
        } else {
            self.clock.accumulate(elapsed);
        }

        let mut steps = 0;
        loop {
            let gate = if self.gate_pending {
                StepClock::gate_point(self.config.timing.gate)
            } else {
                None
            };
            match self.clock.poll(gate) {
                Some(ClockEvent::GateClose) => self.release_current(keyboard),
                Some(ClockEvent::Step) => {
                    self.step(keyboard);
                    steps += 1;
                }
                None => break,
            }
        }
        steps
    }

    fn step<L: VoiceListener>(&mut self, keyboard: &mut Keyboard<L>) {
        self.release_current(keyboard);

        let probability = self.config.probability;
        if probability < 1.0 && (probability == 0.0 || self.next_unit() > probability) {
            log::trace!(target: "arpeggiator", "step skipped");
            return;
        }

        self.build_sequence(keyboard);
        let Some(index) = self.next_index() else {
            return;
        };
        let entry = self.sequence[index];
        self.last = Some(entry);

        match keyboard.trigger(NoteOrigin::Arpeggiator, entry.pitch, entry.velocity) {
            Ok(id) => {
                log::trace!(target: "arpeggiator", "step -> pitch {} ({})", entry.pitch, id);
                self.current = Some(id);
                self.gate_pending = true;
            }
            Err(e) => log::warn!(target: "arpeggiator", "step dropped: {}", e),
        }
    }

    fn build_sequence<L: VoiceListener>(&mut self, keyboard: &Keyboard<L>) {
        self.sequence.clear();
        let direction = self.config.octave_direction;
        for octave in 0..self.config.octaves {
            for note in keyboard.input_notes() {
                let pitched = note.pitch() as i16 + octave as i16 * direction.semitones();
                if (0..=MAX_PITCH as i16).contains(&pitched) {
                    self.sequence.push(ArpEntry {
                        pitch: pitched as u8,
                        velocity: note.velocity(),
                        source: note.id(),
                        octave,
                    });
                }
            }
        }
        let mode = self.config.mode;
        self.sequence.sort_unstable_by_key(|e| sort_key(mode, direction, e));
    }

    /// Pick the next sequence index after `last`, per mode.
    fn next_index(&mut self) -> Option<usize> {
        let n = self.sequence.len();
        if n == 0 {
            return None;
        }
        let mode = self.config.mode;
        let direction = self.config.octave_direction;

        // Neighbours of the last entry; if it is gone, of where it would sort.
        let (found, before, after) = match self.last {
            None => {
                self.ascending = true;
                if mode == ArpMode::Random {
                    return Some(self.next_random(n));
                }
                return Some(0);
            }
            Some(last) => match self.sequence.iter().position(|e| e.same_slot(&last)) {
                Some(i) => (Some(i), i.checked_sub(1), i + 1),
                None => {
                    let key = sort_key(mode, direction, &last);
                    let p = self.sequence.partition_point(|e| sort_key(mode, direction, e) < key);
                    (None, p.checked_sub(1), p)
                }
            },
        };

        let index = match mode {
            ArpMode::Random => match found {
                Some(i) if n > 1 => {
                    let r = self.next_random(n - 1);
                    if r >= i {
                        r + 1
                    } else {
                        r
                    }
                }
                _ => self.next_random(n),
            },
            _ if !mode.bounces() => after % n,
            _ if n == 1 => 0,
            _ if self.ascending => {
                if after < n {
                    after
                } else {
                    self.ascending = false;
                    before.unwrap_or(0)
                }
            }
            _ => match before {
                Some(b) => b,
                None => {
                    self.ascending = true;
                    after.min(n - 1)
                }
            },
        };
        Some(index)
    }

    fn release_current<L: VoiceListener>(&mut self, keyboard: &mut Keyboard<L>) {
        self.gate_pending = false;
        if let Some(id) = self.current.take() {
            if keyboard.note(id).is_some() {
                let _ = keyboard.release_note(id);
            }
        }
    }

    fn go_idle<L: VoiceListener>(&mut self, keyboard: &mut Keyboard<L>) {
        self.release_current(keyboard);
        self.state = ArpState::Idle;
        self.clock.reset();
        self.last = None;
        self.ascending = true;
        log::trace!(target: "arpeggiator", "idle");
    }

    fn next_rng(&mut self) -> u64 {
        self.rng_state = self
            .rng_state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.rng_state >> 33
    }

    fn next_random(&mut self, n: usize) -> usize {
        (self.next_rng() as usize) % n
    }

    /// Uniform value in [0, 1).
    fn next_unit(&mut self) -> f32 {
        (self.next_rng() as f64 / (1u64 << 31) as f64) as f32
    }
}
