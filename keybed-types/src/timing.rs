use serde::{Deserialize, Serialize};

use crate::ConfigError;

pub const MIN_BPM: f32 = 1.0;
pub const MAX_BPM: f32 = 999.0;
/// Slowest division: one step per whole note.
pub const MIN_STEPS_PER_BEAT: f32 = 0.25;
/// Finest division: 256th notes.
pub const MAX_STEPS_PER_BEAT: f32 = 64.0;

/// Common beat divisions, expressed as steps per quarter-note beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepRate {
    Whole,
    Half,
    Quarter,
    DottedQuarter,
    Eighth,
    Triplet,
    Sixteenth,
    ThirtySecond,
}

impl StepRate {
    pub fn name(&self) -> &'static str {
        match self {
            StepRate::Whole => "1/1",
            StepRate::Half => "1/2",
            StepRate::Quarter => "1/4",
            StepRate::DottedQuarter => "1/4.",
            StepRate::Eighth => "1/8",
            StepRate::Triplet => "1/8T",
            StepRate::Sixteenth => "1/16",
            StepRate::ThirtySecond => "1/32",
        }
    }

    /// Steps per beat (quarter note)
    pub fn steps_per_beat(&self) -> f32 {
        match self {
            StepRate::Whole => 0.25,
            StepRate::Half => 0.5,
            StepRate::Quarter => 1.0,
            StepRate::DottedQuarter => 1.5,
            StepRate::Eighth => 2.0,
            StepRate::Triplet => 3.0,
            StepRate::Sixteenth => 4.0,
            StepRate::ThirtySecond => 8.0,
        }
    }
}

/// Tempo, beat division and gate shared by the tick-driven producers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Timing {
    pub bpm: f32,
    pub steps_per_beat: f32,
    /// Fraction of a step a note sounds before release. Values >= 1.0 hold
    /// the note until the next step boundary.
    pub gate: f32,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            bpm: 120.0,
            steps_per_beat: StepRate::Eighth.steps_per_beat(),
            gate: 0.5,
        }
    }
}

impl Timing {
    pub fn new(bpm: f32, rate: StepRate, gate: f32) -> Self {
        Self {
            bpm,
            steps_per_beat: rate.steps_per_beat(),
            gate,
        }
    }

    /// Length of one step in seconds.
    pub fn step_secs(&self) -> f64 {
        60.0 / self.bpm as f64 / self.steps_per_beat as f64
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.bpm.is_finite() || !(MIN_BPM..=MAX_BPM).contains(&self.bpm) {
            return Err(ConfigError::TempoOutOfRange(self.bpm));
        }
        if !self.steps_per_beat.is_finite()
            || !(MIN_STEPS_PER_BEAT..=MAX_STEPS_PER_BEAT).contains(&self.steps_per_beat)
        {
            return Err(ConfigError::StepsOutOfRange(self.steps_per_beat));
        }
        validate_gate(self.gate)
    }
}

pub fn validate_gate(gate: f32) -> Result<(), ConfigError> {
    if !gate.is_finite() || gate <= 0.0 {
        return Err(ConfigError::GateOutOfRange(gate));
    }
    Ok(())
}
