//! Step sequencer types.

use serde::{Deserialize, Serialize};

use crate::timing::validate_gate;
use crate::{ConfigError, StepRate, Timing, MAX_PITCH};

/// A single step in a sequencer track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub pitch: Option<u8>, // None = rest
    pub velocity: f32,     // 0.0-1.0
    pub gate: f32,         // fraction of the step window, >= 1.0 holds to the boundary
    pub enabled: bool,
    pub tie: bool, // continue the previous note instead of pressing
}

impl Default for Step {
    fn default() -> Self {
        Self {
            pitch: None,
            velocity: 1.0,
            gate: 0.5,
            enabled: true,
            tie: false,
        }
    }
}

impl Step {
    pub fn note(pitch: u8, velocity: f32) -> Self {
        Self {
            pitch: Some(pitch),
            velocity,
            ..Default::default()
        }
    }

    pub fn rest() -> Self {
        Self::default()
    }

    pub fn tie() -> Self {
        Self {
            tie: true,
            ..Default::default()
        }
    }

    pub fn with_gate(mut self, gate: f32) -> Self {
        self.gate = gate;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn is_rest(&self) -> bool {
        self.pitch.is_none() && !self.tie
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(pitch) = self.pitch {
            if pitch > MAX_PITCH {
                return Err(ConfigError::PitchOutOfRange(pitch));
            }
        }
        if !self.velocity.is_finite() || !(0.0..=1.0).contains(&self.velocity) {
            return Err(ConfigError::VelocityOutOfRange(self.velocity));
        }
        validate_gate(self.gate)
    }
}

/// Sequencer construction parameters. Step data is set afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SequencerConfig {
    pub timing: Timing,
    pub length: usize,
    pub tracks: usize,
    /// Keep the step position across stop/start instead of rewinding to 0.
    pub resume: bool,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            timing: Timing::new(120.0, StepRate::Sixteenth, 0.5),
            length: 16,
            tracks: 1,
            resume: false,
        }
    }
}

impl SequencerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timing.validate()?;
        if self.length == 0 {
            return Err(ConfigError::EmptyPattern);
        }
        if self.tracks == 0 {
            return Err(ConfigError::NoTracks);
        }
        Ok(())
    }
}
