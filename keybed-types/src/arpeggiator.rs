use serde::{Deserialize, Serialize};

use crate::{ConfigError, StepRate, Timing};

/// Most octaves an arpeggio can span; the eleventh starts at pitch 120.
pub const MAX_OCTAVES: u8 = 11;

/// Arpeggiator configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArpeggiatorConfig {
    pub mode: ArpMode,
    pub timing: Timing,
    pub octaves: u8,      // 1 = held notes only, 2 = plus one octave, ...
    #[serde(default)]
    pub octave_direction: OctaveDirection,
    pub probability: f32, // 0.0-1.0 chance that a step plays
    pub seed: u64,        // RANDOM mode and probability
}

impl Default for ArpeggiatorConfig {
    fn default() -> Self {
        Self {
            mode: ArpMode::Up,
            timing: Timing::new(120.0, StepRate::Eighth, 0.3),
            octaves: 1,
            octave_direction: OctaveDirection::Up,
            probability: 1.0,
            seed: 12345,
        }
    }
}

impl ArpeggiatorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timing.validate()?;
        validate_octaves(self.octaves)?;
        validate_probability(self.probability)
    }
}

pub fn validate_octaves(octaves: u8) -> Result<(), ConfigError> {
    if octaves == 0 {
        return Err(ConfigError::NoOctaves);
    }
    if octaves > MAX_OCTAVES {
        return Err(ConfigError::OctavesOutOfRange(octaves));
    }
    Ok(())
}

pub fn validate_probability(probability: f32) -> Result<(), ConfigError> {
    if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
        return Err(ConfigError::ProbabilityOutOfRange(probability));
    }
    Ok(())
}

/// Which way extra octaves extend from the held notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OctaveDirection {
    #[default]
    Up,
    Down,
}

impl OctaveDirection {
    pub fn name(&self) -> &'static str {
        match self {
            OctaveDirection::Up => "Up",
            OctaveDirection::Down => "Down",
        }
    }

    /// Semitone shift for one octave in this direction.
    pub fn semitones(&self) -> i16 {
        match self {
            OctaveDirection::Up => 12,
            OctaveDirection::Down => -12,
        }
    }
}

/// Traversal order over the held notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArpMode {
    #[default]
    Up,
    Down,
    UpDown,
    DownUp,
    AsPlayed,
    Random,
}

impl ArpMode {
    pub fn name(&self) -> &'static str {
        match self {
            ArpMode::Up => "Up",
            ArpMode::Down => "Down",
            ArpMode::UpDown => "Up/Down",
            ArpMode::DownUp => "Down/Up",
            ArpMode::AsPlayed => "As Played",
            ArpMode::Random => "Random",
        }
    }

    pub fn next(&self) -> ArpMode {
        match self {
            ArpMode::Up => ArpMode::Down,
            ArpMode::Down => ArpMode::UpDown,
            ArpMode::UpDown => ArpMode::DownUp,
            ArpMode::DownUp => ArpMode::AsPlayed,
            ArpMode::AsPlayed => ArpMode::Random,
            ArpMode::Random => ArpMode::Up,
        }
    }

    pub fn prev(&self) -> ArpMode {
        match self {
            ArpMode::Up => ArpMode::Random,
            ArpMode::Down => ArpMode::Up,
            ArpMode::UpDown => ArpMode::Down,
            ArpMode::DownUp => ArpMode::UpDown,
            ArpMode::AsPlayed => ArpMode::DownUp,
            ArpMode::Random => ArpMode::AsPlayed,
        }
    }

    /// Modes that turn around at the extremes instead of wrapping.
    pub fn bounces(&self) -> bool {
        matches!(self, ArpMode::UpDown | ArpMode::DownUp)
    }
}
