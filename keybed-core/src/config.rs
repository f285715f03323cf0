use std::path::{Path, PathBuf};

use serde::Deserialize;

use keybed_types::{
    ArpMode, ArpeggiatorConfig, KeyboardConfig, OctaveDirection, Priority, SequencerConfig, Timing,
};

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    keyboard: KeyboardSection,
    #[serde(default)]
    arpeggiator: ArpeggiatorSection,
    #[serde(default)]
    sequencer: SequencerSection,
}

#[derive(Deserialize, Default)]
struct KeyboardSection {
    voices: Option<usize>,
    priority: Option<Priority>,
    held_capacity: Option<usize>,
}

#[derive(Deserialize, Default)]
struct ArpeggiatorSection {
    mode: Option<ArpMode>,
    bpm: Option<f32>,
    steps: Option<f32>,
    gate: Option<f32>,
    octaves: Option<u8>,
    octave_direction: Option<OctaveDirection>,
    probability: Option<f32>,
    seed: Option<u64>,
}

#[derive(Deserialize, Default)]
struct SequencerSection {
    bpm: Option<f32>,
    steps: Option<f32>,
    gate: Option<f32>,
    length: Option<usize>,
    tracks: Option<usize>,
    resume: Option<bool>,
}

/// Engine defaults: the embedded config.toml, overridden field by field by
/// the user's file.
pub struct Config {
    keyboard: KeyboardSection,
    arpeggiator: ArpeggiatorSection,
    sequencer: SequencerSection,
}

impl Config {
    pub fn load() -> Self {
        match user_config_path() {
            Some(path) => Self::load_from(&path),
            None => embedded().into(),
        }
    }

    /// Embedded defaults overridden by the file at `path`, if it exists.
    pub fn load_from(path: &Path) -> Self {
        let mut base = embedded();

        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
                    Ok(user) => merge(&mut base, user),
                    Err(e) => {
                        log::warn!(target: "config", "ignoring malformed config {}: {}", path.display(), e)
                    }
                },
                Err(e) => {
                    log::warn!(target: "config", "could not read config {}: {}", path.display(), e)
                }
            }
        }

        base.into()
    }

    /// Embedded defaults overridden by `contents`.
    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        let user: ConfigFile = toml::from_str(contents)?;
        let mut base = embedded();
        merge(&mut base, user);
        Ok(base.into())
    }

    pub fn keyboard(&self) -> KeyboardConfig {
        let fallback = KeyboardConfig::default();
        let config = KeyboardConfig {
            voices: self.keyboard.voices.unwrap_or(fallback.voices),
            priority: self.keyboard.priority.unwrap_or(fallback.priority),
            held_capacity: self.keyboard.held_capacity.unwrap_or(fallback.held_capacity),
        };
        match config.validate() {
            Ok(()) => config,
            Err(e) => {
                log::warn!(target: "config", "[keyboard] {}, using defaults", e);
                fallback
            }
        }
    }

    pub fn arpeggiator(&self) -> ArpeggiatorConfig {
        let fallback = ArpeggiatorConfig::default();
        let arp = &self.arpeggiator;
        let config = ArpeggiatorConfig {
            mode: arp.mode.unwrap_or(fallback.mode),
            timing: timing(arp.bpm, arp.steps, arp.gate, fallback.timing),
            octaves: arp.octaves.unwrap_or(fallback.octaves),
            octave_direction: arp.octave_direction.unwrap_or(fallback.octave_direction),
            probability: arp.probability.unwrap_or(fallback.probability),
            seed: arp.seed.unwrap_or(fallback.seed),
        };
        match config.validate() {
            Ok(()) => config,
            Err(e) => {
                log::warn!(target: "config", "[arpeggiator] {}, using defaults", e);
                fallback
            }
        }
    }

    pub fn sequencer(&self) -> SequencerConfig {
        let fallback = SequencerConfig::default();
        let seq = &self.sequencer;
        let config = SequencerConfig {
            timing: timing(seq.bpm, seq.steps, seq.gate, fallback.timing),
            length: seq.length.unwrap_or(fallback.length),
            tracks: seq.tracks.unwrap_or(fallback.tracks),
            resume: seq.resume.unwrap_or(fallback.resume),
        };
        match config.validate() {
            Ok(()) => config,
            Err(e) => {
                log::warn!(target: "config", "[sequencer] {}, using defaults", e);
                fallback
            }
        }
    }
}

impl From<ConfigFile> for Config {
    fn from(file: ConfigFile) -> Self {
        Config {
            keyboard: file.keyboard,
            arpeggiator: file.arpeggiator,
            sequencer: file.sequencer,
        }
    }
}

fn embedded() -> ConfigFile {
    match toml::from_str(DEFAULT_CONFIG) {
        Ok(file) => file,
        Err(e) => {
            log::error!(target: "config", "embedded config.toml is invalid: {}", e);
            ConfigFile::default()
        }
    }
}

fn timing(bpm: Option<f32>, steps: Option<f32>, gate: Option<f32>, fallback: Timing) -> Timing {
    Timing {
        bpm: bpm.unwrap_or(fallback.bpm),
        steps_per_beat: steps.unwrap_or(fallback.steps_per_beat),
        gate: gate.unwrap_or(fallback.gate),
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("keybed").join("config.toml"))
}

fn merge(base: &mut ConfigFile, user: ConfigFile) {
    merge_keyboard(&mut base.keyboard, user.keyboard);
    merge_arpeggiator(&mut base.arpeggiator, user.arpeggiator);
    merge_sequencer(&mut base.sequencer, user.sequencer);
}

fn merge_keyboard(base: &mut KeyboardSection, user: KeyboardSection) {
    if user.voices.is_some() {
        base.voices = user.voices;
    }
    if user.priority.is_some() {
        base.priority = user.priority;
    }
    if user.held_capacity.is_some() {
        base.held_capacity = user.held_capacity;
    }
}

fn merge_arpeggiator(base: &mut ArpeggiatorSection, user: ArpeggiatorSection) {
    if user.mode.is_some() {
        base.mode = user.mode;
    }
    if user.bpm.is_some() {
        base.bpm = user.bpm;
    }
    if user.steps.is_some() {
        base.steps = user.steps;
    }
    if user.gate.is_some() {
        base.gate = user.gate;
    }
    if user.octaves.is_some() {
        base.octaves = user.octaves;
    }
    if user.octave_direction.is_some() {
        base.octave_direction = user.octave_direction;
    }
    if user.probability.is_some() {
        base.probability = user.probability;
    }
    if user.seed.is_some() {
        base.seed = user.seed;
    }
}

fn merge_sequencer(base: &mut SequencerSection, user: SequencerSection) {
    if user.bpm.is_some() {
        base.bpm = user.bpm;
    }
    if user.steps.is_some() {
        base.steps = user.steps;
    }
    if user.gate.is_some() {
        base.gate = user.gate;
    }
    if user.length.is_some() {
        base.length = user.length;
    }
    if user.tracks.is_some() {
        base.tracks = user.tracks;
    }
    if user.resume.is_some() {
        base.resume = user.resume;
    }
}
