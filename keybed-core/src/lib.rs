//! # keybed-core
//!
//! Note-allocation engine: a polyphonic keyboard that binds held notes to a
//! fixed voice pool, plus an arpeggiator and a step sequencer that play
//! through it. Everything is single-threaded and tick-driven; voice changes
//! are reported synchronously through a `VoiceListener`.

pub mod arpeggiator;
pub mod clock;
pub mod config;
pub mod keyboard;
pub mod listener;
pub mod rig;
pub mod sequencer;

pub use arpeggiator::{ArpState, Arpeggiator};
pub use clock::{ClockEvent, StepClock, MAX_CATCH_UP};
pub use config::Config;
pub use keyboard::Keyboard;
pub use listener::{VoiceEvent, VoiceListener};
pub use rig::{Rig, TickSteps};
pub use sequencer::{SeqState, Sequencer};

pub use keybed_types;
