use std::time::Duration;

use keybed_core::{Config, Rig, VoiceListener};
use keybed_types::{Note, NoteKey, Priority, Step, Voice};

const TICK: Duration = Duration::from_millis(10);

/// Prints every voice change with the simulated time it happened at.
struct Printer {
    now: Duration,
}

impl VoiceListener for Printer {
    fn voice_pressed(&mut self, voice: &Voice, note: &Note) {
        println!(
            "{:>8.3}s  voice {:>2} ON   pitch {:>3} vel {:.2}  {:?}",
            self.now.as_secs_f64(),
            voice.index(),
            note.pitch(),
            note.velocity(),
            note.origin()
        );
    }

    fn voice_released(&mut self, voice: &Voice, note: &Note) {
        println!(
            "{:>8.3}s  voice {:>2} OFF  pitch {:>3}",
            self.now.as_secs_f64(),
            voice.index(),
            note.pitch()
        );
    }
}

fn init_logging(verbose: bool) {
    use simplelog::*;

    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };

    if let Err(e) = TermLogger::init(
        log_level,
        simplelog::Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ) {
        eprintln!("keybed: logging disabled: {}", e);
        return;
    }

    log::info!("keybed demo starting (log level: {:?})", log_level);
}

fn parse_priority(s: &str) -> Option<Priority> {
    match s {
        "last" => Some(Priority::Last),
        "first" => Some(Priority::First),
        "low" => Some(Priority::Low),
        "high" => Some(Priority::High),
        _ => None,
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let verbose = args.iter().any(|a| a == "--verbose" || a == "-v");
    init_logging(verbose);

    let use_arp = args.iter().any(|a| a == "--arp");
    let use_seq = args.iter().any(|a| a == "--seq");
    let priority = args
        .iter()
        .position(|a| a == "--priority")
        .and_then(|i| args.get(i + 1))
        .and_then(|s| parse_priority(s));
    let seconds: u64 = args
        .iter()
        .position(|a| a == "--seconds")
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
        .unwrap_or(4);

    let config = Config::load();
    let mut rig = match Rig::from_config(&config, Printer { now: Duration::ZERO }) {
        Ok(rig) => rig,
        Err(e) => {
            eprintln!("keybed: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(priority) = priority {
        rig.keyboard_mut().set_priority(priority);
    }

    if use_arp {
        rig.set_arpeggiator_enabled(true);
    }
    if use_seq {
        let bass = [Step::note(36, 1.0), Step::rest(), Step::tie(), Step::note(43, 0.8)];
        let length = rig.sequencer().length();
        for i in 0..length {
            if let Err(e) = rig.sequencer_mut().set_step(0, i, bass[i % bass.len()]) {
                log::warn!("step {}: {}", i, e);
            }
        }
        rig.start_sequencer();
    }

    // C major chord, held for the first half, then E minor.
    let first = [60u8, 64, 67];
    let second = [64u8, 67, 71];
    let switch_at = Duration::from_secs(seconds) / 2;
    let end = Duration::from_secs(seconds);

    for (i, &pitch) in first.iter().enumerate() {
        let _ = rig.press(NoteKey::new(i as u32), pitch, 0.8);
    }

    let mut now = Duration::ZERO;
    let mut switched = false;
    while now < end {
        if !switched && now >= switch_at {
            for i in 0..first.len() {
                let _ = rig.release(NoteKey::new(i as u32));
            }
            for (i, &pitch) in second.iter().enumerate() {
                let _ = rig.press(NoteKey::new(100 + i as u32), pitch, 0.7);
            }
            switched = true;
        }

        rig.keyboard_mut().listener_mut().now = now;
        rig.tick(TICK);
        now += TICK;
    }

    rig.all_notes_off();
    log::info!("keybed demo finished after {:?}", now);
}
