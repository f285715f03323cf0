mod common;

use std::time::Duration;

use common::*;
use keybed_core::{ArpState, Arpeggiator, VoiceEvent};
use keybed_types::{ArpMode, ArpeggiatorConfig, NoteOrigin, Priority};

fn arp(mode: ArpMode, gate: f32) -> Arpeggiator {
    let config = ArpeggiatorConfig {
        mode,
        timing: eighths(gate),
        ..Default::default()
    };
    Arpeggiator::new(config, 16).expect("valid arpeggiator config")
}

#[test]
fn up_mode_cycles_at_step_interval() {
    let mut kb = keyboard(4, Priority::Last);
    let mut arp = arp(ArpMode::Up, 1.0);
    arp.enable(&mut kb);
    for p in [67, 60, 64] {
        kb.press(key(p as u32), p, 0.9).unwrap();
    }

    arp.tick(Duration::ZERO, &mut kb);
    assert_eq!(pressed_pitches(&kb), vec![60]);

    // nothing until a full step has elapsed
    arp.tick(Duration::from_millis(200), &mut kb);
    assert_eq!(pressed_pitches(&kb), vec![60]);
    arp.tick(Duration::from_millis(50), &mut kb);
    assert_eq!(pressed_pitches(&kb), vec![60, 64]);

    arp.tick(STEP, &mut kb);
    arp.tick(STEP, &mut kb);
    assert_eq!(pressed_pitches(&kb), vec![60, 64, 67, 60]);

    // every press after the first is directly preceded by releasing the previous note
    let events = kb.listener();
    for pair in events.windows(2).filter(|w| w[1].is_press()) {
        assert!(!pair[0].is_press());
    }
    assert!(events
        .iter()
        .all(|e| matches!(e, VoiceEvent::Pressed { origin: NoteOrigin::Arpeggiator, .. }
            | VoiceEvent::Released { origin: NoteOrigin::Arpeggiator, .. })));
}

#[test]
fn removing_a_note_mid_cycle_skips_it() {
    let mut kb = keyboard(4, Priority::Last);
    let mut arp = arp(ArpMode::Up, 1.0);
    arp.enable(&mut kb);
    for p in [60, 64, 67] {
        kb.press(key(p as u32), p, 0.9).unwrap();
    }

    arp.tick(Duration::ZERO, &mut kb);
    arp.tick(STEP, &mut kb);
    assert_eq!(pressed_pitches(&kb), vec![60, 64]);

    kb.release(key(64)).unwrap();
    arp.tick(STEP, &mut kb);
    arp.tick(STEP, &mut kb);
    arp.tick(STEP, &mut kb);
    assert_eq!(pressed_pitches(&kb), vec![60, 64, 67, 60, 67]);
}

#[test]
fn gate_releases_inside_the_step() {
    let mut kb = keyboard(4, Priority::Last);
    let mut arp = arp(ArpMode::Up, 0.5);
    arp.enable(&mut kb);
    kb.press(key(1), 60, 1.0).unwrap();

    arp.tick(Duration::ZERO, &mut kb);
    assert_eq!(kb.active_voice_count(), 1);
    arp.tick(HALF_STEP, &mut kb);
    assert_eq!(kb.active_voice_count(), 0);
    arp.tick(HALF_STEP, &mut kb);
    assert_eq!(kb.active_voice_count(), 1);
    assert_eq!(pressed_pitches(&kb), vec![60, 60]);
}

#[test]
fn emptied_held_set_goes_idle_and_restarts_immediately() {
    let mut kb = keyboard(4, Priority::Last);
    let mut arp = arp(ArpMode::Up, 1.0);
    arp.enable(&mut kb);

    arp.tick(STEP, &mut kb);
    assert_eq!(arp.state(), ArpState::Idle);

    kb.press(key(1), 60, 1.0).unwrap();
    arp.tick(Duration::from_millis(10), &mut kb);
    assert_eq!(arp.state(), ArpState::Running);
    arp.tick(Duration::from_millis(100), &mut kb);

    kb.release(key(1)).unwrap();
    arp.tick(Duration::from_millis(10), &mut kb);
    assert_eq!(arp.state(), ArpState::Idle);
    assert_eq!(kb.active_voice_count(), 0);

    kb.press(key(2), 72, 1.0).unwrap();
    arp.tick(Duration::from_millis(10), &mut kb);
    assert_eq!(pressed_pitches(&kb), vec![60, 72]);
}

#[test]
fn mode_change_applies_to_next_note() {
    let mut kb = keyboard(4, Priority::Last);
    let mut arp = arp(ArpMode::Up, 1.0);
    arp.enable(&mut kb);
    for p in [60, 64, 67, 72] {
        kb.press(key(p as u32), p, 1.0).unwrap();
    }

    arp.tick(Duration::ZERO, &mut kb);
    arp.tick(STEP, &mut kb);
    arp.set_mode(ArpMode::Down);
    arp.tick(STEP, &mut kb);
    arp.tick(STEP, &mut kb);
    assert_eq!(pressed_pitches(&kb), vec![60, 64, 60, 72]);
}

#[test]
fn seeded_runs_repeat() {
    let run = || {
        let mut kb = keyboard(4, Priority::Last);
        let config = ArpeggiatorConfig {
            mode: ArpMode::Random,
            timing: eighths(1.0),
            probability: 0.7,
            seed: 42,
            ..Default::default()
        };
        let mut arp = Arpeggiator::new(config, 16).unwrap();
        arp.enable(&mut kb);
        for p in [60, 62, 64, 65, 67] {
            kb.press(key(p as u32), p, 1.0).unwrap();
        }
        arp.tick(Duration::ZERO, &mut kb);
        for _ in 0..40 {
            arp.tick(STEP, &mut kb);
        }
        pressed_pitches(&kb)
    };

    let first = run();
    assert_eq!(first, run());
    assert!(first.len() < 41);
    assert!(!first.is_empty());
}
