use std::time::Duration;

use keybed_types::note::is_valid_note;
use keybed_types::{
    ConfigError, KeyboardConfig, KeyboardError, Note, NoteId, NoteKey, NoteOrigin, Priority,
    Voice, VoiceIndex,
};

use crate::listener::VoiceListener;

/// A note in the held collection plus the keyboard's bookkeeping for it.
#[derive(Debug, Clone)]
struct HeldNote {
    note: Note,
    /// Voice currently bound to this note, if any.
    voice: Option<VoiceIndex>,
    /// Key went up while sustain was on; the note stays held until sustain ends.
    key_up: bool,
}

/// Owns the voice pool and the held notes, and decides which notes sound.
///
/// Responsibilities:
/// - keep held notes in arrival order
/// - bind notes to voices, stealing per `Priority` when the pool is full
/// - hand freed voices back to held notes that lost theirs
/// - report every bind/unbind to the `VoiceListener`
///
/// Does NOT:
/// - render audio
/// - allocate voices after construction
pub struct Keyboard<L: VoiceListener> {
    held: Vec<HeldNote>,
    held_capacity: usize,
    voices: Vec<Voice>,
    priority: Priority,
    listener: L,
    sustain: bool,
    /// Input notes feed the arpeggiator instead of taking voices.
    arp_engaged: bool,
    next_note: u64,
    next_bind: u64,
    clock: Duration,
}

impl<L: VoiceListener> Keyboard<L> {
    pub fn new(config: KeyboardConfig, listener: L) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            held: Vec::with_capacity(config.held_capacity),
            held_capacity: config.held_capacity,
            voices: (0..config.voices).map(Voice::new).collect(),
            priority: config.priority,
            listener,
            sustain: false,
            arp_engaged: false,
            next_note: 0,
            next_bind: 0,
            clock: Duration::ZERO,
        })
    }

    /// Register a press of `key`. Returns the new note's id.
    ///
    /// A press for a key that is already down is ignored. A press for a key
    /// that is only held by sustain retriggers it as a fresh note. New keys
    /// are refused once `held_capacity` notes are held.
    pub fn press(&mut self, key: NoteKey, pitch: u8, velocity: f32) -> Result<NoteId, KeyboardError> {
        if !is_valid_note(pitch, velocity) {
            log::warn!(target: "keyboard", "ignoring press of key {}: pitch {} velocity {}", key, pitch, velocity);
            return Err(KeyboardError::InvalidNote { pitch, velocity });
        }

        let mut retriggered = false;
        if let Some(pos) = self.position_of_key(key) {
            if !self.held[pos].key_up {
                log::warn!(target: "keyboard", "ignoring press of held key {}", key);
                return Err(KeyboardError::DuplicateKey(key));
            }
            self.remove_at(pos);
            retriggered = true;
        } else {
            self.check_room(NoteOrigin::Input(key))?;
        }

        let id = self.insert(NoteOrigin::Input(key), pitch, velocity);
        if retriggered {
            self.fill_free_voices();
        }
        Ok(id)
    }

    /// Register a release of `key`.
    pub fn release(&mut self, key: NoteKey) -> Result<(), KeyboardError> {
        let pos = match self.position_of_key(key) {
            Some(pos) if !self.held[pos].key_up => pos,
            _ => {
                log::warn!(target: "keyboard", "ignoring release of key {} (not held)", key);
                return Err(KeyboardError::UnknownKey(key));
            }
        };

        if self.sustain {
            self.held[pos].key_up = true;
            log::debug!(target: "keyboard", "key {} up, held by sustain", key);
            return Ok(());
        }

        self.remove_at(pos);
        self.fill_free_voices();
        Ok(())
    }

    /// Press a note on behalf of a generated source (arpeggiator, sequencer).
    /// Input origins go through `press` so key identity stays unique.
    pub fn trigger(&mut self, origin: NoteOrigin, pitch: u8, velocity: f32) -> Result<NoteId, KeyboardError> {
        if let NoteOrigin::Input(key) = origin {
            return self.press(key, pitch, velocity);
        }
        if !is_valid_note(pitch, velocity) {
            log::warn!(target: "keyboard", "ignoring {:?} note: pitch {} velocity {}", origin, pitch, velocity);
            return Err(KeyboardError::InvalidNote { pitch, velocity });
        }
        self.check_room(origin)?;
        Ok(self.insert(origin, pitch, velocity))
    }

    /// Release a note by id. Input notes follow the same rules as `release`.
    pub fn release_note(&mut self, id: NoteId) -> Result<(), KeyboardError> {
        let Some(pos) = self.position_of_note(id) else {
            log::warn!(target: "keyboard", "ignoring release of note {} (not held)", id);
            return Err(KeyboardError::UnknownNote(id));
        };
        if let Some(key) = self.held[pos].note.key() {
            return self.release(key);
        }
        self.remove_at(pos);
        self.fill_free_voices();
        Ok(())
    }

    /// Release every voice and forget every held note.
    pub fn release_all(&mut self) {
        for v in 0..self.voices.len() {
            self.unbind(v);
        }
        self.held.clear();
    }

    /// Change the allocation/steal policy. Current bindings are left as they are.
    pub fn set_priority(&mut self, priority: Priority) {
        self.priority = priority;
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Sustain pedal. Turning it off drops every note whose key is already up.
    pub fn set_sustain(&mut self, on: bool) {
        if on == self.sustain {
            return;
        }
        self.sustain = on;
        if on {
            return;
        }

        let mut removed = false;
        while let Some(pos) = self.held.iter().position(|h| h.key_up) {
            self.remove_at(pos);
            removed = true;
        }
        if removed {
            self.fill_free_voices();
        }
    }

    pub fn sustain(&self) -> bool {
        self.sustain
    }

    /// Route input notes to the arpeggiator (engaged) or to voices.
    pub(crate) fn set_arp_engaged(&mut self, engaged: bool) {
        if engaged == self.arp_engaged {
            return;
        }
        self.arp_engaged = engaged;
        if engaged {
            for v in 0..self.voices.len() {
                let holds_input = self
                    .bound_note(v)
                    .is_some_and(|note| note.origin().is_input());
                if holds_input {
                    self.unbind(v);
                }
            }
        }
        self.fill_free_voices();
    }

    pub fn is_arp_engaged(&self) -> bool {
        self.arp_engaged
    }

    /// Advance the clock used to timestamp arriving notes.
    pub fn advance(&mut self, elapsed: Duration) {
        self.clock += elapsed;
    }

    pub fn now(&self) -> Duration {
        self.clock
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    /// All held notes, including generated ones, in arrival order.
    pub fn held_notes(&self) -> impl Iterator<Item = &Note> + '_ {
        self.held.iter().map(|h| &h.note)
    }

    /// Held notes from external input (including sustained ones), in arrival order.
    pub fn input_notes(&self) -> impl Iterator<Item = &Note> + '_ {
        self.held_notes().filter(|n| n.origin().is_input())
    }

    pub fn has_input_notes(&self) -> bool {
        self.input_notes().next().is_some()
    }

    pub fn note(&self, id: NoteId) -> Option<&Note> {
        self.position_of_note(id).map(|pos| &self.held[pos].note)
    }

    /// Voice bound to a note, if it is currently sounding.
    pub fn voice_of(&self, id: NoteId) -> Option<&Voice> {
        let pos = self.position_of_note(id)?;
        self.held[pos].voice.map(|v| &self.voices[v])
    }

    pub fn voice_of_key(&self, key: NoteKey) -> Option<&Voice> {
        let pos = self.position_of_key(key)?;
        self.held[pos].voice.map(|v| &self.voices[v])
    }

    /// Whether `key` is down (sustained-only keys do not count).
    pub fn is_held(&self, key: NoteKey) -> bool {
        self.position_of_key(key)
            .is_some_and(|pos| !self.held[pos].key_up)
    }

    pub fn held_count(&self) -> usize {
        self.held.len()
    }

    pub fn active_voice_count(&self) -> usize {
        self.voices.iter().filter(|v| v.is_active()).count()
    }

    /// Held notes waiting for a voice.
    pub fn pending_count(&self) -> usize {
        self.held
            .iter()
            .filter(|h| h.voice.is_none() && self.is_eligible(h))
            .count()
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    pub fn listener_mut(&mut self) -> &mut L {
        &mut self.listener
    }

    pub fn into_listener(self) -> L {
        self.listener
    }

    fn check_room(&self, origin: NoteOrigin) -> Result<(), KeyboardError> {
        if self.held.len() >= self.held_capacity {
            log::warn!(target: "keyboard", "ignoring {:?} note: {} notes already held", origin, self.held.len());
            return Err(KeyboardError::HeldFull(self.held_capacity));
        }
        Ok(())
    }

    fn insert(&mut self, origin: NoteOrigin, pitch: u8, velocity: f32) -> NoteId {
        let id = NoteId::new(self.next_note);
        self.next_note += 1;

        self.held.push(HeldNote {
            note: Note::new(id, origin, pitch, velocity, self.clock),
            voice: None,
            key_up: false,
        });
        let pos = self.held.len() - 1;
        if self.is_eligible(&self.held[pos]) {
            self.allocate(pos);
        }
        id
    }

    /// Give the note at `pos` a voice: the lowest free one, else a stolen one.
    fn allocate(&mut self, pos: usize) {
        if let Some(v) = self.voices.iter().position(|v| !v.is_active()) {
            self.bind(v, pos);
            return;
        }
        if let Some(v) = self.steal_candidate() {
            log::debug!(
                target: "keyboard",
                "stealing voice {} (pitch {}) for note {}",
                v,
                self.voices[v].pitch(),
                self.held[pos].note.id()
            );
            self.unbind(v);
            self.bind(v, pos);
        }
    }

    /// Bound voice to steal under the current policy.
    fn steal_candidate(&self) -> Option<VoiceIndex> {
        let bound = self.voices.iter().filter(|v| v.is_active());
        match self.priority {
            Priority::Last => bound.min_by_key(|v| v.bind_seq()).map(|v| v.index()),
            Priority::First => bound.max_by_key(|v| v.bind_seq()).map(|v| v.index()),
            Priority::Low | Priority::High => bound
                .filter_map(|v| Some((v.index(), self.bound_note(v.index())?)))
                .min_by(|(_, a), (_, b)| self.priority.compare(a, b))
                .map(|(v, _)| v),
        }
    }

    /// Hand every free voice to the best waiting note. Never steals.
    fn fill_free_voices(&mut self) {
        for v in 0..self.voices.len() {
            if self.voices[v].is_active() {
                continue;
            }
            let Some(pos) = self.best_pending() else {
                break;
            };
            log::debug!(target: "keyboard", "re-offering voice {} to note {}", v, self.held[pos].note.id());
            self.bind(v, pos);
        }
    }

    fn best_pending(&self) -> Option<usize> {
        self.held
            .iter()
            .enumerate()
            .filter(|(_, h)| h.voice.is_none() && self.is_eligible(h))
            .max_by(|(_, a), (_, b)| self.priority.compare(&a.note, &b.note))
            .map(|(pos, _)| pos)
    }

    fn bind(&mut self, v: VoiceIndex, pos: usize) {
        self.next_bind += 1;
        let held = &mut self.held[pos];
        self.voices[v].bind(&held.note, self.next_bind);
        held.voice = Some(v);
        log::debug!(target: "keyboard", "voice {} <- note {} (pitch {})", v, held.note.id(), held.note.pitch());
        self.listener.voice_pressed(&self.voices[v], &held.note);
    }

    fn unbind(&mut self, v: VoiceIndex) {
        let Some(id) = self.voices[v].note() else {
            return;
        };
        if let Some(pos) = self.position_of_note(id) {
            let held = &mut self.held[pos];
            held.voice = None;
            self.listener.voice_released(&self.voices[v], &held.note);
        }
        self.voices[v].clear();
    }

    /// Remove a held note, silencing its voice. The freed voice is not re-offered.
    fn remove_at(&mut self, pos: usize) -> Note {
        if let Some(v) = self.held[pos].voice {
            self.unbind(v);
        }
        self.held.remove(pos).note
    }

    fn is_eligible(&self, held: &HeldNote) -> bool {
        !(self.arp_engaged && held.note.origin().is_input())
    }

    fn bound_note(&self, v: VoiceIndex) -> Option<&Note> {
        self.voices[v].note().and_then(|id| self.note(id))
    }

    fn position_of_key(&self, key: NoteKey) -> Option<usize> {
        self.held.iter().position(|h| h.note.key() == Some(key))
    }

    fn position_of_note(&self, id: NoteId) -> Option<usize> {
        self.held.iter().position(|h| h.note.id() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::VoiceEvent;

    fn keyboard(voices: usize, priority: Priority) -> Keyboard<Vec<VoiceEvent>> {
        let config = KeyboardConfig {
            voices,
            priority,
            held_capacity: 16,
        };
        Keyboard::new(config, Vec::new()).unwrap()
    }

    fn key(k: u32) -> NoteKey {
        NoteKey::new(k)
    }

    fn voice_index(kb: &Keyboard<Vec<VoiceEvent>>, k: u32) -> Option<usize> {
        kb.voice_of_key(key(k)).map(|v| v.index())
    }

    #[test]
    fn test_zero_voices_rejected() {
        let config = KeyboardConfig {
            voices: 0,
            ..Default::default()
        };
        assert!(matches!(Keyboard::new(config, ()), Err(ConfigError::NoVoices)));
    }

    #[test]
    fn test_lowest_free_voice_first() {
        let mut kb = keyboard(3, Priority::Last);
        kb.press(key(1), 60, 1.0).unwrap();
        kb.press(key(2), 64, 1.0).unwrap();
        assert_eq!(voice_index(&kb, 1), Some(0));
        assert_eq!(voice_index(&kb, 2), Some(1));

        kb.release(key(1)).unwrap();
        kb.press(key(3), 67, 1.0).unwrap();
        assert_eq!(voice_index(&kb, 3), Some(0));
    }

    #[test]
    fn test_last_steals_oldest_and_gives_it_back() {
        let mut kb = keyboard(2, Priority::Last);
        kb.press(key(1), 60, 1.0).unwrap();
        kb.press(key(2), 64, 1.0).unwrap();
        kb.press(key(3), 67, 1.0).unwrap();

        assert_eq!(voice_index(&kb, 1), None);
        assert_eq!(voice_index(&kb, 3), Some(0));
        assert!(kb.is_held(key(1)));
        assert_eq!(kb.pending_count(), 1);

        kb.release(key(3)).unwrap();
        assert_eq!(voice_index(&kb, 1), Some(0));
        assert_eq!(kb.pending_count(), 0);
    }

    #[test]
    fn test_first_steals_newest_bound() {
        let mut kb = keyboard(2, Priority::First);
        kb.press(key(1), 60, 1.0).unwrap();
        kb.press(key(2), 64, 1.0).unwrap();
        kb.press(key(3), 67, 1.0).unwrap();

        assert_eq!(voice_index(&kb, 1), Some(0));
        assert_eq!(voice_index(&kb, 2), None);
        assert_eq!(voice_index(&kb, 3), Some(1));
    }

    #[test]
    fn test_low_steals_highest_pitch() {
        let mut kb = keyboard(2, Priority::Low);
        kb.press(key(b'A' as u32), 60, 1.0).unwrap();
        kb.press(key(b'B' as u32), 72, 1.0).unwrap();
        assert_eq!(voice_index(&kb, b'A' as u32), Some(0));

        kb.press(key(b'C' as u32), 55, 1.0).unwrap();
        assert_eq!(voice_index(&kb, b'A' as u32), Some(0));
        assert_eq!(voice_index(&kb, b'C' as u32), Some(1));
        assert_eq!(voice_index(&kb, b'B' as u32), None);
        assert!(kb.is_held(key(b'B' as u32)));

        let events = kb.listener();
        assert_eq!(
            events[2],
            VoiceEvent::Released {
                voice: 1,
                note: NoteId::new(1),
                origin: NoteOrigin::Input(key(b'B' as u32)),
                pitch: 72,
            }
        );
        assert!(events[3].is_press());
        assert_eq!(events[3].pitch(), 55);
    }

    #[test]
    fn test_high_steals_lowest_pitch() {
        let mut kb = keyboard(2, Priority::High);
        kb.press(key(1), 60, 1.0).unwrap();
        kb.press(key(2), 72, 1.0).unwrap();
        kb.press(key(3), 80, 1.0).unwrap();
        assert_eq!(voice_index(&kb, 1), None);
        assert_eq!(voice_index(&kb, 3), Some(0));
    }

    #[test]
    fn test_reoffer_follows_policy() {
        let mut kb = keyboard(1, Priority::Low);
        kb.press(key(1), 70, 1.0).unwrap();
        kb.press(key(2), 65, 1.0).unwrap();
        kb.press(key(3), 50, 1.0).unwrap();
        assert_eq!(voice_index(&kb, 3), Some(0));

        kb.release(key(3)).unwrap();
        assert_eq!(voice_index(&kb, 2), Some(0));
        assert_eq!(voice_index(&kb, 1), None);
    }

    #[test]
    fn test_equal_pitch_tie_prefers_earlier_arrival() {
        let mut kb = keyboard(1, Priority::Low);
        kb.press(key(1), 60, 1.0).unwrap();
        kb.press(key(2), 60, 1.0).unwrap();
        kb.press(key(3), 40, 1.0).unwrap();
        kb.release(key(3)).unwrap();
        assert_eq!(voice_index(&kb, 1), Some(0));
    }

    #[test]
    fn test_duplicate_press_ignored() {
        let mut kb = keyboard(2, Priority::Last);
        kb.press(key(1), 60, 1.0).unwrap();
        let events_before = kb.listener().len();

        assert_eq!(kb.press(key(1), 62, 1.0), Err(KeyboardError::DuplicateKey(key(1))));
        assert_eq!(kb.held_count(), 1);
        assert_eq!(kb.listener().len(), events_before);
        assert_eq!(kb.voices()[0].pitch(), 60);
    }

    #[test]
    fn test_unknown_release_is_noop() {
        let mut kb = keyboard(2, Priority::Last);
        kb.press(key(1), 60, 1.0).unwrap();
        let voices_before = kb.voices().to_vec();

        assert_eq!(kb.release(key(9)), Err(KeyboardError::UnknownKey(key(9))));
        assert_eq!(kb.held_count(), 1);
        assert_eq!(kb.voices(), voices_before.as_slice());
    }

    #[test]
    fn test_invalid_note_rejected() {
        let mut kb = keyboard(1, Priority::Last);
        assert!(matches!(
            kb.press(key(1), 130, 1.0),
            Err(KeyboardError::InvalidNote { pitch: 130, .. })
        ));
        assert!(kb.press(key(1), 60, 2.0).is_err());
        assert_eq!(kb.held_count(), 0);
    }

    #[test]
    fn test_sustain_holds_until_pedal_up() {
        let mut kb = keyboard(2, Priority::Last);
        kb.set_sustain(true);
        kb.press(key(1), 60, 1.0).unwrap();
        kb.release(key(1)).unwrap();

        assert!(!kb.is_held(key(1)));
        assert_eq!(kb.active_voice_count(), 1);
        assert_eq!(kb.release(key(1)), Err(KeyboardError::UnknownKey(key(1))));

        kb.set_sustain(false);
        assert_eq!(kb.active_voice_count(), 0);
        assert_eq!(kb.held_count(), 0);
    }

    #[test]
    fn test_sustained_key_retriggers() {
        let mut kb = keyboard(2, Priority::Last);
        kb.set_sustain(true);
        let first = kb.press(key(1), 60, 1.0).unwrap();
        kb.release(key(1)).unwrap();
        let second = kb.press(key(1), 60, 0.5).unwrap();

        assert_ne!(first, second);
        assert_eq!(kb.held_count(), 1);
        assert!(kb.is_held(key(1)));
        assert_eq!(kb.voice_of(second).map(|v| v.index()), Some(0));
    }

    #[test]
    fn test_generated_notes_share_the_pool() {
        let mut kb = keyboard(1, Priority::Last);
        kb.press(key(1), 60, 1.0).unwrap();
        let id = kb.trigger(NoteOrigin::Arpeggiator, 72, 0.8).unwrap();
        assert_eq!(kb.voice_of(id).map(|v| v.index()), Some(0));

        kb.release_note(id).unwrap();
        assert_eq!(voice_index(&kb, 1), Some(0));
        assert_eq!(kb.release_note(id), Err(KeyboardError::UnknownNote(id)));
    }

    #[test]
    fn test_arp_engagement_moves_input_off_voices() {
        let mut kb = keyboard(2, Priority::Last);
        kb.press(key(1), 60, 1.0).unwrap();
        kb.press(key(2), 64, 1.0).unwrap();

        kb.set_arp_engaged(true);
        assert_eq!(kb.active_voice_count(), 0);
        assert_eq!(kb.held_count(), 2);
        assert_eq!(kb.pending_count(), 0);

        kb.press(key(3), 67, 1.0).unwrap();
        assert_eq!(kb.active_voice_count(), 0);

        kb.set_arp_engaged(false);
        assert_eq!(kb.active_voice_count(), 2);
        assert_eq!(voice_index(&kb, 3), Some(0));
        assert_eq!(voice_index(&kb, 2), Some(1));
    }

    #[test]
    fn test_priority_change_does_not_rebalance() {
        let mut kb = keyboard(1, Priority::Last);
        kb.press(key(1), 60, 1.0).unwrap();
        kb.press(key(2), 50, 1.0).unwrap();
        let events_before = kb.listener().len();

        kb.set_priority(Priority::High);
        assert_eq!(kb.listener().len(), events_before);
        assert_eq!(voice_index(&kb, 2), Some(0));
    }

    #[test]
    fn test_release_all() {
        let mut kb = keyboard(2, Priority::Last);
        kb.press(key(1), 60, 1.0).unwrap();
        kb.press(key(2), 64, 1.0).unwrap();
        kb.press(key(3), 67, 1.0).unwrap();
        let before = kb.listener().len();
        kb.release_all();

        assert_eq!(kb.held_count(), 0);
        assert_eq!(kb.active_voice_count(), 0);
        let released = &kb.listener()[before..];
        assert_eq!(released.len(), 2);
        assert!(released.iter().all(|e| !e.is_press()));
    }

    #[test]
    fn test_timestamps_follow_clock() {
        let mut kb = keyboard(1, Priority::Last);
        kb.advance(Duration::from_millis(250));
        let id = kb.press(key(1), 60, 1.0).unwrap();
        assert_eq!(kb.note(id).map(|n| n.timestamp()), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_held_capacity_out_of_range_rejected() {
        let config = KeyboardConfig {
            held_capacity: usize::MAX / 4,
            ..Default::default()
        };
        assert!(matches!(
            Keyboard::new(config, Vec::<VoiceEvent>::new()),
            Err(ConfigError::CapacityOutOfRange(_))
        ));
    }

    #[test]
    fn test_press_refused_when_held_full() {
        let config = KeyboardConfig {
            voices: 2,
            priority: Priority::Last,
            held_capacity: 3,
        };
        let mut kb = Keyboard::new(config, Vec::new()).unwrap();
        for k in 0..3 {
            kb.press(key(k), 60 + k as u8, 1.0).unwrap();
        }
        assert_eq!(kb.press(key(3), 70, 1.0), Err(KeyboardError::HeldFull(3)));
        assert_eq!(
            kb.trigger(NoteOrigin::Arpeggiator, 70, 1.0),
            Err(KeyboardError::HeldFull(3))
        );
        assert_eq!(kb.held_count(), 3);

        // a sustained key can still retrigger, and a release makes room
        kb.set_sustain(true);
        kb.release(key(0)).unwrap();
        assert!(kb.press(key(0), 60, 1.0).is_ok());
        kb.set_sustain(false);
        kb.release(key(1)).unwrap();
        assert!(kb.press(key(3), 70, 1.0).is_ok());
        assert_eq!(kb.held_count(), 3);
    }
}
