use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::Note;

/// Note priority used for voice allocation and stealing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Most recently arrived note wins; steals the oldest-bound voice.
    #[default]
    Last,
    /// Oldest arrived note wins; steals the newest-bound voice.
    First,
    /// Lowest pitch wins; steals the voice holding the highest pitch.
    Low,
    /// Highest pitch wins; steals the voice holding the lowest pitch.
    High,
}

impl Priority {
    pub fn name(&self) -> &'static str {
        match self {
            Priority::Last => "Last",
            Priority::First => "First",
            Priority::Low => "Low",
            Priority::High => "High",
        }
    }

    pub fn next(&self) -> Priority {
        match self {
            Priority::Last => Priority::First,
            Priority::First => Priority::Low,
            Priority::Low => Priority::High,
            Priority::High => Priority::Last,
        }
    }

    /// Allocation preference between two notes. `Greater` means `a` should
    /// sound before `b`. Equal pitches under Low/High fall back to arrival
    /// order, earlier first.
    pub fn compare(&self, a: &Note, b: &Note) -> Ordering {
        match self {
            Priority::Last => a.id().cmp(&b.id()),
            Priority::First => b.id().cmp(&a.id()),
            Priority::Low => b.pitch().cmp(&a.pitch()).then(b.id().cmp(&a.id())),
            Priority::High => a.pitch().cmp(&b.pitch()).then(b.id().cmp(&a.id())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NoteId, NoteKey, NoteOrigin};
    use std::time::Duration;

    fn note(seq: u64, pitch: u8) -> Note {
        Note::new(
            NoteId::new(seq),
            NoteOrigin::Input(NoteKey::new(seq as u32)),
            pitch,
            1.0,
            Duration::ZERO,
        )
    }

    #[test]
    fn last_and_first_follow_arrival() {
        let older = note(1, 72);
        let newer = note(2, 60);
        assert_eq!(Priority::Last.compare(&newer, &older), Ordering::Greater);
        assert_eq!(Priority::First.compare(&older, &newer), Ordering::Greater);
    }

    #[test]
    fn low_and_high_follow_pitch() {
        let low = note(2, 48);
        let high = note(1, 84);
        assert_eq!(Priority::Low.compare(&low, &high), Ordering::Greater);
        assert_eq!(Priority::High.compare(&high, &low), Ordering::Greater);
    }

    #[test]
    fn pitch_ties_prefer_earlier_arrival() {
        let first = note(1, 60);
        let second = note(2, 60);
        assert_eq!(Priority::Low.compare(&first, &second), Ordering::Greater);
        assert_eq!(Priority::High.compare(&first, &second), Ordering::Greater);
    }

    #[test]
    fn next_cycles() {
        let mut p = Priority::Last;
        for _ in 0..4 {
            p = p.next();
        }
        assert_eq!(p, Priority::Last);
    }
}
