//! Tick-driven step clock shared by the arpeggiator and the sequencer.
//!
//! Time is accumulated in step units (`elapsed / step_secs`), so a tempo
//! change applies to the remainder of the current step. Callers drain
//! events with `poll` after each `accumulate`; events come out in time
//! order, a gate close always before the step boundary that follows it.
//! A single `accumulate` never owes more than `MAX_CATCH_UP` steps; older
//! boundaries are dropped.

use std::time::Duration;

use keybed_types::Timing;

/// Most step boundaries one `accumulate` can leave due.
pub const MAX_CATCH_UP: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    /// A pending gate point was reached; release the gated note.
    GateClose,
    /// A step boundary was crossed.
    Step,
}

#[derive(Debug, Clone)]
pub struct StepClock {
    timing: Timing,
    phase: f64, // steps since the last boundary
}

impl StepClock {
    pub fn new(timing: Timing) -> Self {
        Self { timing, phase: 0.0 }
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    pub fn set_timing(&mut self, timing: Timing) {
        self.timing = timing;
    }

    /// Position inside the current step, 0.0 at the boundary.
    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Gate point inside a step, or `None` when the gate holds to the boundary.
    pub fn gate_point(gate: f32) -> Option<f64> {
        (gate < 1.0).then_some(gate as f64)
    }

    /// Arm a step on the next `poll`.
    pub fn restart(&mut self) {
        self.phase = 1.0;
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    pub fn accumulate(&mut self, elapsed: Duration) {
        let step_secs = self.timing.step_secs();
        if step_secs > 0.0 {
            self.phase += elapsed.as_secs_f64() / step_secs;
        }
        let limit = MAX_CATCH_UP as f64;
        if self.phase >= limit + 1.0 {
            log::warn!(
                target: "clock",
                "fell {:.0} steps behind, dropping all but {}",
                self.phase.floor(),
                MAX_CATCH_UP
            );
            self.phase = limit + self.phase.fract();
        }
    }

    /// Next due event. `pending_gate` is the earliest gate point still waiting
    /// in the current step; the caller must clear it after a `GateClose`.
    pub fn poll(&mut self, pending_gate: Option<f64>) -> Option<ClockEvent> {
        if let Some(gate) = pending_gate {
            if gate < 1.0 && self.phase >= gate {
                return Some(ClockEvent::GateClose);
            }
        }
        if self.phase >= 1.0 {
            self.phase -= 1.0;
            return Some(ClockEvent::Step);
        }
        None
    }
}
