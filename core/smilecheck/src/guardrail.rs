//! Countdown-then-capture state machine.
//!
//! Each call to [`CaptureGuardrail::step`] is one countdown tick. Pacing ticks
//! against wall time is the caller's job (see [`crate::CaptureSession`]);
//! the machine itself has no notion of time so it can be driven directly in
//! tests.

use serde::Serialize;
use tracing::{debug, info};

use crate::face_detector::Point;

/// Default number of countdown ticks before a capture fires.
pub const DEFAULT_COUNTDOWN_TOTAL: u32 = 3;

/// The three per-tick conditions that must hold for a capture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GuardrailSignals {
    pub face_aligned: bool,
    pub mouth_valid: bool,
    pub quality_ok: bool,
}

impl GuardrailSignals {
    pub const ALL_OK: GuardrailSignals = GuardrailSignals {
        face_aligned: true,
        mouth_valid: true,
        quality_ok: true,
    };

    pub fn all(&self) -> bool {
        self.face_aligned && self.mouth_valid && self.quality_ok
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Waiting,
    AlignedCounting { remaining: u32 },
    CaptureTriggered,
}

/// Snapshot handed to the overlay renderer after every tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardrailResult {
    pub face_aligned: bool,
    pub mouth_valid: bool,
    pub quality_ok: bool,
    pub countdown: u32,
    pub circle_center: Point,
}

/// Emitted once per completed countdown run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureTrigger {
    /// Monotonic count of captures fired by this machine, starting at 1.
    pub cycle: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    pub result: GuardrailResult,
    pub trigger: Option<CaptureTrigger>,
}

#[derive(Debug, Clone)]
pub struct CaptureGuardrail {
    countdown_total: u32,
    circle_center: Point,
    phase: Phase,
    cycles: u64,
}

impl Default for CaptureGuardrail {
    fn default() -> Self {
        Self::new(DEFAULT_COUNTDOWN_TOTAL)
    }
}

impl CaptureGuardrail {
    /// `countdown_total` of 0 is treated as 1: a capture always needs at
    /// least one qualifying tick.
    pub fn new(countdown_total: u32) -> Self {
        Self {
            countdown_total: countdown_total.max(1),
            circle_center: Point::CENTER,
            phase: Phase::Waiting,
            cycles: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn countdown_total(&self) -> u32 {
        self.countdown_total
    }

    /// Remaining countdown ticks; 0 outside of a counting run.
    pub fn countdown(&self) -> u32 {
        match self.phase {
            Phase::AlignedCounting { remaining } => remaining,
            Phase::Waiting | Phase::CaptureTriggered => 0,
        }
    }

    pub fn circle_center(&self) -> Point {
        self.circle_center
    }

    /// Move the target circle, e.g. when the next capture slot starts.
    /// A running countdown is discarded; a just-fired capture still gets its
    /// rest tick.
    pub fn set_circle_center(&mut self, center: Point) {
        self.circle_center = center;
        if let Phase::AlignedCounting { .. } = self.phase {
            self.abort();
        }
    }

    /// Advance one countdown tick.
    pub fn step(&mut self, signals: GuardrailSignals) -> StepOutcome {
        let previous = self.phase;
        let mut trigger = None;

        self.phase = match (previous, signals.all()) {
            (Phase::CaptureTriggered, _) => Phase::Waiting,
            (Phase::Waiting, false) | (Phase::AlignedCounting { .. }, false) => Phase::Waiting,
            (Phase::Waiting, true) => self.count_from(self.countdown_total),
            (Phase::AlignedCounting { remaining }, true) => self.count_from(remaining),
        };

        if self.phase == Phase::CaptureTriggered {
            self.cycles += 1;
            trigger = Some(CaptureTrigger {
                cycle: self.cycles,
            });
            info!(cycle = self.cycles, "capture triggered");
        }
        if previous != self.phase {
            debug!(from = ?previous, to = ?self.phase, "guardrail transition");
        }

        StepOutcome {
            result: self.result(signals),
            trigger,
        }
    }

    /// Report the current state against fresh signals without advancing.
    pub fn snapshot(&self, signals: GuardrailSignals) -> GuardrailResult {
        self.result(signals)
    }

    /// Drop back to waiting without emitting anything.
    pub fn abort(&mut self) {
        if self.phase != Phase::Waiting {
            debug!(from = ?self.phase, "guardrail aborted");
        }
        self.phase = Phase::Waiting;
    }

    fn count_from(&self, remaining: u32) -> Phase {
        match remaining.saturating_sub(1) {
            0 => Phase::CaptureTriggered,
            left => Phase::AlignedCounting { remaining: left },
        }
    }

    fn result(&self, signals: GuardrailSignals) -> GuardrailResult {
        GuardrailResult {
            face_aligned: signals.face_aligned,
            mouth_valid: signals.mouth_valid,
            quality_ok: signals.quality_ok,
            countdown: self.countdown(),
            circle_center: self.circle_center,
        }
    }
}
