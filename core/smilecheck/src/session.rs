//! Tick-driven capture session: one sampled frame in, one overlay update out.

use std::cell::Cell;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::alignment::{self, Container};
use crate::config::CaptureConfig;
use crate::error::SmileCheckError;
use crate::face_detector::{FaceDetectionResult, FaceDetector};
use crate::guardrail::{CaptureGuardrail, GuardrailResult, GuardrailSignals, Phase, StepOutcome};
use crate::pixel::PixelBuffer;
use crate::quality::{quality_feedback, ImageQualityAnalyzer, QualityChecks};

/// Monotonic time source used to pace countdown ticks.
pub trait Clock {
    /// Time elapsed since some fixed origin.
    fn now(&self) -> Duration;
}

/// Wall clock backed by [`Instant`].
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock that only moves when told to. Useful for hosts that already have a
/// frame timestamp, and for tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, now: Duration) {
        self.now.set(now);
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Duration {
        (**self).now()
    }
}

/// A captured frame ready for the upload collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureEvent {
    pub slot_index: usize,
    pub slot_label: String,
    /// Capture count within this session, starting at 1.
    pub cycle: u64,
    pub frame: PixelBuffer,
    /// Detector output for the captured frame, for mouth cropping.
    pub face: FaceDetectionResult,
}

/// Everything the overlay needs after one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionTick {
    pub quality: QualityChecks,
    pub feedback: Vec<&'static str>,
    pub guardrail: GuardrailResult,
    /// Countdown ring fill in `[0, 1]`.
    pub ring_progress: f64,
    /// Slot being captured when this tick started.
    pub slot_index: usize,
    pub capture: Option<CaptureEvent>,
    /// True once every slot has been captured.
    pub completed: bool,
}

/// Drives quality analysis, alignment and the guardrail for one capture flow.
///
/// The host samples a frame every [`CaptureConfig::sample_interval_ms`] and
/// calls [`sample`](Self::sample). The first good sample arms the countdown
/// at its full total; each later guardrail step waits one countdown interval
/// on the injected [`Clock`]. Losing alignment resets on the very next sample.
pub struct CaptureSession<C: Clock = SystemClock> {
    config: CaptureConfig,
    analyzer: ImageQualityAnalyzer,
    guardrail: CaptureGuardrail,
    clock: C,
    container: Option<Container>,
    slot_index: usize,
    last_step: Option<Duration>,
    /// Signals held and the countdown shows its total, but no step taken yet.
    armed: bool,
    stopped: bool,
}

impl CaptureSession<SystemClock> {
    pub fn new(config: CaptureConfig) -> Result<Self, SmileCheckError> {
        Self::with_clock(config, SystemClock::new())
    }
}

impl<C: Clock> CaptureSession<C> {
    pub fn with_clock(config: CaptureConfig, clock: C) -> Result<Self, SmileCheckError> {
        config.validate()?;
        let mut guardrail = CaptureGuardrail::new(config.countdown_total);
        guardrail.set_circle_center(config.circle_for_slot(0).center);
        Ok(Self {
            analyzer: ImageQualityAnalyzer::new(config.quality),
            guardrail,
            config,
            clock,
            container: None,
            slot_index: 0,
            last_step: None,
            armed: false,
            stopped: false,
        })
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Size of the element the video is displayed in. Until set, the sampled
    /// frame's own dimensions are used.
    pub fn set_container(&mut self, container: Container) {
        self.container = Some(container);
    }

    pub fn slot_index(&self) -> usize {
        self.slot_index
    }

    pub fn is_complete(&self) -> bool {
        self.slot_index >= self.config.slots.len()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn phase(&self) -> Phase {
        if self.armed {
            Phase::AlignedCounting {
                remaining: self.guardrail.countdown_total(),
            }
        } else {
            self.guardrail.phase()
        }
    }

    /// Halt the session. Any countdown in progress is dropped without a
    /// capture and later samples are ignored.
    pub fn stop(&mut self) {
        if !self.stopped {
            info!(slot = self.slot_index, phase = ?self.guardrail.phase(), "capture session stopped");
        }
        self.stopped = true;
        self.armed = false;
        self.guardrail.abort();
        self.last_step = None;
    }

    /// Run one tick with a detector result supplied by the host.
    ///
    /// `frame` is `None` while the video has no decodable frame; `face` is
    /// `None` when the detector reported nothing. Both resolve to a waiting
    /// state. Returns `None` once the session is stopped or complete.
    pub fn sample(
        &mut self,
        frame: Option<&PixelBuffer>,
        face: Option<&FaceDetectionResult>,
    ) -> Option<SessionTick> {
        if self.stopped || self.is_complete() {
            return None;
        }

        let now = self.clock.now();
        let slot_index = self.slot_index;
        let no_face = FaceDetectionResult::no_face();
        let face = face.unwrap_or(&no_face);

        let quality = self.analyzer.analyze(frame);
        let container = self
            .container
            .or_else(|| frame.map(|f| Container::new(f64::from(f.width()), f64::from(f.height()))))
            .unwrap_or(Container::new(1.0, 1.0));
        let verdict = alignment::evaluate(face, &self.config.circle_for_slot(slot_index), container);
        let signals = GuardrailSignals {
            face_aligned: verdict.face_aligned,
            mouth_valid: verdict.mouth_valid,
            quality_ok: quality.all_passed(),
        };

        let mut capture = None;
        let guardrail = match self.guardrail.phase() {
            Phase::CaptureTriggered => self.advance(signals, now).result,
            _ if !signals.all() => {
                self.armed = false;
                self.advance(signals, now).result
            }
            Phase::Waiting if !self.armed => {
                self.armed = true;
                self.last_step = Some(now);
                debug!(slot = slot_index, "countdown armed");
                self.armed_result(signals)
            }
            _ if self.interval_elapsed(now) => {
                self.armed = false;
                let outcome = self.advance(signals, now);
                if let (Some(trigger), Some(frame)) = (outcome.trigger, frame) {
                    capture = Some(self.finish_slot(trigger.cycle, frame, face));
                }
                outcome.result
            }
            _ if self.armed => self.armed_result(signals),
            _ => self.guardrail.snapshot(signals),
        };

        debug!(
            slot = slot_index,
            countdown = guardrail.countdown,
            aligned = signals.face_aligned,
            mouth = signals.mouth_valid,
            quality = signals.quality_ok,
            "sample"
        );

        let ring_progress = match self.phase() {
            Phase::Waiting => 0.0,
            _ => alignment::ring_progress(guardrail.countdown, self.config.countdown_total),
        };

        Some(SessionTick {
            feedback: quality_feedback(&quality),
            quality,
            ring_progress,
            guardrail,
            slot_index,
            capture,
            completed: self.is_complete(),
        })
    }

    /// Run one tick, detecting the face with `detector`.
    pub fn sample_with(
        &mut self,
        detector: &dyn FaceDetector,
        frame: Option<&PixelBuffer>,
    ) -> Option<SessionTick> {
        let face = frame.map(|f| detector.detect(f));
        self.sample(frame, face.as_ref())
    }

    fn advance(&mut self, signals: GuardrailSignals, now: Duration) -> StepOutcome {
        self.last_step = Some(now);
        self.guardrail.step(signals)
    }

    fn armed_result(&self, signals: GuardrailSignals) -> GuardrailResult {
        GuardrailResult {
            countdown: self.guardrail.countdown_total(),
            ..self.guardrail.snapshot(signals)
        }
    }

    fn interval_elapsed(&self, now: Duration) -> bool {
        match self.last_step {
            Some(last) => now.saturating_sub(last) >= self.config.countdown_interval_duration(),
            None => true,
        }
    }

    fn finish_slot(
        &mut self,
        cycle: u64,
        frame: &PixelBuffer,
        face: &FaceDetectionResult,
    ) -> CaptureEvent {
        let slot_label = self
            .config
            .slots
            .get(self.slot_index)
            .map(|slot| slot.label.clone())
            .unwrap_or_default();
        let event = CaptureEvent {
            slot_index: self.slot_index,
            slot_label,
            cycle,
            frame: frame.clone(),
            face: face.clone(),
        };
        info!(slot = event.slot_index, label = %event.slot_label, cycle, "frame captured");

        self.slot_index += 1;
        if self.is_complete() {
            info!(captures = cycle, "capture plan complete");
        } else {
            let next = self.config.circle_for_slot(self.slot_index);
            self.guardrail.set_circle_center(next.center);
        }
        event
    }
}
