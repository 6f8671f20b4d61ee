// src/session.rs
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::calibration::{self, BaselineSource, CalibrationBaseline, CalibrationState, Calibrator};
use crate::classifier::{classify, ClassifierInput, Reading, RollingHistory};
use crate::config::{ConfigError, EngineConfig};
use crate::exercise::{ExerciseKind, Form, Phase, Side, Tracking};
use crate::hysteresis::Hysteresis;
use crate::landmarks::Frame;
use crate::reps::{RepCounter, RepDecision};
use crate::telemetry::{StateChange, TelemetryEmitter, TelemetryEvent, TelemetryStats};
use crate::visibility::{GateResult, LightingPreset, SkipReason, VisibilityGate};
use crate::warnings::{warrants_warning, PostureWarning, WarningCooldown};

/// What happens to progress when a new calibration run starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecalibrationPolicy {
    /// Keep reps, hold time and debounced state.
    Preserve,
    /// Start over as if the session were new.
    Reset,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FrameStatus {
    /// Collecting the initial baseline; the exercise has not started.
    Calibrating,
    Processed,
    Skipped(SkipReason),
}

/// State of the session after one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutcome {
    pub status: FrameStatus,
    pub rep_count: u32,
    /// `None` for exercises without a phase machine.
    pub phase: Option<Phase>,
    pub form: Form,
    pub hold_ms: u64,
    pub rep_counted: bool,
    pub warning: Option<PostureWarning>,
}

enum CalibrationRun {
    /// Calibration disabled: adopt defaults on the next frame.
    Pending,
    Running(Calibrator),
    Done,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub exercise: ExerciseKind,
    pub lighting: LightingPreset,
    pub rep_count: u32,
    pub hold_ms: u64,
    pub frames_processed: u64,
    pub frames_skipped: u64,
    pub baseline: CalibrationBaseline,
    pub baseline_source: Option<BaselineSource>,
    pub telemetry: TelemetryStats,
}

pub struct ExerciseSession {
    id: Uuid,
    kind: ExerciseKind,
    config: EngineConfig,
    required: Vec<usize>,
    calibration_required: Vec<usize>,
    gate: VisibilityGate,
    calibration_gate: VisibilityGate,
    calibration: CalibrationRun,
    baseline: CalibrationBaseline,
    baseline_source: Option<BaselineSource>,
    history: RollingHistory,
    phase: Option<Hysteresis<Phase>>,
    form: Hysteresis<Form>,
    reps: RepCounter,
    warnings: WarningCooldown,
    hold_ms: u64,
    /// Timestamp of the last processed frame spent holding.
    hold_mark_ms: Option<u64>,
    frames_processed: u64,
    frames_skipped: u64,
    telemetry: TelemetryEmitter,
}

fn initial_phase(kind: ExerciseKind) -> Option<Phase> {
    match kind.tracking() {
        Tracking::Reps { initial, .. } | Tracking::PhaseHold { initial, .. } => Some(initial),
        Tracking::PostureHold => None,
    }
}

fn initial_form(kind: ExerciseKind) -> Form {
    match kind.tracking() {
        Tracking::PostureHold => Form::Bad,
        _ => Form::Good,
    }
}

fn calibration_run(config: &EngineConfig) -> CalibrationRun {
    if config.calibration.enabled {
        CalibrationRun::Running(Calibrator::new(config.calibration.clone()))
    } else {
        CalibrationRun::Pending
    }
}

impl ExerciseSession {
    /// Validate `config` and start a session. Fails before any frame is seen.
    pub fn new(kind: ExerciseKind, config: &EngineConfig, lighting: LightingPreset) -> Result<Self, ConfigError> {
        config.validate()?;

        let timing = config.exercises.timing(kind);
        let session = Self {
            id: Uuid::new_v4(),
            kind,
            required: kind.required_landmarks(&config.landmarks),
            calibration_required: calibration::required_landmarks(&config.landmarks),
            gate: VisibilityGate::new(lighting, config.lighting.clone()),
            calibration_gate: VisibilityGate::new(lighting, config.lighting.clone()),
            calibration: calibration_run(config),
            baseline: CalibrationBaseline::DEFAULT,
            baseline_source: None,
            history: RollingHistory::new(config.history_len),
            phase: initial_phase(kind).map(|p| Hysteresis::new(p, timing)),
            form: Hysteresis::new(initial_form(kind), timing),
            reps: RepCounter::new(&timing, config.exercises.alternation(kind)),
            warnings: WarningCooldown::new(timing.warning_cooldown_ms),
            hold_ms: 0,
            hold_mark_ms: None,
            frames_processed: 0,
            frames_skipped: 0,
            telemetry: TelemetryEmitter::new(config.telemetry.clone()),
            config: config.clone(),
        };
        info!("Started {} session {} ({} lighting)", kind, session.id, lighting);
        Ok(session)
    }

    pub fn process_frame(&mut self, frame: &Frame) -> FrameOutcome {
        let now = frame.timestamp_ms;
        let calibration_skip = self.advance_calibration(frame);
        if self.baseline_source.is_none() {
            // nothing else looks at this frame while the first baseline is pending
            return match calibration_skip {
                Some(reason) => self.skip(now, reason),
                None => self.outcome(FrameStatus::Calibrating, false, None),
            };
        }

        if let GateResult::Skip(reason) = self.gate.check(frame, &self.required) {
            return self.skip(now, reason);
        }
        self.frames_processed += 1;

        let reading = {
            let input = ClassifierInput {
                frame,
                baseline: &self.baseline,
                history: &self.history,
                landmarks: &self.config.landmarks,
            };
            classify(self.kind, &input, &self.config.exercises)
        };
        self.telemetry.emit(TelemetryEvent::FrameProcessed {
            exercise: self.kind,
            timestamp_ms: now,
            verdict: reading.verdict,
            metrics: reading.metrics.clone(),
        });

        let rep_counted = self.update_phase(now, &reading);
        self.update_form(now, &reading);
        self.update_hold(now);

        let bad = warrants_warning(self.kind, self.phase(), self.form.state(), reading.form);
        let warning = self.warnings.offer(self.kind, now, bad);
        if let Some(warning) = &warning {
            self.telemetry.emit(TelemetryEvent::PostureWarning {
                exercise: self.kind,
                timestamp_ms: now,
                message: warning.message,
            });
        }

        self.history.push(reading);
        self.outcome(FrameStatus::Processed, rep_counted, warning)
    }

    fn skip(&mut self, now: u64, reason: SkipReason) -> FrameOutcome {
        debug!("Skipping frame at {}ms: {}", now, reason);
        self.frames_skipped += 1;
        self.hold_mark_ms = None;
        self.telemetry.emit(TelemetryEvent::FrameSkipped {
            exercise: self.kind,
            timestamp_ms: now,
            cause: reason.clone(),
        });
        self.outcome(FrameStatus::Skipped(reason), false, None)
    }

    /// Feed a running calibration. Returns why the frame was unusable for it.
    fn advance_calibration(&mut self, frame: &Frame) -> Option<SkipReason> {
        let mut rejected = None;
        let result = match &mut self.calibration {
            CalibrationRun::Done => return None,
            CalibrationRun::Pending => None,
            CalibrationRun::Running(calibrator) => {
                let usable = match self.calibration_gate.check(frame, &self.calibration_required) {
                    GateResult::Usable => true,
                    GateResult::Skip(reason) => {
                        debug!("Calibration ignoring frame at {}ms: {}", frame.timestamp_ms, reason);
                        rejected = Some(reason);
                        false
                    }
                };
                match calibrator.observe(frame, usable, &self.config.landmarks) {
                    Some(result) => Some(result),
                    None => return rejected,
                }
            }
        };

        let (baseline, source, frames) = match result {
            Some(result) => (result.baseline, result.source, result.frames),
            None => {
                info!("Calibration disabled, using default baseline");
                (CalibrationBaseline::DEFAULT, BaselineSource::Default, 0)
            }
        };
        self.baseline = baseline;
        self.baseline_source = Some(source);
        self.calibration = CalibrationRun::Done;
        self.telemetry.emit(TelemetryEvent::CalibrationComplete {
            exercise: self.kind,
            timestamp_ms: frame.timestamp_ms,
            source,
            frames,
            baseline,
        });
        rejected
    }

    /// Feed the phase machine; returns whether a rep was counted.
    fn update_phase(&mut self, now: u64, reading: &Reading) -> bool {
        let Some(phase) = self.phase.as_mut() else {
            return false;
        };
        let Some(transition) = phase.update(reading.verdict.phase()) else {
            return false;
        };
        debug!("{} phase {:?} -> {:?} at {}ms", self.kind, transition.from, transition.to, now);
        self.telemetry.emit(TelemetryEvent::StateTransition {
            exercise: self.kind,
            timestamp_ms: now,
            change: StateChange::Phase {
                from: transition.from,
                to: transition.to,
            },
        });

        let Tracking::Reps { completing, .. } = self.kind.tracking() else {
            return false;
        };
        if !completing.matches(transition.from, transition.to) {
            self.reps.phase_entered(now, reading.side);
            return false;
        }

        match self.reps.complete(now) {
            RepDecision::Counted { count } => {
                self.telemetry.emit(TelemetryEvent::RepCounted {
                    exercise: self.kind,
                    timestamp_ms: now,
                    count,
                });
                true
            }
            RepDecision::Rejected(anomaly) => {
                self.telemetry.emit(TelemetryEvent::AnomalyDetected {
                    exercise: self.kind,
                    timestamp_ms: now,
                    anomaly,
                });
                false
            }
        }
    }

    fn update_form(&mut self, now: u64, reading: &Reading) {
        if let Some(transition) = self.form.update(reading.form) {
            debug!("{} form {:?} -> {:?} at {}ms", self.kind, transition.from, transition.to, now);
            self.telemetry.emit(TelemetryEvent::StateTransition {
                exercise: self.kind,
                timestamp_ms: now,
                change: StateChange::Form {
                    from: transition.from,
                    to: transition.to,
                },
            });
        }
    }

    fn update_hold(&mut self, now: u64) {
        let holding = match self.kind.tracking() {
            Tracking::Reps { .. } => false,
            Tracking::PhaseHold { phase, .. } => self.phase() == Some(phase) && self.form.state() == Form::Good,
            Tracking::PostureHold => self.form.state() == Form::Good,
        };
        if !holding {
            self.hold_mark_ms = None;
            return;
        }
        if let Some(mark) = self.hold_mark_ms {
            self.hold_ms += now.saturating_sub(mark);
        }
        self.hold_mark_ms = Some(now);
    }

    fn outcome(&self, status: FrameStatus, rep_counted: bool, warning: Option<PostureWarning>) -> FrameOutcome {
        FrameOutcome {
            status,
            rep_count: self.reps.count(),
            phase: self.phase(),
            form: self.form.state(),
            hold_ms: self.hold_ms,
            rep_counted,
            warning,
        }
    }

    /// Start a new calibration run. The current baseline stays in force until
    /// the run completes.
    pub fn recalibrate(&mut self, policy: RecalibrationPolicy) {
        info!("Recalibrating {} session {} ({:?})", self.kind, self.id, policy);
        if policy == RecalibrationPolicy::Reset {
            self.reset_progress();
        }
        self.calibration_gate.reset();
        self.calibration = calibration_run(&self.config);
    }

    fn reset_progress(&mut self) {
        if let (Some(phase), Some(initial)) = (self.phase.as_mut(), initial_phase(self.kind)) {
            phase.reset(initial);
        }
        self.form.reset(initial_form(self.kind));
        self.reps.reset();
        self.warnings.reset();
        self.history.clear();
        self.hold_ms = 0;
        self.hold_mark_ms = None;
    }

    /// Swap in a new configuration and start a new calibration run under
    /// `policy`. Nothing changes if `config` is invalid.
    pub fn reconfigure(&mut self, config: &EngineConfig, policy: RecalibrationPolicy) -> Result<(), ConfigError> {
        config.validate()?;

        let timing = config.exercises.timing(self.kind);
        self.required = self.kind.required_landmarks(&config.landmarks);
        self.calibration_required = calibration::required_landmarks(&config.landmarks);
        self.gate = VisibilityGate::new(self.gate.preset(), config.lighting.clone());
        self.calibration_gate = VisibilityGate::new(self.gate.preset(), config.lighting.clone());
        if config.history_len != self.history.capacity() {
            self.history = RollingHistory::new(config.history_len);
        }
        if let Some(phase) = self.phase.as_mut() {
            phase.set_timing(timing);
        }
        self.form.set_timing(timing);
        self.reps.set_limits(&timing, config.exercises.alternation(self.kind));
        self.warnings.set_cooldown(timing.warning_cooldown_ms);
        self.telemetry.set_config(config.telemetry.clone());
        self.config = config.clone();

        self.recalibrate(policy);
        Ok(())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> ExerciseKind {
        self.kind
    }

    pub fn rep_count(&self) -> u32 {
        self.reps.count()
    }

    pub fn last_rep_ms(&self) -> Option<u64> {
        self.reps.last_rep_ms()
    }

    pub fn last_warning_ms(&self) -> Option<u64> {
        self.warnings.last_warning_ms()
    }

    /// When `side` last started a raise (high knees).
    pub fn last_raise_ms(&self, side: Side) -> Option<u64> {
        self.reps.last_raise_ms(side)
    }

    pub fn phase(&self) -> Option<Phase> {
        self.phase.as_ref().map(|p| p.state())
    }

    pub fn form(&self) -> Form {
        self.form.state()
    }

    /// Consecutive opposing verdicts pending on the phase and form machines.
    pub fn pending_counts(&self) -> (u32, u32) {
        let phase = self.phase.as_ref().map_or(0, |p| p.opposing_count());
        (phase, self.form.opposing_count())
    }

    pub fn hold_ms(&self) -> u64 {
        self.hold_ms
    }

    pub fn baseline(&self) -> &CalibrationBaseline {
        &self.baseline
    }

    pub fn baseline_source(&self) -> Option<BaselineSource> {
        self.baseline_source
    }

    pub fn is_calibrating(&self) -> bool {
        match &self.calibration {
            CalibrationRun::Running(calibrator) => matches!(calibrator.state(), CalibrationState::Collecting { .. }),
            CalibrationRun::Pending => true,
            CalibrationRun::Done => false,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn telemetry(&self) -> &TelemetryEmitter {
        &self.telemetry
    }

    pub fn telemetry_mut(&mut self) -> &mut TelemetryEmitter {
        &mut self.telemetry
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.id,
            exercise: self.kind,
            lighting: self.gate.preset(),
            rep_count: self.reps.count(),
            hold_ms: self.hold_ms,
            frames_processed: self.frames_processed,
            frames_skipped: self.frames_skipped,
            baseline: self.baseline,
            baseline_source: self.baseline_source,
            telemetry: self.telemetry.stats(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::test_support::standing;
    use crate::landmarks::test_support::set;
    use crate::landmarks::*;
    use crate::telemetry::EventKind;

    fn uncalibrated() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.calibration.enabled = false;
        config
    }

    fn session(kind: ExerciseKind, config: &EngineConfig) -> ExerciseSession {
        ExerciseSession::new(kind, config, LightingPreset::Normal).unwrap()
    }

    /// Push-up frame with both elbows bent to roughly `elbow` degrees.
    fn pushup(timestamp_ms: u64, elbow: f32) -> Frame {
        let mut frame = standing(timestamp_ms);
        let bend = (180.0 - elbow).to_radians();
        for (shoulder, elbow_idx, wrist, x) in [
            (LEFT_SHOULDER, LEFT_ELBOW, LEFT_WRIST, 0.4),
            (RIGHT_SHOULDER, RIGHT_ELBOW, RIGHT_WRIST, 0.6),
        ] {
            set(&mut frame, shoulder, x, 0.3);
            set(&mut frame, elbow_idx, x, 0.45);
            set(&mut frame, wrist, x + 0.15 * bend.sin(), 0.45 + 0.15 * bend.cos());
        }
        frame
    }

    fn kinds(session: &ExerciseSession) -> Vec<EventKind> {
        session.telemetry().events().map(|e| e.kind()).collect()
    }

    #[test]
    fn test_invalid_config_fails_construction() {
        let mut config = EngineConfig::default();
        config.exercises.pushups.good_frames = 0;
        assert!(ExerciseSession::new(ExerciseKind::Pushups, &config, LightingPreset::Normal).is_err());
    }

    #[test]
    fn test_disabled_calibration_adopts_defaults_on_first_frame() {
        let mut s = session(ExerciseKind::Pushups, &uncalibrated());
        assert!(s.is_calibrating());
        let outcome = s.process_frame(&pushup(0, 170.0));
        assert_eq!(outcome.status, FrameStatus::Processed);
        assert_eq!(s.baseline_source(), Some(BaselineSource::Default));
        assert_eq!(kinds(&s)[0], EventKind::CalibrationComplete);
    }

    #[test]
    fn test_frames_wait_for_calibration() {
        let mut s = session(ExerciseKind::Squats, &EngineConfig::default());
        let outcome = s.process_frame(&standing(0));
        assert_eq!(outcome.status, FrameStatus::Calibrating);

        let mut t = 33;
        while s.is_calibrating() {
            s.process_frame(&standing(t));
            t += 33;
        }
        assert_eq!(s.baseline_source(), Some(BaselineSource::Measured));
        let completions = kinds(&s).iter().filter(|k| **k == EventKind::CalibrationComplete).count();
        assert_eq!(completions, 1);
    }

    #[test]
    fn test_pushup_rep_counts_once() {
        let mut s = session(ExerciseKind::Pushups, &uncalibrated());
        let mut t = 0;
        for _ in 0..3 {
            s.process_frame(&pushup(t, 105.0));
            t += 100;
        }
        assert_eq!(s.phase(), Some(Phase::Down));

        let mut counted = 0;
        for _ in 0..5 {
            t += 200;
            if s.process_frame(&pushup(t, 145.0)).rep_counted {
                counted += 1;
            }
        }
        assert_eq!(counted, 1);
        assert_eq!(s.rep_count(), 1);
        assert_eq!(s.phase(), Some(Phase::Up));
    }

    #[test]
    fn test_occluded_frame_changes_nothing() {
        let mut s = session(ExerciseKind::Pushups, &uncalibrated());
        s.process_frame(&pushup(0, 105.0));
        s.process_frame(&pushup(100, 105.0));
        let pending = s.pending_counts();

        let mut hidden = pushup(200, 105.0);
        hidden.landmarks[LEFT_ELBOW].visibility = 0.1;
        let outcome = s.process_frame(&hidden);
        assert!(matches!(outcome.status, FrameStatus::Skipped(SkipReason::LowVisibility { .. })));
        assert_eq!(s.pending_counts(), pending);
        assert_eq!(s.rep_count(), 0);
        assert_eq!(kinds(&s).last(), Some(&EventKind::FrameSkipped));
    }

    fn run_rep(s: &mut ExerciseSession, t: &mut u64) {
        for _ in 0..3 {
            *t += 10;
            s.process_frame(&pushup(*t, 100.0));
        }
        for _ in 0..5 {
            *t += 10;
            s.process_frame(&pushup(*t, 160.0));
        }
    }

    #[test]
    fn test_fast_rep_is_an_anomaly() {
        let mut s = session(ExerciseKind::Pushups, &uncalibrated());
        let mut t = 1000;
        run_rep(&mut s, &mut t);
        assert_eq!(s.rep_count(), 1);
        run_rep(&mut s, &mut t);
        assert_eq!(s.rep_count(), 1);
        assert_eq!(s.phase(), Some(Phase::Up));
        assert!(kinds(&s).contains(&EventKind::AnomalyDetected));
    }

    #[test]
    fn test_recalibrate_policies() {
        let mut config = uncalibrated();
        config.exercises.pushups.min_rep_ms = 0;
        let mut t = 0;

        let mut preserved = session(ExerciseKind::Pushups, &config);
        run_rep(&mut preserved, &mut t);
        preserved.recalibrate(RecalibrationPolicy::Preserve);
        assert_eq!(preserved.rep_count(), 1);

        let mut reset = session(ExerciseKind::Pushups, &config);
        run_rep(&mut reset, &mut t);
        reset.recalibrate(RecalibrationPolicy::Reset);
        assert_eq!(reset.rep_count(), 0);
        assert_eq!(reset.phase(), Some(Phase::Up));
        // defaults adopted again on the next frame
        reset.process_frame(&pushup(t + 10, 160.0));
        let completions = kinds(&reset).iter().filter(|k| **k == EventKind::CalibrationComplete).count();
        assert_eq!(completions, 2);
    }

    #[test]
    fn test_reconfigure_rejects_invalid_without_changes() {
        let mut s = session(ExerciseKind::Pushups, &uncalibrated());
        let mut bad = uncalibrated();
        bad.history_len = 0;
        assert!(s.reconfigure(&bad, RecalibrationPolicy::Preserve).is_err());
        assert_eq!(s.config().history_len, 5);
    }

    #[test]
    fn test_plank_hold_accumulates_in_good_form() {
        let mut s = session(ExerciseKind::Plank, &uncalibrated());
        let mut frame = standing(0);
        for (sh, hip, knee, ankle) in [
            (LEFT_SHOULDER, LEFT_HIP, LEFT_KNEE, LEFT_ANKLE),
            (RIGHT_SHOULDER, RIGHT_HIP, RIGHT_KNEE, RIGHT_ANKLE),
        ] {
            set(&mut frame, sh, 0.2, 0.5);
            set(&mut frame, hip, 0.5, 0.5);
            set(&mut frame, knee, 0.65, 0.5);
            set(&mut frame, ankle, 0.8, 0.5);
        }
        for i in 0..15 {
            frame.timestamp_ms = i * 100;
            s.process_frame(&frame);
        }
        // good form entered on the fifth frame (t=400)
        assert_eq!(s.form(), Form::Good);
        assert_eq!(s.hold_ms(), 1000);
        assert_eq!(s.rep_count(), 0);
        assert_eq!(s.phase(), None);
    }
}
