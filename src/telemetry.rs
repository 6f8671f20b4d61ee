// src/telemetry.rs - bounded event buffer with FrameProcessed sampling
use std::collections::vec_deque::Drain;
use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::calibration::{BaselineSource, CalibrationBaseline};
use crate::classifier::{Metric, Verdict};
use crate::config::{check_unit, ConfigError};
use crate::exercise::{ExerciseKind, Form, Phase};
use crate::reps::AnomalyKind;
use crate::visibility::SkipReason;

/// Which debounced state machine changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "machine", rename_all = "snake_case")]
pub enum StateChange {
    Phase { from: Phase, to: Phase },
    Form { from: Form, to: Form },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TelemetryEvent {
    FrameProcessed {
        exercise: ExerciseKind,
        timestamp_ms: u64,
        verdict: Verdict,
        metrics: Vec<Metric>,
    },
    FrameSkipped {
        exercise: ExerciseKind,
        timestamp_ms: u64,
        cause: SkipReason,
    },
    RepCounted {
        exercise: ExerciseKind,
        timestamp_ms: u64,
        count: u32,
    },
    StateTransition {
        exercise: ExerciseKind,
        timestamp_ms: u64,
        change: StateChange,
    },
    PostureWarning {
        exercise: ExerciseKind,
        timestamp_ms: u64,
        message: &'static str,
    },
    AnomalyDetected {
        exercise: ExerciseKind,
        timestamp_ms: u64,
        anomaly: AnomalyKind,
    },
    CalibrationComplete {
        exercise: ExerciseKind,
        timestamp_ms: u64,
        source: BaselineSource,
        frames: usize,
        baseline: CalibrationBaseline,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    FrameProcessed,
    FrameSkipped,
    RepCounted,
    StateTransition,
    PostureWarning,
    AnomalyDetected,
    CalibrationComplete,
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::FrameProcessed => "frame_processed",
            EventKind::FrameSkipped => "frame_skipped",
            EventKind::RepCounted => "rep_counted",
            EventKind::StateTransition => "state_transition",
            EventKind::PostureWarning => "posture_warning",
            EventKind::AnomalyDetected => "anomaly_detected",
            EventKind::CalibrationComplete => "calibration_complete",
        }
    }
}

impl TelemetryEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            TelemetryEvent::FrameProcessed { .. } => EventKind::FrameProcessed,
            TelemetryEvent::FrameSkipped { .. } => EventKind::FrameSkipped,
            TelemetryEvent::RepCounted { .. } => EventKind::RepCounted,
            TelemetryEvent::StateTransition { .. } => EventKind::StateTransition,
            TelemetryEvent::PostureWarning { .. } => EventKind::PostureWarning,
            TelemetryEvent::AnomalyDetected { .. } => EventKind::AnomalyDetected,
            TelemetryEvent::CalibrationComplete { .. } => EventKind::CalibrationComplete,
        }
    }

    pub fn exercise(&self) -> ExerciseKind {
        match self {
            TelemetryEvent::FrameProcessed { exercise, .. }
            | TelemetryEvent::FrameSkipped { exercise, .. }
            | TelemetryEvent::RepCounted { exercise, .. }
            | TelemetryEvent::StateTransition { exercise, .. }
            | TelemetryEvent::PostureWarning { exercise, .. }
            | TelemetryEvent::AnomalyDetected { exercise, .. }
            | TelemetryEvent::CalibrationComplete { exercise, .. } => *exercise,
        }
    }

    pub fn timestamp_ms(&self) -> u64 {
        match self {
            TelemetryEvent::FrameProcessed { timestamp_ms, .. }
            | TelemetryEvent::FrameSkipped { timestamp_ms, .. }
            | TelemetryEvent::RepCounted { timestamp_ms, .. }
            | TelemetryEvent::StateTransition { timestamp_ms, .. }
            | TelemetryEvent::PostureWarning { timestamp_ms, .. }
            | TelemetryEvent::AnomalyDetected { timestamp_ms, .. }
            | TelemetryEvent::CalibrationComplete { timestamp_ms, .. } => *timestamp_ms,
        }
    }
}

/// Per-type switches; a disabled type is never recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EventToggles {
    pub frame_processed: bool,
    pub frame_skipped: bool,
    pub rep_counted: bool,
    pub state_transition: bool,
    pub posture_warning: bool,
    pub anomaly_detected: bool,
    pub calibration_complete: bool,
}

impl Default for EventToggles {
    fn default() -> Self {
        Self {
            frame_processed: true,
            frame_skipped: true,
            rep_counted: true,
            state_transition: true,
            posture_warning: true,
            anomaly_detected: true,
            calibration_complete: true,
        }
    }
}

impl EventToggles {
    pub fn allows(&self, kind: EventKind) -> bool {
        match kind {
            EventKind::FrameProcessed => self.frame_processed,
            EventKind::FrameSkipped => self.frame_skipped,
            EventKind::RepCounted => self.rep_counted,
            EventKind::StateTransition => self.state_transition,
            EventKind::PostureWarning => self.posture_warning,
            EventKind::AnomalyDetected => self.anomaly_detected,
            EventKind::CalibrationComplete => self.calibration_complete,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TelemetryConfig {
    pub max_buffer_size: usize,
    /// Probability that a `FrameProcessed` event is recorded.
    pub sampling_rate: f32,
    /// Fixed seed for reproducible sampling.
    pub sampling_seed: Option<u64>,
    pub enabled: EventToggles,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            max_buffer_size: 100,
            sampling_rate: 1.0,
            sampling_seed: None,
            enabled: EventToggles::default(),
        }
    }
}

impl TelemetryConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_buffer_size == 0 {
            return Err(ConfigError::invalid("telemetry.max_buffer_size", "must be at least 1"));
        }
        check_unit("telemetry.sampling_rate", self.sampling_rate)
    }
}

/// Diagnostic counters since the emitter was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TelemetryStats {
    pub emitted: u64,
    pub evicted: u64,
    pub sampled_out: u64,
    pub disabled: u64,
}

pub struct TelemetryEmitter {
    config: TelemetryConfig,
    buffer: VecDeque<TelemetryEvent>,
    rng: StdRng,
    stats: TelemetryStats,
}

fn rng_for(config: &TelemetryConfig) -> StdRng {
    match config.sampling_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

impl TelemetryEmitter {
    pub fn new(config: TelemetryConfig) -> Self {
        let rng = rng_for(&config);
        Self {
            buffer: VecDeque::with_capacity(config.max_buffer_size),
            config,
            rng,
            stats: TelemetryStats::default(),
        }
    }

    /// Record `event` unless it is disabled or sampled out. Returns whether
    /// it was appended.
    pub fn emit(&mut self, event: TelemetryEvent) -> bool {
        let kind = event.kind();
        if !self.config.enabled.allows(kind) {
            self.stats.disabled += 1;
            return false;
        }
        if kind == EventKind::FrameProcessed && !self.sample() {
            self.stats.sampled_out += 1;
            return false;
        }

        while self.buffer.len() >= self.config.max_buffer_size {
            self.buffer.pop_front();
            self.stats.evicted += 1;
        }
        self.buffer.push_back(event);
        self.stats.emitted += 1;
        true
    }

    fn sample(&mut self) -> bool {
        let rate = self.config.sampling_rate;
        if rate >= 1.0 {
            true
        } else if rate <= 0.0 {
            false
        } else {
            self.rng.gen_bool(rate as f64)
        }
    }

    /// Remove and return buffered events, oldest first.
    pub fn drain(&mut self) -> Drain<'_, TelemetryEvent> {
        self.buffer.drain(..)
    }

    pub fn events(&self) -> impl Iterator<Item = &TelemetryEvent> {
        self.buffer.iter()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn stats(&self) -> TelemetryStats {
        self.stats
    }

    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }

    /// Apply new settings, evicting the oldest events if the buffer shrank.
    pub fn set_config(&mut self, config: TelemetryConfig) {
        if config.sampling_seed != self.config.sampling_seed {
            self.rng = rng_for(&config);
        }
        self.config = config;
        while self.buffer.len() > self.config.max_buffer_size {
            self.buffer.pop_front();
            self.stats.evicted += 1;
        }
    }
}
