// src/calibration.rs - per-session baseline, median of neutral-pose frames
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{check_positive, ConfigError};
use crate::geometry::{angle, normalized_distance};
use crate::landmarks::{Frame, LandmarkTable};

/// Measurements below this are treated as degenerate.
const MIN_MEASUREMENT: f32 = 1e-4;

/// Reference body measurements for ratio-based metrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationBaseline {
    pub shoulder_width: f32,
    pub torso_length: f32,
    pub neutral_hip_height: f32,
    pub neutral_knee_angle: f32,
    pub camera_distance_factor: f32,
    pub shoulder_knee_distance: f32,
    pub head_knee_distance: f32,
}

impl CalibrationBaseline {
    /// Used whenever calibration is disabled or fails.
    pub const DEFAULT: CalibrationBaseline = CalibrationBaseline {
        shoulder_width: 0.25,
        torso_length: 0.30,
        neutral_hip_height: 0.55,
        neutral_knee_angle: 175.0,
        camera_distance_factor: 1.0,
        shoulder_knee_distance: 0.55,
        head_knee_distance: 0.70,
    };

    fn fields(&self) -> [f32; 7] {
        [
            self.shoulder_width,
            self.torso_length,
            self.neutral_hip_height,
            self.neutral_knee_angle,
            self.camera_distance_factor,
            self.shoulder_knee_distance,
            self.head_knee_distance,
        ]
    }

    /// Every field finite and non-zero.
    pub fn is_complete(&self) -> bool {
        self.fields().iter().all(|v| v.is_finite() && *v > MIN_MEASUREMENT)
    }
}

impl Default for CalibrationBaseline {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineSource {
    Measured,
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CalibrationConfig {
    pub enabled: bool,
    pub min_stable_frames: usize,
    pub calibration_duration_ms: u64,
    /// Fewer usable frames than this when time runs out aborts the run.
    pub min_viable_frames: usize,
    /// Shoulder width that maps to a camera distance factor of 1.0.
    pub reference_shoulder_width: f32,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_stable_frames: 30,
            calibration_duration_ms: 3000,
            min_viable_frames: 10,
            reference_shoulder_width: 0.25,
        }
    }
}

impl CalibrationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_viable_frames == 0 {
            return Err(ConfigError::invalid("calibration.min_viable_frames", "must be at least 1"));
        }
        if self.min_viable_frames > self.min_stable_frames {
            return Err(ConfigError::invalid(
                "calibration.min_viable_frames",
                format!(
                    "{} exceeds min_stable_frames ({})",
                    self.min_viable_frames, self.min_stable_frames
                ),
            ));
        }
        if self.calibration_duration_ms == 0 {
            return Err(ConfigError::invalid("calibration.calibration_duration_ms", "must be positive"));
        }
        check_positive("calibration.reference_shoulder_width", self.reference_shoulder_width)
    }
}

/// Landmarks a calibration frame must show.
pub fn required_landmarks(table: &LandmarkTable) -> Vec<usize> {
    let mut required = vec![table.nose];
    required.extend(table.shoulders());
    required.extend(table.hips());
    required.extend(table.knees());
    required.extend(table.ankles());
    required
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    shoulder_width: f32,
    torso_length: f32,
    hip_height: f32,
    knee_angle: f32,
    shoulder_knee: f32,
    head_knee: f32,
}

impl Sample {
    fn measure(frame: &Frame, t: &LandmarkTable) -> Self {
        let mid_shoulder = frame.midpoint(t.left_shoulder, t.right_shoulder);
        let mid_hip = frame.midpoint(t.left_hip, t.right_hip);
        let mid_knee = frame.midpoint(t.left_knee, t.right_knee);
        let left_knee = angle(&frame.get(t.left_hip), &frame.get(t.left_knee), &frame.get(t.left_ankle));
        let right_knee = angle(&frame.get(t.right_hip), &frame.get(t.right_knee), &frame.get(t.right_ankle));

        Self {
            shoulder_width: normalized_distance(&frame.get(t.left_shoulder), &frame.get(t.right_shoulder)),
            torso_length: normalized_distance(&mid_shoulder, &mid_hip),
            hip_height: mid_hip.y,
            knee_angle: (left_knee + right_knee) / 2.0,
            shoulder_knee: normalized_distance(&mid_shoulder, &mid_knee),
            head_knee: normalized_distance(&frame.get(t.nose), &mid_knee),
        }
    }
}

fn median(mut values: Vec<f32>) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationState {
    Collecting { frames: usize },
    Complete(CalibrationBaseline),
    Aborted,
}

/// Finished calibration run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationResult {
    pub baseline: CalibrationBaseline,
    pub source: BaselineSource,
    pub frames: usize,
}

pub struct Calibrator {
    config: CalibrationConfig,
    state: CalibrationState,
    started_ms: Option<u64>,
    samples: Vec<Sample>,
}

impl Calibrator {
    pub fn new(config: CalibrationConfig) -> Self {
        let capacity = config.min_stable_frames;
        Self {
            config,
            state: CalibrationState::Collecting { frames: 0 },
            started_ms: None,
            samples: Vec::with_capacity(capacity),
        }
    }

    pub fn state(&self) -> &CalibrationState {
        &self.state
    }

    pub fn is_collecting(&self) -> bool {
        matches!(self.state, CalibrationState::Collecting { .. })
    }

    /// Feed one frame. `usable` is the verdict of the calibration visibility
    /// gate; unusable frames still advance the time budget.
    ///
    /// Returns the result exactly once, on the frame that ends the run.
    pub fn observe(&mut self, frame: &Frame, usable: bool, table: &LandmarkTable) -> Option<CalibrationResult> {
        if !self.is_collecting() {
            return None;
        }

        let started = *self.started_ms.get_or_insert(frame.timestamp_ms);
        if usable {
            self.samples.push(Sample::measure(frame, table));
            self.state = CalibrationState::Collecting {
                frames: self.samples.len(),
            };
        }

        let elapsed = frame.timestamp_ms.saturating_sub(started);
        let frames = self.samples.len();
        if frames >= self.config.min_stable_frames {
            return Some(self.finish());
        }
        if elapsed >= self.config.calibration_duration_ms {
            if frames >= self.config.min_viable_frames {
                return Some(self.finish());
            }
            warn!(
                "Calibration timed out after {}ms with {} usable frames, using default baseline",
                elapsed, frames
            );
            return Some(self.abort());
        }
        None
    }

    fn finish(&mut self) -> CalibrationResult {
        let pick = |f: fn(&Sample) -> f32| median(self.samples.iter().map(f).collect());
        let shoulder_width = pick(|s| s.shoulder_width);
        let baseline = CalibrationBaseline {
            shoulder_width,
            torso_length: pick(|s| s.torso_length),
            neutral_hip_height: pick(|s| s.hip_height),
            neutral_knee_angle: pick(|s| s.knee_angle),
            camera_distance_factor: shoulder_width / self.config.reference_shoulder_width,
            shoulder_knee_distance: pick(|s| s.shoulder_knee),
            head_knee_distance: pick(|s| s.head_knee),
        };

        if !baseline.is_complete() {
            warn!("Calibration produced a degenerate baseline {:?}, using defaults", baseline);
            return self.abort();
        }

        let frames = self.samples.len();
        info!("Calibration complete from {} frames: {:?}", frames, baseline);
        self.state = CalibrationState::Complete(baseline);
        self.samples.clear();
        CalibrationResult {
            baseline,
            source: BaselineSource::Measured,
            frames,
        }
    }

    fn abort(&mut self) -> CalibrationResult {
        let frames = self.samples.len();
        self.state = CalibrationState::Aborted;
        self.samples.clear();
        CalibrationResult {
            baseline: CalibrationBaseline::DEFAULT,
            source: BaselineSource::Default,
            frames,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::test_support::{blank_frame, set};
    use crate::landmarks::*;

    fn standing_frame(timestamp_ms: u64, jitter: f32) -> Frame {
        let mut frame = blank_frame(timestamp_ms);
        set(&mut frame, NOSE, 0.5, 0.15);
        set(&mut frame, LEFT_SHOULDER, 0.4 + jitter, 0.3);
        set(&mut frame, RIGHT_SHOULDER, 0.6, 0.3);
        set(&mut frame, LEFT_HIP, 0.45, 0.6);
        set(&mut frame, RIGHT_HIP, 0.55, 0.6);
        set(&mut frame, LEFT_KNEE, 0.45, 0.75);
        set(&mut frame, RIGHT_KNEE, 0.55, 0.75);
        set(&mut frame, LEFT_ANKLE, 0.45, 0.9);
        set(&mut frame, RIGHT_ANKLE, 0.55, 0.9);
        frame
    }

    #[test]
    fn test_median() {
        assert_eq!(median(vec![3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(vec![4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(median(vec![]), 0.0);
    }

    #[test]
    fn test_completes_after_min_stable_frames() {
        let table = LandmarkTable::default();
        let mut calibrator = Calibrator::new(CalibrationConfig::default());

        for i in 0..29 {
            assert!(calibrator.observe(&standing_frame(i * 33, 0.0), true, &table).is_none());
        }
        let result = calibrator.observe(&standing_frame(29 * 33, 0.0), true, &table).unwrap();

        assert_eq!(result.source, BaselineSource::Measured);
        assert_eq!(result.frames, 30);
        assert!((result.baseline.shoulder_width - 0.2).abs() < 1e-5);
        assert!((result.baseline.torso_length - 0.3).abs() < 1e-5);
        assert!((result.baseline.neutral_hip_height - 0.6).abs() < 1e-5);
        assert!((result.baseline.neutral_knee_angle - 180.0).abs() < 0.1);
        assert!((result.baseline.camera_distance_factor - 0.8).abs() < 1e-4);
        assert!(result.baseline.is_complete());
        assert!(matches!(calibrator.state(), CalibrationState::Complete(_)));

        // nothing more once finished
        assert!(calibrator.observe(&standing_frame(2000, 0.0), true, &table).is_none());
    }

    #[test]
    fn test_median_resists_outlier_frames() {
        let table = LandmarkTable::default();
        let mut calibrator = Calibrator::new(CalibrationConfig::default());
        let mut result = None;
        for i in 0..30 {
            // a few wildly wrong shoulder detections
            let jitter = if i % 10 == 0 { -0.3 } else { 0.0 };
            result = calibrator.observe(&standing_frame(i * 33, jitter), true, &table);
        }
        let result = result.unwrap();
        assert!((result.baseline.shoulder_width - 0.2).abs() < 1e-5);
    }

    #[test]
    fn test_time_budget_with_enough_frames_completes() {
        let table = LandmarkTable::default();
        let mut calibrator = Calibrator::new(CalibrationConfig::default());
        for i in 0..12 {
            assert!(calibrator.observe(&standing_frame(i * 100, 0.0), true, &table).is_none());
        }
        let result = calibrator.observe(&standing_frame(3000, 0.0), false, &table).unwrap();
        assert_eq!(result.source, BaselineSource::Measured);
        assert_eq!(result.frames, 12);
    }

    #[test]
    fn test_time_budget_without_frames_aborts_to_defaults() {
        let table = LandmarkTable::default();
        let mut calibrator = Calibrator::new(CalibrationConfig::default());
        assert!(calibrator.observe(&standing_frame(1000, 0.0), false, &table).is_none());
        assert!(calibrator.observe(&standing_frame(2500, 0.0), true, &table).is_none());

        let result = calibrator.observe(&standing_frame(4000, 0.0), false, &table).unwrap();
        assert_eq!(result.source, BaselineSource::Default);
        assert_eq!(result.baseline, CalibrationBaseline::DEFAULT);
        assert_eq!(calibrator.state(), &CalibrationState::Aborted);
    }

    #[test]
    fn test_degenerate_measurements_abort() {
        let table = LandmarkTable::default();
        let mut calibrator = Calibrator::new(CalibrationConfig::default());
        let mut result = None;
        for i in 0..30 {
            // every landmark on one spot
            result = calibrator.observe(&blank_frame(i * 33), true, &table);
        }
        assert_eq!(result.unwrap().source, BaselineSource::Default);
    }

    #[test]
    fn test_config_validation() {
        let mut config = CalibrationConfig::default();
        config.min_viable_frames = 40;
        assert!(config.validate().is_err());
        config.min_viable_frames = 0;
        assert!(config.validate().is_err());
    }
}
