// src/config.rs - threshold tables and engine settings
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::calibration::CalibrationConfig;
use crate::exercise::ExerciseKind;
use crate::landmarks::{LandmarkTable, LANDMARK_COUNT};
use crate::telemetry::TelemetryConfig;
use crate::visibility::LightingThresholds;

/// Upper bound on the per-session rolling history.
pub const MAX_HISTORY_LEN: usize = 5;

pub static DEFAULT_CONFIG: Lazy<EngineConfig> = Lazy::new(EngineConfig::default);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: String, reason: String },
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

pub(crate) fn check_angle(field: &str, value: f32) -> Result<(), ConfigError> {
    if !(0.0..=180.0).contains(&value) {
        return Err(ConfigError::invalid(field, format!("{} is outside [0, 180] degrees", value)));
    }
    Ok(())
}

pub(crate) fn check_unit(field: &str, value: f32) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::invalid(field, format!("{} is outside [0, 1]", value)));
    }
    Ok(())
}

pub(crate) fn check_cosine(field: &str, value: f32) -> Result<(), ConfigError> {
    if !(-1.0..=1.0).contains(&value) {
        return Err(ConfigError::invalid(field, format!("{} is outside [-1, 1]", value)));
    }
    Ok(())
}

pub(crate) fn check_finite(field: &str, value: f32) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::invalid(field, "must be a finite number"));
    }
    Ok(())
}

pub(crate) fn check_positive(field: &str, value: f32) -> Result<(), ConfigError> {
    if !(value.is_finite() && value > 0.0) {
        return Err(ConfigError::invalid(field, format!("{} must be positive", value)));
    }
    Ok(())
}

/// `low` must sit strictly below `high`, leaving a dead band between them.
pub(crate) fn check_gap(low_field: &str, low: f32, high_field: &str, high: f32) -> Result<(), ConfigError> {
    if low >= high {
        return Err(ConfigError::invalid(
            low_field,
            format!("{} must be below `{}` ({})", low, high_field, high),
        ));
    }
    Ok(())
}

/// Hysteresis and timing values shared by every exercise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timing {
    /// Consecutive frames to enter `Down` / `Good`.
    pub good_frames: u32,
    /// Consecutive frames to enter `Up` / `Bad`.
    pub bad_frames: u32,
    pub min_rep_ms: u64,
    pub warning_cooldown_ms: u64,
}

impl Timing {
    fn validate(&self, exercise: &str) -> Result<(), ConfigError> {
        if self.good_frames == 0 {
            return Err(ConfigError::invalid(format!("{}.good_frames", exercise), "must be at least 1"));
        }
        if self.bad_frames == 0 {
            return Err(ConfigError::invalid(format!("{}.bad_frames", exercise), "must be at least 1"));
        }
        Ok(())
    }
}

/// Window inside which one half of an alternating movement must complete.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Alternation {
    pub min_ms: u64,
    pub max_ms: u64,
    /// Consecutive reps must come from opposite sides.
    pub switch_sides: bool,
}

fn check_alternation(exercise: &str, min_ms: u64, max_ms: u64) -> Result<(), ConfigError> {
    if min_ms >= max_ms {
        return Err(ConfigError::invalid(
            format!("{}.min_alternation_ms", exercise),
            format!("{} must be below max_alternation_ms ({})", min_ms, max_ms),
        ));
    }
    Ok(())
}

macro_rules! timing_of {
    ($cfg:expr) => {
        Timing {
            good_frames: $cfg.good_frames,
            bad_frames: $cfg.bad_frames,
            min_rep_ms: $cfg.min_rep_ms,
            warning_cooldown_ms: $cfg.warning_cooldown_ms,
        }
    };
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PushupConfig {
    pub good_frames: u32,
    pub bad_frames: u32,
    pub min_rep_ms: u64,
    pub warning_cooldown_ms: u64,
    pub elbow_down_max: f32,
    pub elbow_up_min: f32,
    pub body_line_min: f32,
}

impl Default for PushupConfig {
    fn default() -> Self {
        Self {
            good_frames: 3,
            bad_frames: 5,
            min_rep_ms: 600,
            warning_cooldown_ms: 2000,
            elbow_down_max: 110.0,
            elbow_up_min: 140.0,
            body_line_min: 150.0,
        }
    }
}

impl PushupConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        timing_of!(self).validate("pushups")?;
        check_angle("pushups.elbow_down_max", self.elbow_down_max)?;
        check_angle("pushups.elbow_up_min", self.elbow_up_min)?;
        check_angle("pushups.body_line_min", self.body_line_min)?;
        check_gap("pushups.elbow_down_max", self.elbow_down_max, "pushups.elbow_up_min", self.elbow_up_min)
    }
}

/// Squats use hip depth against the knee plus torso verticality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SquatConfig {
    pub good_frames: u32,
    pub bad_frames: u32,
    pub min_rep_ms: u64,
    pub warning_cooldown_ms: u64,
    /// (knee_y - hip_y) / torso_length at or below this is the bottom.
    pub hip_knee_down_max: f32,
    pub hip_knee_up_min: f32,
    pub torso_down_min_cos: f32,
    pub torso_up_min_cos: f32,
    pub torso_form_min_cos: f32,
}

impl Default for SquatConfig {
    fn default() -> Self {
        Self {
            good_frames: 3,
            bad_frames: 4,
            min_rep_ms: 800,
            warning_cooldown_ms: 2000,
            hip_knee_down_max: 0.10,
            hip_knee_up_min: 0.45,
            torso_down_min_cos: 0.50,
            torso_up_min_cos: 0.85,
            torso_form_min_cos: 0.60,
        }
    }
}

impl SquatConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        timing_of!(self).validate("squats")?;
        check_finite("squats.hip_knee_down_max", self.hip_knee_down_max)?;
        check_finite("squats.hip_knee_up_min", self.hip_knee_up_min)?;
        check_gap("squats.hip_knee_down_max", self.hip_knee_down_max, "squats.hip_knee_up_min", self.hip_knee_up_min)?;
        check_cosine("squats.torso_down_min_cos", self.torso_down_min_cos)?;
        check_cosine("squats.torso_up_min_cos", self.torso_up_min_cos)?;
        check_cosine("squats.torso_form_min_cos", self.torso_form_min_cos)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LungeConfig {
    pub good_frames: u32,
    pub bad_frames: u32,
    pub min_rep_ms: u64,
    pub warning_cooldown_ms: u64,
    pub front_knee_down_max: f32,
    pub back_knee_down_max: f32,
    pub knee_up_min: f32,
    pub torso_form_min_cos: f32,
}

impl Default for LungeConfig {
    fn default() -> Self {
        Self {
            good_frames: 3,
            bad_frames: 4,
            min_rep_ms: 800,
            warning_cooldown_ms: 2000,
            front_knee_down_max: 100.0,
            back_knee_down_max: 140.0,
            knee_up_min: 160.0,
            torso_form_min_cos: 0.80,
        }
    }
}

impl LungeConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        timing_of!(self).validate("lunges")?;
        check_angle("lunges.front_knee_down_max", self.front_knee_down_max)?;
        check_angle("lunges.back_knee_down_max", self.back_knee_down_max)?;
        check_angle("lunges.knee_up_min", self.knee_up_min)?;
        check_gap("lunges.front_knee_down_max", self.front_knee_down_max, "lunges.knee_up_min", self.knee_up_min)?;
        check_gap("lunges.back_knee_down_max", self.back_knee_down_max, "lunges.knee_up_min", self.knee_up_min)?;
        check_cosine("lunges.torso_form_min_cos", self.torso_form_min_cos)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JumpingJackConfig {
    pub good_frames: u32,
    pub bad_frames: u32,
    pub min_rep_ms: u64,
    pub warning_cooldown_ms: u64,
    /// Shoulder abduction (hip-shoulder-elbow) with arms down.
    pub arms_closed_max: f32,
    pub arms_open_min: f32,
    /// Ankle spread relative to shoulder width.
    pub spread_closed_max: f32,
    pub spread_open_min: f32,
    pub arm_symmetry_max: f32,
    pub min_alternation_ms: u64,
    pub max_alternation_ms: u64,
}

impl Default for JumpingJackConfig {
    fn default() -> Self {
        Self {
            good_frames: 2,
            bad_frames: 2,
            min_rep_ms: 400,
            warning_cooldown_ms: 2000,
            arms_closed_max: 40.0,
            arms_open_min: 140.0,
            spread_closed_max: 1.2,
            spread_open_min: 1.6,
            arm_symmetry_max: 30.0,
            min_alternation_ms: 150,
            max_alternation_ms: 2000,
        }
    }
}

impl JumpingJackConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        timing_of!(self).validate("jumpingjacks")?;
        check_angle("jumpingjacks.arms_closed_max", self.arms_closed_max)?;
        check_angle("jumpingjacks.arms_open_min", self.arms_open_min)?;
        check_angle("jumpingjacks.arm_symmetry_max", self.arm_symmetry_max)?;
        check_gap("jumpingjacks.arms_closed_max", self.arms_closed_max, "jumpingjacks.arms_open_min", self.arms_open_min)?;
        check_positive("jumpingjacks.spread_closed_max", self.spread_closed_max)?;
        check_positive("jumpingjacks.spread_open_min", self.spread_open_min)?;
        check_gap(
            "jumpingjacks.spread_closed_max",
            self.spread_closed_max,
            "jumpingjacks.spread_open_min",
            self.spread_open_min,
        )?;
        check_alternation("jumpingjacks", self.min_alternation_ms, self.max_alternation_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HighKneeConfig {
    pub good_frames: u32,
    pub bad_frames: u32,
    pub min_rep_ms: u64,
    pub warning_cooldown_ms: u64,
    /// Knee lift (hip_y - knee_y) / torso_length at or above this is raised.
    pub lift_raised_min: f32,
    pub lift_lowered_max: f32,
    pub torso_form_min_cos: f32,
    pub min_alternation_ms: u64,
    pub max_alternation_ms: u64,
}

impl Default for HighKneeConfig {
    fn default() -> Self {
        Self {
            good_frames: 2,
            bad_frames: 2,
            min_rep_ms: 200,
            warning_cooldown_ms: 2000,
            lift_raised_min: -0.10,
            lift_lowered_max: -0.35,
            torso_form_min_cos: 0.80,
            min_alternation_ms: 100,
            max_alternation_ms: 1500,
        }
    }
}

impl HighKneeConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        timing_of!(self).validate("highknees")?;
        check_finite("highknees.lift_raised_min", self.lift_raised_min)?;
        check_finite("highknees.lift_lowered_max", self.lift_lowered_max)?;
        check_gap(
            "highknees.lift_lowered_max",
            self.lift_lowered_max,
            "highknees.lift_raised_min",
            self.lift_raised_min,
        )?;
        check_cosine("highknees.torso_form_min_cos", self.torso_form_min_cos)?;
        check_alternation("highknees", self.min_alternation_ms, self.max_alternation_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WallSitConfig {
    pub good_frames: u32,
    pub bad_frames: u32,
    pub min_rep_ms: u64,
    pub warning_cooldown_ms: u64,
    pub knee_down_max: f32,
    pub knee_up_min: f32,
    pub hold_knee_min: f32,
    pub hold_knee_max: f32,
    pub torso_form_min_cos: f32,
}

impl Default for WallSitConfig {
    fn default() -> Self {
        Self {
            good_frames: 5,
            bad_frames: 5,
            min_rep_ms: 0,
            warning_cooldown_ms: 2000,
            knee_down_max: 105.0,
            knee_up_min: 150.0,
            hold_knee_min: 70.0,
            hold_knee_max: 110.0,
            torso_form_min_cos: 0.80,
        }
    }
}

impl WallSitConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        timing_of!(self).validate("wallsit")?;
        check_angle("wallsit.knee_down_max", self.knee_down_max)?;
        check_angle("wallsit.knee_up_min", self.knee_up_min)?;
        check_angle("wallsit.hold_knee_min", self.hold_knee_min)?;
        check_angle("wallsit.hold_knee_max", self.hold_knee_max)?;
        check_gap("wallsit.knee_down_max", self.knee_down_max, "wallsit.knee_up_min", self.knee_up_min)?;
        check_gap("wallsit.hold_knee_min", self.hold_knee_min, "wallsit.hold_knee_max", self.hold_knee_max)?;
        check_cosine("wallsit.torso_form_min_cos", self.torso_form_min_cos)
    }
}

/// Sit-ups vote across three metrics, all relative to the calibrated pose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SitupConfig {
    pub good_frames: u32,
    pub bad_frames: u32,
    pub min_rep_ms: u64,
    pub warning_cooldown_ms: u64,
    pub shoulder_knee_up_max: f32,
    pub shoulder_knee_down_min: f32,
    pub head_knee_up_max: f32,
    pub head_knee_down_min: f32,
    pub torso_up_min_cos: f32,
    pub torso_down_max_cos: f32,
    pub min_metrics_for_down: u32,
    pub min_metrics_for_up: u32,
}

impl Default for SitupConfig {
    fn default() -> Self {
        Self {
            good_frames: 3,
            bad_frames: 4,
            min_rep_ms: 800,
            warning_cooldown_ms: 2000,
            shoulder_knee_up_max: 0.62,
            shoulder_knee_down_min: 0.85,
            head_knee_up_max: 0.60,
            head_knee_down_min: 0.85,
            torso_up_min_cos: 0.70,
            torso_down_max_cos: 0.35,
            min_metrics_for_down: 1,
            min_metrics_for_up: 2,
        }
    }
}

impl SitupConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        timing_of!(self).validate("situps")?;
        check_positive("situps.shoulder_knee_up_max", self.shoulder_knee_up_max)?;
        check_positive("situps.head_knee_up_max", self.head_knee_up_max)?;
        check_gap(
            "situps.shoulder_knee_up_max",
            self.shoulder_knee_up_max,
            "situps.shoulder_knee_down_min",
            self.shoulder_knee_down_min,
        )?;
        check_gap(
            "situps.head_knee_up_max",
            self.head_knee_up_max,
            "situps.head_knee_down_min",
            self.head_knee_down_min,
        )?;
        check_cosine("situps.torso_up_min_cos", self.torso_up_min_cos)?;
        check_cosine("situps.torso_down_max_cos", self.torso_down_max_cos)?;
        check_gap(
            "situps.torso_down_max_cos",
            self.torso_down_max_cos,
            "situps.torso_up_min_cos",
            self.torso_up_min_cos,
        )?;
        for (field, value) in [
            ("situps.min_metrics_for_down", self.min_metrics_for_down),
            ("situps.min_metrics_for_up", self.min_metrics_for_up),
        ] {
            if !(1..=3).contains(&value) {
                return Err(ConfigError::invalid(field, format!("{} is outside 1..=3", value)));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlankConfig {
    pub good_frames: u32,
    pub bad_frames: u32,
    pub min_rep_ms: u64,
    pub warning_cooldown_ms: u64,
    /// Shoulder-hip-ankle angle range.
    pub back_line_min: f32,
    pub back_line_max: f32,
    pub asymmetry_max: f32,
    pub visibility_floor: f32,
    /// Absolute torso cosine above this means the body is not horizontal.
    pub torso_max_cos: f32,
}

impl Default for PlankConfig {
    fn default() -> Self {
        Self {
            good_frames: 5,
            bad_frames: 8,
            min_rep_ms: 0,
            warning_cooldown_ms: 3000,
            back_line_min: 160.0,
            back_line_max: 180.0,
            asymmetry_max: 15.0,
            visibility_floor: 0.5,
            torso_max_cos: 0.5,
        }
    }
}

impl PlankConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        timing_of!(self).validate("plank")?;
        check_angle("plank.back_line_min", self.back_line_min)?;
        check_angle("plank.back_line_max", self.back_line_max)?;
        check_gap("plank.back_line_min", self.back_line_min, "plank.back_line_max", self.back_line_max)?;
        check_angle("plank.asymmetry_max", self.asymmetry_max)?;
        check_unit("plank.visibility_floor", self.visibility_floor)?;
        check_unit("plank.torso_max_cos", self.torso_max_cos)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SidePlankConfig {
    pub good_frames: u32,
    pub bad_frames: u32,
    pub min_rep_ms: u64,
    pub warning_cooldown_ms: u64,
    pub back_line_min: f32,
    pub back_line_max: f32,
    pub asymmetry_max: f32,
    pub visibility_floor: f32,
    /// Absolute cosine of the shoulder-to-shoulder line against vertical.
    pub shoulder_stack_min_cos: f32,
}

impl Default for SidePlankConfig {
    fn default() -> Self {
        Self {
            good_frames: 5,
            bad_frames: 8,
            min_rep_ms: 0,
            warning_cooldown_ms: 3000,
            back_line_min: 160.0,
            back_line_max: 180.0,
            asymmetry_max: 20.0,
            visibility_floor: 0.5,
            shoulder_stack_min_cos: 0.7,
        }
    }
}

impl SidePlankConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        timing_of!(self).validate("sideplank")?;
        check_angle("sideplank.back_line_min", self.back_line_min)?;
        check_angle("sideplank.back_line_max", self.back_line_max)?;
        check_gap("sideplank.back_line_min", self.back_line_min, "sideplank.back_line_max", self.back_line_max)?;
        check_angle("sideplank.asymmetry_max", self.asymmetry_max)?;
        check_unit("sideplank.visibility_floor", self.visibility_floor)?;
        check_unit("sideplank.shoulder_stack_min_cos", self.shoulder_stack_min_cos)
    }
}

/// One threshold block per exercise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExerciseTable {
    pub pushups: PushupConfig,
    pub squats: SquatConfig,
    pub lunges: LungeConfig,
    pub jumpingjacks: JumpingJackConfig,
    pub highknees: HighKneeConfig,
    pub wallsit: WallSitConfig,
    pub situps: SitupConfig,
    pub plank: PlankConfig,
    pub sideplank: SidePlankConfig,
}

impl ExerciseTable {
    pub fn timing(&self, kind: ExerciseKind) -> Timing {
        match kind {
            ExerciseKind::Pushups => timing_of!(self.pushups),
            ExerciseKind::Squats => timing_of!(self.squats),
            ExerciseKind::Lunges => timing_of!(self.lunges),
            ExerciseKind::JumpingJacks => timing_of!(self.jumpingjacks),
            ExerciseKind::HighKnees => timing_of!(self.highknees),
            ExerciseKind::WallSit => timing_of!(self.wallsit),
            ExerciseKind::Situps => timing_of!(self.situps),
            ExerciseKind::Plank => timing_of!(self.plank),
            ExerciseKind::SidePlank => timing_of!(self.sideplank),
        }
    }

    pub fn alternation(&self, kind: ExerciseKind) -> Option<Alternation> {
        match kind {
            ExerciseKind::JumpingJacks => Some(Alternation {
                min_ms: self.jumpingjacks.min_alternation_ms,
                max_ms: self.jumpingjacks.max_alternation_ms,
                switch_sides: false,
            }),
            ExerciseKind::HighKnees => Some(Alternation {
                min_ms: self.highknees.min_alternation_ms,
                max_ms: self.highknees.max_alternation_ms,
                switch_sides: true,
            }),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pushups.validate()?;
        self.squats.validate()?;
        self.lunges.validate()?;
        self.jumpingjacks.validate()?;
        self.highknees.validate()?;
        self.wallsit.validate()?;
        self.situps.validate()?;
        self.plank.validate()?;
        self.sideplank.validate()
    }
}

/// Complete engine configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub landmarks: LandmarkTable,
    pub lighting: LightingThresholds,
    pub calibration: CalibrationConfig,
    pub telemetry: TelemetryConfig,
    /// Readings kept for classifiers that look back a few frames.
    pub history_len: usize,
    pub exercises: ExerciseTable,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            landmarks: LandmarkTable::default(),
            lighting: LightingThresholds::default(),
            calibration: CalibrationConfig::default(),
            telemetry: TelemetryConfig::default(),
            history_len: MAX_HISTORY_LEN,
            exercises: ExerciseTable::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&json)?;
        info!("Loaded engine config from {}", path.display());
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, index) in self.landmarks.entries() {
            if index >= LANDMARK_COUNT {
                return Err(ConfigError::invalid(
                    format!("landmarks.{}", name),
                    format!("index {} is outside 0..{}", index, LANDMARK_COUNT),
                ));
            }
        }
        if !(1..=MAX_HISTORY_LEN).contains(&self.history_len) {
            return Err(ConfigError::invalid(
                "history_len",
                format!("{} is outside 1..={}", self.history_len, MAX_HISTORY_LEN),
            ));
        }
        self.lighting.validate()?;
        self.calibration.validate()?;
        self.telemetry.validate()?;
        self.exercises.validate()
    }
}
