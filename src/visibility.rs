// src/visibility.rs
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::{check_unit, ConfigError};
use crate::landmarks::Frame;

/// Smoothing factor for the `auto` preset's running visibility estimate.
const AUTO_ALPHA: f32 = 0.2;
/// Running mean visibility below this switches `auto` to the dim threshold.
const AUTO_DIM_BELOW: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightingPreset {
    Bright,
    #[default]
    Normal,
    Dim,
    Backlit,
    Auto,
}

impl FromStr for LightingPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bright" => Ok(LightingPreset::Bright),
            "normal" => Ok(LightingPreset::Normal),
            "dim" => Ok(LightingPreset::Dim),
            "backlit" => Ok(LightingPreset::Backlit),
            "auto" => Ok(LightingPreset::Auto),
            _ => Err(format!("unknown lighting preset '{}'", s)),
        }
    }
}

impl fmt::Display for LightingPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LightingPreset::Bright => "bright",
            LightingPreset::Normal => "normal",
            LightingPreset::Dim => "dim",
            LightingPreset::Backlit => "backlit",
            LightingPreset::Auto => "auto",
        };
        f.write_str(name)
    }
}

/// Minimum landmark visibility per lighting preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LightingThresholds {
    pub bright: f32,
    pub normal: f32,
    pub dim: f32,
    pub backlit: f32,
}

impl Default for LightingThresholds {
    fn default() -> Self {
        Self {
            bright: 0.50,
            normal: 0.35,
            dim: 0.25,
            backlit: 0.30,
        }
    }
}

impl LightingThresholds {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_unit("lighting.bright", self.bright)?;
        check_unit("lighting.normal", self.normal)?;
        check_unit("lighting.dim", self.dim)?;
        check_unit("lighting.backlit", self.backlit)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    LowVisibility { landmarks: Vec<usize>, min_visibility: f32 },
    NonMonotonicTimestamp { previous_ms: u64 },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::LowVisibility { landmarks, min_visibility } => write!(
                f,
                "landmarks {:?} below visibility threshold (lowest {:.2})",
                landmarks, min_visibility
            ),
            SkipReason::NonMonotonicTimestamp { previous_ms } => {
                write!(f, "timestamp earlier than previous frame at {}ms", previous_ms)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GateResult {
    Usable,
    Skip(SkipReason),
}

pub struct VisibilityGate {
    preset: LightingPreset,
    thresholds: LightingThresholds,
    running_visibility: Option<f32>,
    last_timestamp: Option<u64>,
}

impl VisibilityGate {
    pub fn new(preset: LightingPreset, thresholds: LightingThresholds) -> Self {
        Self {
            preset,
            thresholds,
            running_visibility: None,
            last_timestamp: None,
        }
    }

    pub fn preset(&self) -> LightingPreset {
        self.preset
    }

    /// Threshold currently applied.
    pub fn threshold(&self) -> f32 {
        match self.preset {
            LightingPreset::Bright => self.thresholds.bright,
            LightingPreset::Normal => self.thresholds.normal,
            LightingPreset::Dim => self.thresholds.dim,
            LightingPreset::Backlit => self.thresholds.backlit,
            LightingPreset::Auto => match self.running_visibility {
                Some(mean) if mean < AUTO_DIM_BELOW => self.thresholds.dim,
                _ => self.thresholds.normal,
            },
        }
    }

    /// Check `frame` against the `required` landmark set.
    ///
    /// Usable frames advance the gate's timestamp watermark.
    pub fn check(&mut self, frame: &Frame, required: &[usize]) -> GateResult {
        if let Some(previous_ms) = self.last_timestamp {
            if frame.timestamp_ms < previous_ms {
                return GateResult::Skip(SkipReason::NonMonotonicTimestamp { previous_ms });
            }
        }

        if self.preset == LightingPreset::Auto {
            let mean = frame.mean_visibility(required);
            self.running_visibility = Some(match self.running_visibility {
                Some(prev) => prev + AUTO_ALPHA * (mean - prev),
                None => mean,
            });
        }

        let threshold = self.threshold();
        let mut failing = Vec::new();
        let mut min_visibility = f32::MAX;
        for &idx in required {
            let visibility = frame.get(idx).visibility;
            if visibility < threshold {
                failing.push(idx);
                min_visibility = min_visibility.min(visibility);
            }
        }

        if !failing.is_empty() {
            return GateResult::Skip(SkipReason::LowVisibility {
                landmarks: failing,
                min_visibility,
            });
        }

        self.last_timestamp = Some(frame.timestamp_ms);
        GateResult::Usable
    }

    pub fn reset(&mut self) {
        self.running_visibility = None;
        self.last_timestamp = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::test_support::blank_frame;
    use crate::landmarks::{LEFT_KNEE, RIGHT_KNEE};

    #[test]
    fn test_visible_frame_is_usable() {
        let mut gate = VisibilityGate::new(LightingPreset::Normal, LightingThresholds::default());
        assert_eq!(gate.check(&blank_frame(0), &[LEFT_KNEE, RIGHT_KNEE]), GateResult::Usable);
    }

    #[test]
    fn test_occluded_knee_is_skipped() {
        let mut gate = VisibilityGate::new(LightingPreset::Normal, LightingThresholds::default());
        let mut frame = blank_frame(0);
        frame.landmarks[LEFT_KNEE].visibility = 0.1;

        match gate.check(&frame, &[LEFT_KNEE, RIGHT_KNEE]) {
            GateResult::Skip(SkipReason::LowVisibility { landmarks, min_visibility }) => {
                assert_eq!(landmarks, vec![LEFT_KNEE]);
                assert!((min_visibility - 0.1).abs() < 1e-6);
            }
            other => panic!("expected skip, got {:?}", other),
        }
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let mut gate = VisibilityGate::new(LightingPreset::Normal, LightingThresholds::default());
        let mut frame = blank_frame(0);
        frame.landmarks[LEFT_KNEE].visibility = 0.35;
        assert_eq!(gate.check(&frame, &[LEFT_KNEE]), GateResult::Usable);
    }

    #[test]
    fn test_preset_changes_threshold() {
        let mut frame = blank_frame(0);
        frame.landmarks[LEFT_KNEE].visibility = 0.3;

        let mut dim = VisibilityGate::new(LightingPreset::Dim, LightingThresholds::default());
        assert_eq!(dim.check(&frame, &[LEFT_KNEE]), GateResult::Usable);

        let mut bright = VisibilityGate::new(LightingPreset::Bright, LightingThresholds::default());
        assert_ne!(bright.check(&frame, &[LEFT_KNEE]), GateResult::Usable);
    }

    #[test]
    fn test_auto_drops_to_dim_threshold() {
        let mut gate = VisibilityGate::new(LightingPreset::Auto, LightingThresholds::default());
        assert_eq!(gate.threshold(), 0.35);

        let mut frame = blank_frame(0);
        for lm in frame.landmarks.iter_mut() {
            lm.visibility = 0.3;
        }
        // running mean 0.3 < 0.5 selects the dim threshold (0.25) for this frame
        assert_eq!(gate.check(&frame, &[LEFT_KNEE, RIGHT_KNEE]), GateResult::Usable);
        assert_eq!(gate.threshold(), 0.25);
    }

    #[test]
    fn test_backwards_timestamp_is_skipped() {
        let mut gate = VisibilityGate::new(LightingPreset::Normal, LightingThresholds::default());
        assert_eq!(gate.check(&blank_frame(100), &[LEFT_KNEE]), GateResult::Usable);
        assert_eq!(
            gate.check(&blank_frame(50), &[LEFT_KNEE]),
            GateResult::Skip(SkipReason::NonMonotonicTimestamp { previous_ms: 100 })
        );
        assert_eq!(gate.check(&blank_frame(100), &[LEFT_KNEE]), GateResult::Usable);
    }
}
