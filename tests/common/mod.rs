#![allow(dead_code)]

use rep_tracker::landmarks::*;
use rep_tracker::{EngineConfig, ExerciseKind, ExerciseSession, LightingPreset, TelemetryEvent};

pub fn blank_frame(timestamp_ms: u64) -> Frame {
    Frame::new(timestamp_ms, [Landmark::new(0.5, 0.5, 0.0, 1.0); LANDMARK_COUNT])
}

pub fn set(frame: &mut Frame, index: usize, x: f32, y: f32) {
    frame.landmarks[index].x = x;
    frame.landmarks[index].y = y;
}

/// Upright, arms hanging straight, feet under the hips.
pub fn standing(timestamp_ms: u64) -> Frame {
    let mut frame = blank_frame(timestamp_ms);
    set(&mut frame, NOSE, 0.5, 0.15);
    set(&mut frame, LEFT_SHOULDER, 0.4, 0.3);
    set(&mut frame, RIGHT_SHOULDER, 0.6, 0.3);
    set(&mut frame, LEFT_ELBOW, 0.4, 0.45);
    set(&mut frame, RIGHT_ELBOW, 0.6, 0.45);
    set(&mut frame, LEFT_WRIST, 0.4, 0.6);
    set(&mut frame, RIGHT_WRIST, 0.6, 0.6);
    set(&mut frame, LEFT_HIP, 0.45, 0.6);
    set(&mut frame, RIGHT_HIP, 0.55, 0.6);
    set(&mut frame, LEFT_KNEE, 0.45, 0.75);
    set(&mut frame, RIGHT_KNEE, 0.55, 0.75);
    set(&mut frame, LEFT_ANKLE, 0.45, 0.9);
    set(&mut frame, RIGHT_ANKLE, 0.55, 0.9);
    frame
}

/// Both elbows bent to `elbow` degrees, body straight.
pub fn pushup(timestamp_ms: u64, elbow: f32) -> Frame {
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

/// Standing with one knee driven to hip height.
pub fn knee_raised(timestamp_ms: u64, knee: usize) -> Frame {
    let mut frame = standing(timestamp_ms);
    let x = frame.landmarks[knee].x;
    set(&mut frame, knee, x, 0.6);
    frame
}

/// Push-up with the hips folded to a right angle.
pub fn pushup_bent_hips(timestamp_ms: u64, elbow: f32) -> Frame {
    let mut frame = pushup(timestamp_ms, elbow);
    set(&mut frame, LEFT_KNEE, 0.75, 0.6);
    set(&mut frame, RIGHT_KNEE, 0.85, 0.6);
    frame
}

/// Hips lowered to `hip_y` with the torso upright.
pub fn squat(timestamp_ms: u64, hip_y: f32) -> Frame {
    let mut frame = standing(timestamp_ms);
    set(&mut frame, LEFT_HIP, 0.45, hip_y);
    set(&mut frame, RIGHT_HIP, 0.55, hip_y);
    set(&mut frame, LEFT_SHOULDER, 0.4, hip_y - 0.3);
    set(&mut frame, RIGHT_SHOULDER, 0.6, hip_y - 0.3);
    frame
}

/// Bottom of a lunge: front knee at ninety degrees, back knee near 120.
pub fn lunge(timestamp_ms: u64) -> Frame {
    let mut frame = standing(timestamp_ms);
    set(&mut frame, LEFT_HIP, 0.45, 0.6);
    set(&mut frame, LEFT_KNEE, 0.6, 0.6);
    set(&mut frame, LEFT_ANKLE, 0.6, 0.75);
    set(&mut frame, RIGHT_HIP, 0.45, 0.6);
    set(&mut frame, RIGHT_KNEE, 0.4, 0.75);
    set(&mut frame, RIGHT_ANKLE, 0.25, 0.78);
    frame
}

/// Lying flat, or curled up with the head and shoulders near the knees.
pub fn situp(timestamp_ms: u64, sitting: bool) -> Frame {
    let mut frame = standing(timestamp_ms);
    for idx in [LEFT_HIP, RIGHT_HIP] {
        set(&mut frame, idx, 0.5, 0.8);
    }
    for idx in [LEFT_KNEE, RIGHT_KNEE] {
        set(&mut frame, idx, 0.8, 0.7);
    }
    let (shoulders, nose) = if sitting {
        ((0.6, 0.5), (0.68, 0.42))
    } else {
        ((0.2, 0.8), (0.1, 0.8))
    };
    for idx in [LEFT_SHOULDER, RIGHT_SHOULDER] {
        set(&mut frame, idx, shoulders.0, shoulders.1);
    }
    set(&mut frame, NOSE, nose.0, nose.1);
    frame
}

/// Jumping jack with the arms raised `left` and `right` degrees from the
/// torso; feet together or apart.
pub fn jack(timestamp_ms: u64, left: f32, right: f32, feet_apart: bool) -> Frame {
    let mut frame = standing(timestamp_ms);
    set(&mut frame, LEFT_HIP, 0.4, 0.6);
    set(&mut frame, RIGHT_HIP, 0.6, 0.6);
    let (l, r) = (left.to_radians(), right.to_radians());
    set(&mut frame, LEFT_ELBOW, 0.4 - 0.15 * l.sin(), 0.3 + 0.15 * l.cos());
    set(&mut frame, RIGHT_ELBOW, 0.6 + 0.15 * r.sin(), 0.3 + 0.15 * r.cos());
    if feet_apart {
        set(&mut frame, LEFT_ANKLE, 0.25, 0.9);
        set(&mut frame, RIGHT_ANKLE, 0.75, 0.9);
    }
    frame
}

/// Side plank: body in one line, shoulders stacked vertically.
pub fn side_plank(timestamp_ms: u64) -> Frame {
    let mut frame = standing(timestamp_ms);
    set(&mut frame, LEFT_SHOULDER, 0.2, 0.45);
    set(&mut frame, RIGHT_SHOULDER, 0.2, 0.55);
    set(&mut frame, LEFT_HIP, 0.5, 0.48);
    set(&mut frame, RIGHT_HIP, 0.5, 0.52);
    set(&mut frame, LEFT_KNEE, 0.65, 0.495);
    set(&mut frame, RIGHT_KNEE, 0.65, 0.505);
    set(&mut frame, LEFT_ANKLE, 0.8, 0.51);
    set(&mut frame, RIGHT_ANKLE, 0.8, 0.49);
    frame
}

pub fn uncalibrated() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.calibration.enabled = false;
    config
}

pub fn session(kind: ExerciseKind, config: &EngineConfig) -> ExerciseSession {
    ExerciseSession::new(kind, config, LightingPreset::Normal).unwrap()
}

pub fn drain(session: &mut ExerciseSession) -> Vec<TelemetryEvent> {
    session.telemetry_mut().drain().collect()
}
