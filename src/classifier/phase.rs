// src/classifier/phase.rs - threshold classifiers, inclusive bounds with a dead band
use super::{form_of, metric, ClassifierInput, Reading, Verdict};
use crate::config::{HighKneeConfig, JumpingJackConfig, LungeConfig, PushupConfig, SquatConfig, WallSitConfig};
use crate::exercise::Side;
use crate::geometry::{angle, normalized_distance, ratio, vertical_cosine};
use crate::landmarks::Frame;

fn joint(frame: &Frame, a: usize, b: usize, c: usize) -> f32 {
    angle(&frame.get(a), &frame.get(b), &frame.get(c))
}

/// Hip-to-shoulder verticality, 1.0 when upright.
fn torso_cosine(input: &ClassifierInput<'_>) -> f32 {
    let t = input.landmarks;
    let shoulders = input.frame.midpoint(t.left_shoulder, t.right_shoulder);
    let hips = input.frame.midpoint(t.left_hip, t.right_hip);
    vertical_cosine(&shoulders, &hips)
}

fn knee_angles(input: &ClassifierInput<'_>) -> (f32, f32) {
    let (f, t) = (input.frame, input.landmarks);
    (
        joint(f, t.left_hip, t.left_knee, t.left_ankle),
        joint(f, t.right_hip, t.right_knee, t.right_ankle),
    )
}

pub fn pushups(input: &ClassifierInput<'_>, cfg: &PushupConfig) -> Reading {
    let (f, t) = (input.frame, input.landmarks);
    let left = joint(f, t.left_shoulder, t.left_elbow, t.left_wrist);
    let right = joint(f, t.right_shoulder, t.right_elbow, t.right_wrist);
    let elbow = (left + right) / 2.0;
    let body_line = (joint(f, t.left_shoulder, t.left_hip, t.left_knee)
        + joint(f, t.right_shoulder, t.right_hip, t.right_knee))
        / 2.0;

    let verdict = if elbow <= cfg.elbow_down_max {
        Verdict::Down
    } else if elbow >= cfg.elbow_up_min {
        Verdict::Up
    } else {
        Verdict::Invalid
    };

    Reading {
        verdict,
        form: Some(form_of(body_line >= cfg.body_line_min)),
        side: None,
        metrics: vec![
            metric("elbow_angle", elbow),
            metric("left_elbow_angle", left),
            metric("right_elbow_angle", right),
            metric("body_line_angle", body_line),
        ],
    }
}

/// Hip depth against the knees plus torso verticality. Knee angle alone
/// misreads deep squats filmed from the front, so it is not used.
pub fn squats(input: &ClassifierInput<'_>, cfg: &SquatConfig) -> Reading {
    let (f, t) = (input.frame, input.landmarks);
    let hips = f.midpoint(t.left_hip, t.right_hip);
    let knees = f.midpoint(t.left_knee, t.right_knee);
    // positive while the hips are above the knees (image y grows downward)
    let depth = ratio(knees.y - hips.y, input.baseline.torso_length);
    let torso = torso_cosine(input);

    let verdict = if depth <= cfg.hip_knee_down_max && torso >= cfg.torso_down_min_cos {
        Verdict::Down
    } else if depth >= cfg.hip_knee_up_min && torso >= cfg.torso_up_min_cos {
        Verdict::Up
    } else {
        Verdict::Invalid
    };

    Reading {
        verdict,
        form: Some(form_of(torso >= cfg.torso_form_min_cos)),
        side: None,
        metrics: vec![metric("hip_knee_ratio", depth), metric("torso_cos", torso)],
    }
}

pub fn lunges(input: &ClassifierInput<'_>, cfg: &LungeConfig) -> Reading {
    let (left, right) = knee_angles(input);
    let front = left.min(right);
    let back = left.max(right);
    let torso = torso_cosine(input);

    let verdict = if front <= cfg.front_knee_down_max && back <= cfg.back_knee_down_max {
        Verdict::Down
    } else if front >= cfg.knee_up_min {
        Verdict::Up
    } else {
        Verdict::Invalid
    };

    Reading {
        verdict,
        form: Some(form_of(torso >= cfg.torso_form_min_cos)),
        side: None,
        metrics: vec![
            metric("front_knee_angle", front),
            metric("back_knee_angle", back),
            metric("torso_cos", torso),
        ],
    }
}

/// `Up` is the open star position, `Down` arms down with feet together.
pub fn jumping_jacks(input: &ClassifierInput<'_>, cfg: &JumpingJackConfig) -> Reading {
    let (f, t) = (input.frame, input.landmarks);
    let left = joint(f, t.left_hip, t.left_shoulder, t.left_elbow);
    let right = joint(f, t.right_hip, t.right_shoulder, t.right_elbow);
    let arms = (left + right) / 2.0;
    let spread = ratio(
        normalized_distance(&f.get(t.left_ankle), &f.get(t.right_ankle)),
        input.baseline.shoulder_width,
    );

    let verdict = if arms >= cfg.arms_open_min && spread >= cfg.spread_open_min {
        Verdict::Up
    } else if arms <= cfg.arms_closed_max && spread <= cfg.spread_closed_max {
        Verdict::Down
    } else {
        Verdict::Invalid
    };

    Reading {
        verdict,
        form: Some(form_of((left - right).abs() <= cfg.arm_symmetry_max)),
        side: None,
        metrics: vec![
            metric("arm_angle", arms),
            metric("left_arm_angle", left),
            metric("right_arm_angle", right),
            metric("ankle_spread_ratio", spread),
        ],
    }
}

/// `Down` while a knee is driven up, `Up` once both feet are back down.
pub fn high_knees(input: &ClassifierInput<'_>, cfg: &HighKneeConfig) -> Reading {
    let (f, t) = (input.frame, input.landmarks);
    let torso_length = input.baseline.torso_length;
    let left = ratio(f.get(t.left_hip).y - f.get(t.left_knee).y, torso_length);
    let right = ratio(f.get(t.right_hip).y - f.get(t.right_knee).y, torso_length);

    let left_up = left >= cfg.lift_raised_min;
    let right_up = right >= cfg.lift_raised_min;
    let side = match (left_up, right_up) {
        (true, false) => Some(Side::Left),
        (false, true) => Some(Side::Right),
        // both read as raised mid-switch: stay with the knee already up
        (true, true) => Some(input.history.last_side().unwrap_or(if left >= right {
            Side::Left
        } else {
            Side::Right
        })),
        (false, false) => None,
    };

    let verdict = if side.is_some() {
        Verdict::Down
    } else if left <= cfg.lift_lowered_max && right <= cfg.lift_lowered_max {
        Verdict::Up
    } else {
        Verdict::Invalid
    };
    let torso = torso_cosine(input);

    Reading {
        verdict,
        form: Some(form_of(torso >= cfg.torso_form_min_cos)),
        side,
        metrics: vec![
            metric("left_knee_lift", left),
            metric("right_knee_lift", right),
            metric("torso_cos", torso),
        ],
    }
}

/// `Down` is the seated hold. Form is only meaningful while seated.
pub fn wall_sit(input: &ClassifierInput<'_>, cfg: &WallSitConfig) -> Reading {
    let (left, right) = knee_angles(input);
    let knee = (left + right) / 2.0;
    let torso = torso_cosine(input);

    let verdict = if knee <= cfg.knee_down_max {
        Verdict::Down
    } else if knee >= cfg.knee_up_min {
        Verdict::Up
    } else {
        Verdict::Invalid
    };
    let holding = (cfg.hold_knee_min..=cfg.hold_knee_max).contains(&knee) && torso >= cfg.torso_form_min_cos;

    Reading {
        verdict,
        form: Some(form_of(holding)),
        side: None,
        metrics: vec![metric("knee_angle", knee), metric("torso_cos", torso)],
    }
}
