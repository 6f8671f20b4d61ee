// src/classifier/posture.rs
use super::{form_of, metric, ClassifierInput, Reading, Verdict};
use crate::config::{PlankConfig, SidePlankConfig};
use crate::exercise::ExerciseKind;
use crate::geometry::{angle, vertical_cosine};

struct BackLine {
    left: f32,
    right: f32,
    /// Mean of both sides, averaged over the rolling window.
    smoothed: f32,
}

fn back_line(input: &ClassifierInput<'_>) -> BackLine {
    let (f, t) = (input.frame, input.landmarks);
    let left = angle(&f.get(t.left_shoulder), &f.get(t.left_hip), &f.get(t.left_ankle));
    let right = angle(&f.get(t.right_shoulder), &f.get(t.right_hip), &f.get(t.right_ankle));
    let smoothed = input.history.windowed_mean("back_line_angle", (left + right) / 2.0);
    BackLine { left, right, smoothed }
}

pub fn plank(input: &ClassifierInput<'_>, cfg: &PlankConfig) -> Reading {
    let (f, t) = (input.frame, input.landmarks);
    let line = back_line(input);
    let asymmetry = (line.left - line.right).abs();
    let visibility = f.mean_visibility(&ExerciseKind::Plank.required_landmarks(t));
    let shoulders = f.midpoint(t.left_shoulder, t.right_shoulder);
    let hips = f.midpoint(t.left_hip, t.right_hip);
    let torso = vertical_cosine(&shoulders, &hips).abs();

    let good = (cfg.back_line_min..=cfg.back_line_max).contains(&line.smoothed)
        && asymmetry <= cfg.asymmetry_max
        && visibility >= cfg.visibility_floor
        && torso <= cfg.torso_max_cos;

    Reading {
        verdict: Verdict::from_form(good),
        form: Some(form_of(good)),
        side: None,
        metrics: vec![
            metric("back_line_angle", (line.left + line.right) / 2.0),
            metric("back_line_smoothed", line.smoothed),
            metric("asymmetry", asymmetry),
            metric("visibility", visibility),
            metric("torso_cos", torso),
        ],
    }
}

pub fn side_plank(input: &ClassifierInput<'_>, cfg: &SidePlankConfig) -> Reading {
    let (f, t) = (input.frame, input.landmarks);
    let line = back_line(input);
    let asymmetry = (line.left - line.right).abs();
    let visibility = f.mean_visibility(&ExerciseKind::SidePlank.required_landmarks(t));
    let stack = vertical_cosine(&f.get(t.left_shoulder), &f.get(t.right_shoulder)).abs();

    let good = (cfg.back_line_min..=cfg.back_line_max).contains(&line.smoothed)
        && asymmetry <= cfg.asymmetry_max
        && visibility >= cfg.visibility_floor
        && stack >= cfg.shoulder_stack_min_cos;

    Reading {
        verdict: Verdict::from_form(good),
        form: Some(form_of(good)),
        side: None,
        metrics: vec![
            metric("back_line_angle", (line.left + line.right) / 2.0),
            metric("back_line_smoothed", line.smoothed),
            metric("asymmetry", asymmetry),
            metric("visibility", visibility),
            metric("shoulder_stack_cos", stack),
        ],
    }
}
