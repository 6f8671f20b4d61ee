// src/classifier/voting.rs - sit-up quorum vote
use super::{metric, ClassifierInput, Reading, Verdict};
use crate::config::SitupConfig;
use crate::geometry::{normalized_distance, ratio, vertical_cosine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Vote {
    Up,
    Down,
    Abstain,
}

/// Vote for a metric that shrinks as the user sits up.
fn shrinking(value: f32, up_max: f32, down_min: f32) -> Vote {
    if value <= up_max {
        Vote::Up
    } else if value >= down_min {
        Vote::Down
    } else {
        Vote::Abstain
    }
}

/// Vote for a metric that grows as the user sits up.
fn growing(value: f32, up_min: f32, down_max: f32) -> Vote {
    if value >= up_min {
        Vote::Up
    } else if value <= down_max {
        Vote::Down
    } else {
        Vote::Abstain
    }
}

pub fn situps(input: &ClassifierInput<'_>, cfg: &SitupConfig) -> Reading {
    let (f, t) = (input.frame, input.landmarks);
    let shoulders = f.midpoint(t.left_shoulder, t.right_shoulder);
    let hips = f.midpoint(t.left_hip, t.right_hip);
    let knees = f.midpoint(t.left_knee, t.right_knee);

    let shoulder_knee = ratio(
        normalized_distance(&shoulders, &knees),
        input.baseline.shoulder_knee_distance,
    );
    let head_knee = ratio(
        normalized_distance(&f.get(t.nose), &knees),
        input.baseline.head_knee_distance,
    );
    let torso = vertical_cosine(&shoulders, &hips);

    let votes = [
        shrinking(shoulder_knee, cfg.shoulder_knee_up_max, cfg.shoulder_knee_down_min),
        shrinking(head_knee, cfg.head_knee_up_max, cfg.head_knee_down_min),
        growing(torso, cfg.torso_up_min_cos, cfg.torso_down_max_cos),
    ];
    let up = votes.iter().filter(|v| **v == Vote::Up).count() as u32;
    let down = votes.iter().filter(|v| **v == Vote::Down).count() as u32;

    let verdict = if up >= cfg.min_metrics_for_up && up > down {
        Verdict::Up
    } else if down >= cfg.min_metrics_for_down && down > up {
        Verdict::Down
    } else {
        Verdict::Invalid
    };

    Reading {
        verdict,
        form: None,
        side: None,
        metrics: vec![
            metric("shoulder_knee_ratio", shoulder_knee),
            metric("head_knee_ratio", head_knee),
            metric("torso_cos", torso),
            metric("up_votes", up as f32),
            metric("down_votes", down as f32),
        ],
    }
}
