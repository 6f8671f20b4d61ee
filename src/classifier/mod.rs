// src/classifier/mod.rs - pure per-frame classifiers
mod phase;
mod posture;
mod voting;

use std::collections::VecDeque;

use serde::Serialize;

use crate::calibration::CalibrationBaseline;
use crate::config::{ExerciseTable, MAX_HISTORY_LEN};
use crate::exercise::{ExerciseKind, Form, Phase, Side};
use crate::landmarks::{Frame, LandmarkTable};

/// Raw per-frame judgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Up,
    Down,
    GoodForm,
    BadForm,
    /// Between thresholds, or metrics disagree. No update.
    Invalid,
}

impl Verdict {
    pub fn phase(self) -> Option<Phase> {
        match self {
            Verdict::Up => Some(Phase::Up),
            Verdict::Down => Some(Phase::Down),
            _ => None,
        }
    }

    pub fn from_form(good: bool) -> Self {
        if good {
            Verdict::GoodForm
        } else {
            Verdict::BadForm
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Metric {
    pub name: &'static str,
    pub value: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    pub verdict: Verdict,
    /// Form check for this frame; `None` when the exercise has none.
    pub form: Option<Form>,
    /// Limb responsible for the verdict, for alternating exercises.
    pub side: Option<Side>,
    pub metrics: Vec<Metric>,
}

impl Reading {
    pub fn metric(&self, name: &str) -> Option<f32> {
        self.metrics.iter().find(|m| m.name == name).map(|m| m.value)
    }
}

pub(crate) fn form_of(good: bool) -> Form {
    if good {
        Form::Good
    } else {
        Form::Bad
    }
}

pub(crate) fn metric(name: &'static str, value: f32) -> Metric {
    Metric { name, value }
}

/// The last few readings of a session, oldest first.
#[derive(Debug, Clone)]
pub struct RollingHistory {
    readings: VecDeque<Reading>,
    capacity: usize,
}

impl RollingHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, MAX_HISTORY_LEN);
        Self {
            readings: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, reading: Reading) {
        self.readings.push_back(reading);
        while self.readings.len() > self.capacity {
            self.readings.pop_front();
        }
    }

    pub fn latest(&self) -> Option<&Reading> {
        self.readings.back()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recent side reported by any reading.
    pub fn last_side(&self) -> Option<Side> {
        self.readings.iter().rev().find_map(|r| r.side)
    }

    /// Mean of `current` and the newest stored values of `name`, over at most
    /// `capacity` samples in total.
    pub fn windowed_mean(&self, name: &str, current: f32) -> f32 {
        let mut sum = current;
        let mut count = 1;
        for reading in self.readings.iter().rev().take(self.capacity - 1) {
            if let Some(value) = reading.metric(name) {
                sum += value;
                count += 1;
            }
        }
        sum / count as f32
    }

    pub fn clear(&mut self) {
        self.readings.clear();
    }
}

/// Everything a classifier may look at.
pub struct ClassifierInput<'a> {
    pub frame: &'a Frame,
    pub baseline: &'a CalibrationBaseline,
    pub history: &'a RollingHistory,
    pub landmarks: &'a LandmarkTable,
}

/// Run the classifier for `kind`.
pub fn classify(kind: ExerciseKind, input: &ClassifierInput<'_>, table: &ExerciseTable) -> Reading {
    match kind {
        ExerciseKind::Pushups => phase::pushups(input, &table.pushups),
        ExerciseKind::Squats => phase::squats(input, &table.squats),
        ExerciseKind::Lunges => phase::lunges(input, &table.lunges),
        ExerciseKind::JumpingJacks => phase::jumping_jacks(input, &table.jumpingjacks),
        ExerciseKind::HighKnees => phase::high_knees(input, &table.highknees),
        ExerciseKind::WallSit => phase::wall_sit(input, &table.wallsit),
        ExerciseKind::Situps => voting::situps(input, &table.situps),
        ExerciseKind::Plank => posture::plank(input, &table.plank),
        ExerciseKind::SidePlank => posture::side_plank(input, &table.sideplank),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::landmarks::test_support::{blank_frame, set};
    use crate::landmarks::*;

    /// Upright standing pose with straight arms at the sides.
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

    pub fn run(kind: ExerciseKind, frame: &Frame, history: &RollingHistory) -> Reading {
        let baseline = CalibrationBaseline::DEFAULT;
        let landmarks = LandmarkTable::default();
        let input = ClassifierInput {
            frame,
            baseline: &baseline,
            history,
            landmarks: &landmarks,
        };
        classify(kind, &input, &ExerciseTable::default())
    }
}
