// src/exercise.rs
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::landmarks::LandmarkTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExerciseKind {
    Pushups,
    Squats,
    Lunges,
    JumpingJacks,
    HighKnees,
    WallSit,
    Situps,
    Plank,
    SidePlank,
}

/// Position of the movement cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Up,
    Down,
}

/// Debounced posture judgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Form {
    Good,
    Bad,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

/// Which phase change finishes one repetition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completing {
    DownToUp,
    UpToDown,
}

impl Completing {
    pub fn matches(self, from: Phase, to: Phase) -> bool {
        match self {
            Completing::DownToUp => from == Phase::Down && to == Phase::Up,
            Completing::UpToDown => from == Phase::Up && to == Phase::Down,
        }
    }
}

/// How progress is measured for an exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tracking {
    /// Phase machine; a rep is the completing transition. Form is judged in
    /// `warn_in`.
    Reps {
        initial: Phase,
        completing: Completing,
        warn_in: Phase,
    },
    /// Phase machine; time counts while held in `phase` with good form.
    PhaseHold { initial: Phase, phase: Phase },
    /// No phases; time counts while form is good.
    PostureHold,
}

impl ExerciseKind {
    pub const ALL: [ExerciseKind; 9] = [
        ExerciseKind::Pushups,
        ExerciseKind::Squats,
        ExerciseKind::Lunges,
        ExerciseKind::JumpingJacks,
        ExerciseKind::HighKnees,
        ExerciseKind::WallSit,
        ExerciseKind::Situps,
        ExerciseKind::Plank,
        ExerciseKind::SidePlank,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ExerciseKind::Pushups => "pushups",
            ExerciseKind::Squats => "squats",
            ExerciseKind::Lunges => "lunges",
            ExerciseKind::JumpingJacks => "jumpingjacks",
            ExerciseKind::HighKnees => "highknees",
            ExerciseKind::WallSit => "wallsit",
            ExerciseKind::Situps => "situps",
            ExerciseKind::Plank => "plank",
            ExerciseKind::SidePlank => "sideplank",
        }
    }

    pub fn tracking(&self) -> Tracking {
        use Completing::*;
        match self {
            ExerciseKind::Pushups
            | ExerciseKind::Squats
            | ExerciseKind::Lunges
            | ExerciseKind::HighKnees
            | ExerciseKind::Situps => Tracking::Reps {
                initial: Phase::Up,
                completing: DownToUp,
                warn_in: Phase::Down,
            },
            // starts closed; a jack is done when the limbs come back in, and
            // arm symmetry only shows while open
            ExerciseKind::JumpingJacks => Tracking::Reps {
                initial: Phase::Down,
                completing: UpToDown,
                warn_in: Phase::Up,
            },
            ExerciseKind::WallSit => Tracking::PhaseHold { initial: Phase::Up, phase: Phase::Down },
            ExerciseKind::Plank | ExerciseKind::SidePlank => Tracking::PostureHold,
        }
    }

    pub fn counts_reps(&self) -> bool {
        matches!(self.tracking(), Tracking::Reps { .. })
    }

    /// Landmarks that must pass the visibility gate before the classifier runs.
    pub fn required_landmarks(&self, table: &LandmarkTable) -> Vec<usize> {
        let mut required = Vec::with_capacity(10);
        required.extend(table.shoulders());
        match self {
            ExerciseKind::Pushups => {
                required.extend(table.elbows());
                required.extend(table.wrists());
                required.extend(table.hips());
                required.extend(table.knees());
            }
            ExerciseKind::Squats
            | ExerciseKind::Lunges
            | ExerciseKind::WallSit
            | ExerciseKind::Plank
            | ExerciseKind::SidePlank => {
                required.extend(table.hips());
                required.extend(table.knees());
                required.extend(table.ankles());
            }
            ExerciseKind::JumpingJacks => {
                required.extend(table.elbows());
                required.extend(table.hips());
                required.extend(table.ankles());
            }
            ExerciseKind::HighKnees => {
                required.extend(table.hips());
                required.extend(table.knees());
            }
            ExerciseKind::Situps => {
                required.push(table.nose);
                required.extend(table.hips());
                required.extend(table.knees());
            }
        }
        required
    }

    /// Corrective cue shown when form stays bad.
    pub fn warning_message(&self) -> &'static str {
        match self {
            ExerciseKind::Pushups => "Keep your body in a straight line",
            ExerciseKind::Squats => "Keep your chest up",
            ExerciseKind::Lunges => "Keep your torso upright",
            ExerciseKind::JumpingJacks => "Raise both arms evenly",
            ExerciseKind::HighKnees => "Stay tall while driving your knees",
            ExerciseKind::WallSit => "Keep your knees at ninety degrees and your back on the wall",
            ExerciseKind::Situps => "Control the movement",
            ExerciseKind::Plank => "Keep your hips level with your shoulders",
            ExerciseKind::SidePlank => "Lift your hips and stack your shoulders",
        }
    }
}

impl fmt::Display for ExerciseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExerciseKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        ExerciseKind::ALL
            .into_iter()
            .find(|kind| kind.name() == normalized)
            .ok_or_else(|| format!("unknown exercise '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        assert_eq!("pushups".parse::<ExerciseKind>(), Ok(ExerciseKind::Pushups));
        assert_eq!("Jumping-Jacks".parse::<ExerciseKind>(), Ok(ExerciseKind::JumpingJacks));
        assert_eq!("side_plank".parse::<ExerciseKind>(), Ok(ExerciseKind::SidePlank));
        assert!("burpees".parse::<ExerciseKind>().is_err());
        for kind in ExerciseKind::ALL {
            assert_eq!(kind.name().parse::<ExerciseKind>(), Ok(kind));
        }
    }

    #[test]
    fn test_serde_names_match_display() {
        for kind in ExerciseKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind));
        }
    }

    #[test]
    fn test_completing_transition() {
        assert!(Completing::DownToUp.matches(Phase::Down, Phase::Up));
        assert!(!Completing::DownToUp.matches(Phase::Up, Phase::Down));
        assert!(Completing::UpToDown.matches(Phase::Up, Phase::Down));
    }

    #[test]
    fn test_jumping_jacks_warn_while_open() {
        match ExerciseKind::JumpingJacks.tracking() {
            Tracking::Reps { warn_in, .. } => assert_eq!(warn_in, Phase::Up),
            other => panic!("unexpected tracking {:?}", other),
        }
        match ExerciseKind::Pushups.tracking() {
            Tracking::Reps { warn_in, .. } => assert_eq!(warn_in, Phase::Down),
            other => panic!("unexpected tracking {:?}", other),
        }
    }

    #[test]
    fn test_pushups_require_arms_and_legs() {
        let table = LandmarkTable::default();
        let required = ExerciseKind::Pushups.required_landmarks(&table);
        for idx in [11, 12, 13, 14, 15, 16, 23, 24, 25, 26] {
            assert!(required.contains(&idx), "missing {}", idx);
        }
    }
}
