// src/hysteresis.rs
use std::fmt::Debug;

use crate::config::Timing;
use crate::exercise::{Form, Phase};

pub trait Debounced: Copy + Eq + Debug {
    /// Consecutive opposing frames required to enter `self`.
    fn frames_to_enter(self, timing: &Timing) -> u32;
}

impl Debounced for Phase {
    fn frames_to_enter(self, timing: &Timing) -> u32 {
        match self {
            Phase::Down => timing.good_frames,
            Phase::Up => timing.bad_frames,
        }
    }
}

impl Debounced for Form {
    fn frames_to_enter(self, timing: &Timing) -> u32 {
        match self {
            Form::Good => timing.good_frames,
            Form::Bad => timing.bad_frames,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition<S> {
    pub from: S,
    pub to: S,
}

#[derive(Debug, Clone)]
pub struct Hysteresis<S> {
    state: S,
    opposing: u32,
    timing: Timing,
}

impl<S: Debounced> Hysteresis<S> {
    pub fn new(initial: S, timing: Timing) -> Self {
        Self {
            state: initial,
            opposing: 0,
            timing,
        }
    }

    pub fn state(&self) -> S {
        self.state
    }

    /// Consecutive opposing verdicts seen so far.
    pub fn opposing_count(&self) -> u32 {
        self.opposing
    }

    /// Feed one verdict; `None` is an invalid frame.
    pub fn update(&mut self, observed: Option<S>) -> Option<Transition<S>> {
        match observed {
            Some(target) if target != self.state => {
                self.opposing += 1;
                if self.opposing >= target.frames_to_enter(&self.timing) {
                    let transition = Transition {
                        from: self.state,
                        to: target,
                    };
                    self.state = target;
                    self.opposing = 0;
                    Some(transition)
                } else {
                    None
                }
            }
            _ => {
                self.opposing = 0;
                None
            }
        }
    }

    pub fn reset(&mut self, state: S) {
        self.state = state;
        self.opposing = 0;
    }

    pub fn set_timing(&mut self, timing: Timing) {
        self.timing = timing;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timing(good: u32, bad: u32) -> Timing {
        Timing {
            good_frames: good,
            bad_frames: bad,
            min_rep_ms: 0,
            warning_cooldown_ms: 0,
        }
    }

    #[test]
    fn test_flips_after_required_frames() {
        let mut h = Hysteresis::new(Phase::Up, timing(3, 5));
        assert_eq!(h.update(Some(Phase::Down)), None);
        assert_eq!(h.update(Some(Phase::Down)), None);
        assert_eq!(
            h.update(Some(Phase::Down)),
            Some(Transition {
                from: Phase::Up,
                to: Phase::Down
            })
        );
        assert_eq!(h.state(), Phase::Down);

        for _ in 0..4 {
            assert_eq!(h.update(Some(Phase::Up)), None);
        }
        assert!(h.update(Some(Phase::Up)).is_some());
        assert_eq!(h.state(), Phase::Up);
    }

    #[test]
    fn test_invalid_resets_opposing_count() {
        let mut h = Hysteresis::new(Phase::Up, timing(3, 5));
        h.update(Some(Phase::Down));
        h.update(Some(Phase::Down));
        assert_eq!(h.opposing_count(), 2);
        h.update(None);
        assert_eq!(h.opposing_count(), 0);

        h.update(Some(Phase::Down));
        h.update(Some(Phase::Down));
        assert_eq!(h.state(), Phase::Up);
    }

    #[test]
    fn test_same_direction_resets_opposing_count() {
        let mut h = Hysteresis::new(Form::Bad, timing(2, 2));
        h.update(Some(Form::Good));
        h.update(Some(Form::Bad));
        assert_eq!(h.opposing_count(), 0);
        assert_eq!(h.update(Some(Form::Good)), None);
        assert!(h.update(Some(Form::Good)).is_some());
        assert_eq!(h.state(), Form::Good);
    }

    #[test]
    fn test_single_frame_threshold() {
        let mut h = Hysteresis::new(Form::Good, timing(1, 1));
        assert!(h.update(Some(Form::Bad)).is_some());
        assert!(h.update(Some(Form::Good)).is_some());
    }
}
