// src/reps.rs - rep guard: cadence and alternation checks
use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::{Alternation, Timing};
use crate::exercise::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnomalyKind {
    TooFast { interval_ms: u64, min_rep_ms: u64 },
    ClockWentBackwards { last_rep_ms: u64 },
    PhaseTooShort { duration_ms: u64, min_ms: u64 },
    PhaseTooLong { duration_ms: u64, max_ms: u64 },
    SameSideRepeated { side: Side },
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnomalyKind::TooFast { interval_ms, min_rep_ms } => {
                write!(f, "rep {}ms after the previous one (minimum {}ms)", interval_ms, min_rep_ms)
            }
            AnomalyKind::ClockWentBackwards { last_rep_ms } => {
                write!(f, "timestamp precedes last rep at {}ms", last_rep_ms)
            }
            AnomalyKind::PhaseTooShort { duration_ms, min_ms } => {
                write!(f, "phase held {}ms, shorter than {}ms", duration_ms, min_ms)
            }
            AnomalyKind::PhaseTooLong { duration_ms, max_ms } => {
                write!(f, "phase held {}ms, longer than {}ms", duration_ms, max_ms)
            }
            AnomalyKind::SameSideRepeated { side } => write!(f, "{:?} side repeated without alternating", side),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepDecision {
    Counted { count: u32 },
    Rejected(AnomalyKind),
}

pub struct RepCounter {
    count: u32,
    last_rep_ms: Option<u64>,
    min_rep_ms: u64,
    alternation: Option<Alternation>,
    /// When the phase now being held was entered, and by which side.
    phase_entered_ms: Option<u64>,
    entered_side: Option<Side>,
    last_counted_side: Option<Side>,
    left_raise_ms: Option<u64>,
    right_raise_ms: Option<u64>,
}

impl RepCounter {
    pub fn new(timing: &Timing, alternation: Option<Alternation>) -> Self {
        Self {
            count: 0,
            last_rep_ms: None,
            min_rep_ms: timing.min_rep_ms,
            alternation,
            phase_entered_ms: None,
            entered_side: None,
            last_counted_side: None,
            left_raise_ms: None,
            right_raise_ms: None,
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn last_rep_ms(&self) -> Option<u64> {
        self.last_rep_ms
    }

    /// Most recent time the given leg started a raise.
    pub fn last_raise_ms(&self, side: Side) -> Option<u64> {
        match side {
            Side::Left => self.left_raise_ms,
            Side::Right => self.right_raise_ms,
        }
    }

    /// Record a non-completing transition into a new phase.
    pub fn phase_entered(&mut self, now_ms: u64, side: Option<Side>) {
        self.phase_entered_ms = Some(now_ms);
        self.entered_side = side;
        match side {
            Some(Side::Left) => self.left_raise_ms = Some(now_ms),
            Some(Side::Right) => self.right_raise_ms = Some(now_ms),
            None => {}
        }
    }

    /// A completing transition happened at `now_ms`; decide whether it counts.
    pub fn complete(&mut self, now_ms: u64) -> RepDecision {
        let decision = match self.check(now_ms) {
            Ok(()) => {
                self.count += 1;
                self.last_rep_ms = Some(now_ms);
                self.last_counted_side = self.entered_side;
                info!("Rep {} counted at {}ms", self.count, now_ms);
                RepDecision::Counted { count: self.count }
            }
            Err(anomaly) => {
                warn!("Rep rejected at {}ms: {}", now_ms, anomaly);
                RepDecision::Rejected(anomaly)
            }
        };
        // the completing transition also starts the next phase
        self.phase_entered_ms = Some(now_ms);
        self.entered_side = None;
        decision
    }

    fn check(&self, now_ms: u64) -> Result<(), AnomalyKind> {
        if let Some(last_rep_ms) = self.last_rep_ms {
            if now_ms < last_rep_ms {
                return Err(AnomalyKind::ClockWentBackwards { last_rep_ms });
            }
            let interval_ms = now_ms - last_rep_ms;
            if interval_ms < self.min_rep_ms {
                return Err(AnomalyKind::TooFast {
                    interval_ms,
                    min_rep_ms: self.min_rep_ms,
                });
            }
        }

        let Some(alternation) = self.alternation else {
            return Ok(());
        };
        if let Some(entered) = self.phase_entered_ms {
            let duration_ms = now_ms.saturating_sub(entered);
            if duration_ms < alternation.min_ms {
                return Err(AnomalyKind::PhaseTooShort {
                    duration_ms,
                    min_ms: alternation.min_ms,
                });
            }
            if duration_ms > alternation.max_ms {
                return Err(AnomalyKind::PhaseTooLong {
                    duration_ms,
                    max_ms: alternation.max_ms,
                });
            }
        }
        if alternation.switch_sides {
            if let (Some(side), Some(previous)) = (self.entered_side, self.last_counted_side) {
                if side == previous {
                    return Err(AnomalyKind::SameSideRepeated { side });
                }
            }
        }
        Ok(())
    }

    pub fn reset(&mut self) {
        self.count = 0;
        self.last_rep_ms = None;
        self.phase_entered_ms = None;
        self.entered_side = None;
        self.last_counted_side = None;
        self.left_raise_ms = None;
        self.right_raise_ms = None;
    }

    pub fn set_limits(&mut self, timing: &Timing, alternation: Option<Alternation>) {
        self.min_rep_ms = timing.min_rep_ms;
        self.alternation = alternation;
    }
}
