// src/warnings.rs - rate-limited posture warnings
use serde::Serialize;
use tracing::warn;

use crate::exercise::{ExerciseKind, Form, Phase, Tracking};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostureWarning {
    pub message: &'static str,
    pub timestamp_ms: u64,
}

/// Whether the debounced state calls for a warning on this frame.
///
/// `reading_form` is the current frame's form check, `None` when the
/// classifier has none.
pub fn warrants_warning(kind: ExerciseKind, phase: Option<Phase>, form: Form, reading_form: Option<Form>) -> bool {
    if form != Form::Bad {
        return false;
    }
    match kind.tracking() {
        Tracking::PostureHold => reading_form == Some(Form::Bad),
        Tracking::Reps { warn_in, .. } => phase == Some(warn_in),
        Tracking::PhaseHold { phase: hold, .. } => phase == Some(hold),
    }
}

pub struct WarningCooldown {
    cooldown_ms: u64,
    last_warning_ms: Option<u64>,
}

impl WarningCooldown {
    pub fn new(cooldown_ms: u64) -> Self {
        Self {
            cooldown_ms,
            last_warning_ms: None,
        }
    }

    pub fn last_warning_ms(&self) -> Option<u64> {
        self.last_warning_ms
    }

    /// Emit a warning for `kind` at `now_ms` if `bad` and the cooldown has
    /// elapsed. The first warning is never delayed.
    pub fn offer(&mut self, kind: ExerciseKind, now_ms: u64, bad: bool) -> Option<PostureWarning> {
        if !bad {
            return None;
        }
        if let Some(last) = self.last_warning_ms {
            if now_ms < last || now_ms - last < self.cooldown_ms {
                return None;
            }
        }
        self.last_warning_ms = Some(now_ms);
        let message = kind.warning_message();
        warn!("Posture warning for {} at {}ms: {}", kind, now_ms, message);
        Some(PostureWarning {
            message,
            timestamp_ms: now_ms,
        })
    }

    pub fn reset(&mut self) {
        self.last_warning_ms = None;
    }

    pub fn set_cooldown(&mut self, cooldown_ms: u64) {
        self.cooldown_ms = cooldown_ms;
    }
}
