// src/lib.rs
//! Exercise rep counting and posture checks over 33-point pose frames.
//!
//! ```no_run
//! use rep_tracker::{EngineConfig, ExerciseKind, ExerciseSession, JsonLinesSource, LightingPreset, PoseSource};
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut session = ExerciseSession::new(ExerciseKind::Squats, &EngineConfig::default(), LightingPreset::Auto)?;
//! let mut frames = JsonLinesSource::open("squats.jsonl")?;
//! while let Some(frame) = frames.next_frame()? {
//!     let outcome = session.process_frame(&frame);
//!     if outcome.rep_counted {
//!         println!("rep {}", outcome.rep_count);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod calibration;
pub mod classifier;
pub mod config;
pub mod data;
pub mod exercise;
pub mod geometry;
pub mod hysteresis;
pub mod landmarks;
pub mod pose_source;
pub mod reps;
pub mod session;
pub mod telemetry;
pub mod visibility;
pub mod warnings;

pub use calibration::{BaselineSource, CalibrationBaseline};
pub use classifier::{Reading, Verdict};
pub use config::{ConfigError, EngineConfig};
pub use data::{ExportError, TelemetryExporter};
pub use exercise::{ExerciseKind, Form, Phase};
pub use landmarks::{Frame, FrameError, Landmark};
pub use pose_source::{JsonLinesSource, PoseSource, SourceError};
pub use reps::AnomalyKind;
pub use session::{ExerciseSession, FrameOutcome, FrameStatus, RecalibrationPolicy, SessionSummary};
pub use telemetry::{EventKind, TelemetryConfig, TelemetryEmitter, TelemetryEvent};
pub use visibility::{LightingPreset, SkipReason};
pub use warnings::PostureWarning;
