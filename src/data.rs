// src/data.rs
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::Local;
use csv::Writer;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::session::SessionSummary;
use crate::telemetry::TelemetryEvent;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Serialize)]
struct EventRecord {
    timestamp_ms: u64,
    exercise: &'static str,
    event: &'static str,
    /// Full event as JSON.
    detail: String,
}

#[derive(Serialize)]
struct SummaryDocument<'a> {
    session_name: &'a str,
    generated_at: String,
    #[serde(flatten)]
    summary: &'a SessionSummary,
    event_counts: BTreeMap<&'static str, usize>,
}

/// Collects drained telemetry and writes it under `<output>/<session>/`.
pub struct TelemetryExporter {
    output_dir: PathBuf,
    session_name: String,
    events: Vec<TelemetryEvent>,
}

impl TelemetryExporter {
    pub fn new(output_dir: impl AsRef<Path>, session_name: Option<String>) -> Self {
        let session_name =
            session_name.unwrap_or_else(|| format!("session_{}", Local::now().format("%Y%m%d_%H%M%S")));

        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            session_name,
            events: Vec::new(),
        }
    }

    /// `RepTracker` under the user's documents folder, or `./output`.
    pub fn default_output_dir() -> PathBuf {
        directories::UserDirs::new()
            .and_then(|dirs| dirs.document_dir().map(|p| p.join("RepTracker")))
            .unwrap_or_else(|| PathBuf::from("./output"))
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    pub fn session_dir(&self) -> PathBuf {
        self.output_dir.join(&self.session_name)
    }

    pub fn record(&mut self, events: impl IntoIterator<Item = TelemetryEvent>) {
        self.events.extend(events);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn create_session_dir(&self) -> Result<PathBuf, ExportError> {
        let dir = self.session_dir();
        std::fs::create_dir_all(&dir).map_err(|source| ExportError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(dir)
    }

    pub fn export_csv(&self) -> Result<PathBuf, ExportError> {
        let csv_path = self.create_session_dir()?.join("events.csv");
        let file = File::create(&csv_path).map_err(|source| ExportError::Io {
            path: csv_path.clone(),
            source,
        })?;
        let mut writer = Writer::from_writer(file);

        for event in &self.events {
            writer.serialize(EventRecord {
                timestamp_ms: event.timestamp_ms(),
                exercise: event.exercise().name(),
                event: event.kind().name(),
                detail: serde_json::to_string(event)?,
            })?;
        }

        writer.flush().map_err(|source| ExportError::Io {
            path: csv_path.clone(),
            source,
        })?;
        info!("Wrote {} events to {}", self.events.len(), csv_path.display());
        Ok(csv_path)
    }

    pub fn export_summary(&self, summary: &SessionSummary) -> Result<PathBuf, ExportError> {
        let path = self.create_session_dir()?.join("summary.json");

        let mut event_counts = BTreeMap::new();
        for event in &self.events {
            *event_counts.entry(event.kind().name()).or_insert(0) += 1;
        }
        let document = SummaryDocument {
            session_name: &self.session_name,
            generated_at: Local::now().to_rfc3339(),
            summary,
            event_counts,
        };

        let json = serde_json::to_string_pretty(&document)?;
        std::fs::write(&path, json).map_err(|source| ExportError::Io {
            path: path.clone(),
            source,
        })?;
        info!("Wrote session summary to {}", path.display());
        Ok(path)
    }
}
