// src/pose_source.rs - replay recorded frames from JSON lines
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::landmarks::Frame;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read line {line}: {source}")]
    Read {
        line: usize,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed frame on line {line}: {source}")]
    Decode {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

pub trait PoseSource {
    /// Next frame, or `None` once the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError>;
}

/// One JSON-encoded frame per line. Blank lines are ignored.
pub struct JsonLinesSource<R> {
    reader: R,
    line: usize,
    buf: String,
}

impl JsonLinesSource<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| SourceError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Replaying frames from {}", path.display());
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            buf: String::new(),
        }
    }
}

impl<R: BufRead> PoseSource for JsonLinesSource<R> {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        loop {
            self.buf.clear();
            self.line += 1;
            let read = self
                .reader
                .read_line(&mut self.buf)
                .map_err(|source| SourceError::Read { line: self.line, source })?;
            if read == 0 {
                return Ok(None);
            }
            let text = self.buf.trim();
            if text.is_empty() {
                continue;
            }
            return serde_json::from_str(text)
                .map(Some)
                .map_err(|source| SourceError::Decode { line: self.line, source });
        }
    }
}

impl<R: BufRead> Iterator for JsonLinesSource<R> {
    type Item = Result<Frame, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_frame().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::test_support::blank_frame;

    fn line(timestamp_ms: u64) -> String {
        serde_json::to_string(&blank_frame(timestamp_ms)).unwrap()
    }

    #[test]
    fn test_reads_frames_and_skips_blank_lines() {
        let input = format!("{}\n\n   \n{}\n", line(0), line(33));
        let mut source = JsonLinesSource::new(input.as_bytes());
        assert_eq!(source.next_frame().unwrap().unwrap().timestamp_ms, 0);
        assert_eq!(source.next_frame().unwrap().unwrap().timestamp_ms, 33);
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_reports_line_of_bad_frame() {
        let input = format!("{}\n{{\"timestamp_ms\": 5, \"landmarks\": []}}\n", line(0));
        let results: Vec<_> = JsonLinesSource::new(input.as_bytes()).collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        match &results[1] {
            Err(SourceError::Decode { line, .. }) => assert_eq!(*line, 2),
            other => panic!("unexpected result: {:?}", other.as_ref().map(|f| f.timestamp_ms)),
        }
    }
}
