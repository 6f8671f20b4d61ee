// src/landmarks.rs
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of points in a full-body pose frame.
pub const LANDMARK_COUNT: usize = 33;

// Standard 33-point pose numbering
pub const NOSE: usize = 0;
pub const LEFT_EAR: usize = 7;
pub const RIGHT_EAR: usize = 8;
pub const LEFT_SHOULDER: usize = 11;
pub const RIGHT_SHOULDER: usize = 12;
pub const LEFT_ELBOW: usize = 13;
pub const RIGHT_ELBOW: usize = 14;
pub const LEFT_WRIST: usize = 15;
pub const RIGHT_WRIST: usize = 16;
pub const LEFT_HIP: usize = 23;
pub const RIGHT_HIP: usize = 24;
pub const LEFT_KNEE: usize = 25;
pub const RIGHT_KNEE: usize = 26;
pub const LEFT_ANKLE: usize = 27;
pub const RIGHT_ANKLE: usize = 28;
pub const LEFT_HEEL: usize = 29;
pub const RIGHT_HEEL: usize = 30;
pub const LEFT_FOOT_INDEX: usize = 31;
pub const RIGHT_FOOT_INDEX: usize = 32;

/// A single tracked body point in normalized image coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
    #[serde(default)]
    pub visibility: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32, visibility: f32) -> Self {
        Self { x, y, z, visibility }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite() && self.visibility.is_finite()
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum FrameError {
    #[error("expected {LANDMARK_COUNT} landmarks, got {0}")]
    WrongLandmarkCount(usize),
    #[error("landmark {0} has a non-finite coordinate")]
    NonFinite(usize),
}

/// One timestamped snapshot of all 33 landmarks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFrame", into = "RawFrame")]
pub struct Frame {
    pub timestamp_ms: u64,
    pub landmarks: [Landmark; LANDMARK_COUNT],
}

// serde only derives arrays up to 32 elements, so frames travel as a Vec
#[derive(Serialize, Deserialize)]
struct RawFrame {
    timestamp_ms: u64,
    landmarks: Vec<Landmark>,
}

impl TryFrom<RawFrame> for Frame {
    type Error = FrameError;

    fn try_from(raw: RawFrame) -> Result<Self, Self::Error> {
        Frame::from_slice(raw.timestamp_ms, &raw.landmarks)
    }
}

impl From<Frame> for RawFrame {
    fn from(frame: Frame) -> Self {
        RawFrame {
            timestamp_ms: frame.timestamp_ms,
            landmarks: frame.landmarks.to_vec(),
        }
    }
}

impl Frame {
    pub fn new(timestamp_ms: u64, landmarks: [Landmark; LANDMARK_COUNT]) -> Self {
        Self { timestamp_ms, landmarks }
    }

    /// Build a frame from a landmark slice, validating count and values.
    /// Visibility is clamped to `[0, 1]`.
    pub fn from_slice(timestamp_ms: u64, landmarks: &[Landmark]) -> Result<Self, FrameError> {
        if landmarks.len() != LANDMARK_COUNT {
            return Err(FrameError::WrongLandmarkCount(landmarks.len()));
        }

        let mut points = [Landmark::default(); LANDMARK_COUNT];
        for (i, lm) in landmarks.iter().enumerate() {
            if !lm.is_finite() {
                return Err(FrameError::NonFinite(i));
            }
            points[i] = Landmark {
                visibility: lm.visibility.clamp(0.0, 1.0),
                ..*lm
            };
        }

        Ok(Self::new(timestamp_ms, points))
    }

    /// Landmark at `index`, or a zero landmark with no visibility when out of range.
    pub fn get(&self, index: usize) -> Landmark {
        self.landmarks.get(index).copied().unwrap_or_default()
    }

    /// Midpoint of two landmarks; visibility is the weaker of the two.
    pub fn midpoint(&self, a: usize, b: usize) -> Landmark {
        let (a, b) = (self.get(a), self.get(b));
        Landmark {
            x: (a.x + b.x) / 2.0,
            y: (a.y + b.y) / 2.0,
            z: (a.z + b.z) / 2.0,
            visibility: a.visibility.min(b.visibility),
        }
    }

    /// Mean visibility over a set of landmark indices.
    pub fn mean_visibility(&self, indices: &[usize]) -> f32 {
        if indices.is_empty() {
            return 0.0;
        }
        indices.iter().map(|&i| self.get(i).visibility).sum::<f32>() / indices.len() as f32
    }
}

/// Indices the engine reads, overridable from the configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LandmarkTable {
    pub nose: usize,
    pub left_shoulder: usize,
    pub right_shoulder: usize,
    pub left_elbow: usize,
    pub right_elbow: usize,
    pub left_wrist: usize,
    pub right_wrist: usize,
    pub left_hip: usize,
    pub right_hip: usize,
    pub left_knee: usize,
    pub right_knee: usize,
    pub left_ankle: usize,
    pub right_ankle: usize,
}

impl Default for LandmarkTable {
    fn default() -> Self {
        Self {
            nose: NOSE,
            left_shoulder: LEFT_SHOULDER,
            right_shoulder: RIGHT_SHOULDER,
            left_elbow: LEFT_ELBOW,
            right_elbow: RIGHT_ELBOW,
            left_wrist: LEFT_WRIST,
            right_wrist: RIGHT_WRIST,
            left_hip: LEFT_HIP,
            right_hip: RIGHT_HIP,
            left_knee: LEFT_KNEE,
            right_knee: RIGHT_KNEE,
            left_ankle: LEFT_ANKLE,
            right_ankle: RIGHT_ANKLE,
        }
    }
}

impl LandmarkTable {
    pub fn entries(&self) -> [(&'static str, usize); 13] {
        [
            ("nose", self.nose),
            ("left_shoulder", self.left_shoulder),
            ("right_shoulder", self.right_shoulder),
            ("left_elbow", self.left_elbow),
            ("right_elbow", self.right_elbow),
            ("left_wrist", self.left_wrist),
            ("right_wrist", self.right_wrist),
            ("left_hip", self.left_hip),
            ("right_hip", self.right_hip),
            ("left_knee", self.left_knee),
            ("right_knee", self.right_knee),
            ("left_ankle", self.left_ankle),
            ("right_ankle", self.right_ankle),
        ]
    }

    pub fn shoulders(&self) -> [usize; 2] {
        [self.left_shoulder, self.right_shoulder]
    }

    pub fn elbows(&self) -> [usize; 2] {
        [self.left_elbow, self.right_elbow]
    }

    pub fn wrists(&self) -> [usize; 2] {
        [self.left_wrist, self.right_wrist]
    }

    pub fn hips(&self) -> [usize; 2] {
        [self.left_hip, self.right_hip]
    }

    pub fn knees(&self) -> [usize; 2] {
        [self.left_knee, self.right_knee]
    }

    pub fn ankles(&self) -> [usize; 2] {
        [self.left_ankle, self.right_ankle]
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_frame_from_json() {
        let points: Vec<serde_json::Value> = (0..LANDMARK_COUNT)
            .map(|i| serde_json::json!({"x": i as f32 / 100.0, "y": 0.5, "z": 0.0, "visibility": 1.4}))
            .collect();
        let doc = serde_json::json!({"timestamp_ms": 42, "landmarks": points});

        let frame: Frame = serde_json::from_value(doc).unwrap();
        assert_eq!(frame.timestamp_ms, 42);
        assert_eq!(frame.landmarks[LEFT_SHOULDER].x, 0.11);
        // clamped
        assert_eq!(frame.landmarks[0].visibility, 1.0);
    }

    #[test]
    fn test_rejects_short_frame() {
        let doc = serde_json::json!({"timestamp_ms": 1, "landmarks": [{"x": 0.1, "y": 0.2}]});
        assert!(serde_json::from_value::<Frame>(doc).is_err());
        assert_eq!(
            Frame::from_slice(1, &[Landmark::default(); 12]),
            Err(FrameError::WrongLandmarkCount(12))
        );
    }

    #[test]
    fn test_rejects_non_finite() {
        let mut points = vec![Landmark::default(); LANDMARK_COUNT];
        points[5].y = f32::NAN;
        assert_eq!(Frame::from_slice(0, &points), Err(FrameError::NonFinite(5)));
    }

    #[test]
    fn test_midpoint_takes_weaker_visibility() {
        let mut frame = test_support::blank_frame(0);
        test_support::set(&mut frame, LEFT_HIP, 0.4, 0.6);
        test_support::set(&mut frame, RIGHT_HIP, 0.6, 0.8);
        frame.landmarks[RIGHT_HIP].visibility = 0.3;

        let mid = frame.midpoint(LEFT_HIP, RIGHT_HIP);
        assert!((mid.x - 0.5).abs() < 1e-6);
        assert!((mid.y - 0.7).abs() < 1e-6);
        assert_eq!(mid.visibility, 0.3);
    }
}
