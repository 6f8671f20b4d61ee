// src/geometry.rs - planar joint math, z is ignored
use nalgebra::Vector2;

use crate::landmarks::Landmark;

const DEGENERATE_LEN: f32 = 1e-6;

fn planar(lm: &Landmark) -> Vector2<f32> {
    Vector2::new(lm.x, lm.y)
}

/// Angle at vertex `b` between rays `b→a` and `b→c`, in degrees `[0, 180]`.
///
/// Coincident points return 180 (treated as a straight joint).
pub fn angle(a: &Landmark, b: &Landmark, c: &Landmark) -> f32 {
    let v1 = planar(a) - planar(b);
    let v2 = planar(c) - planar(b);

    let mag1 = v1.norm();
    let mag2 = v2.norm();
    if mag1 < DEGENERATE_LEN || mag2 < DEGENERATE_LEN {
        return 180.0;
    }

    let cos_angle = (v1.dot(&v2) / (mag1 * mag2)).clamp(-1.0, 1.0);
    cos_angle.acos().to_degrees().clamp(0.0, 180.0)
}

/// Euclidean distance in normalized image units.
pub fn normalized_distance(a: &Landmark, b: &Landmark) -> f32 {
    (planar(a) - planar(b)).norm()
}

/// Cosine between `b→a` and image "up" `(0, -1)`.
///
/// 1.0 means `a` sits straight above `b`, 0.0 horizontal, -1.0 straight below.
/// Coincident points return 0.
pub fn vertical_cosine(a: &Landmark, b: &Landmark) -> f32 {
    let v = planar(a) - planar(b);
    let len = v.norm();
    if len < DEGENERATE_LEN {
        return 0.0;
    }
    (v.dot(&Vector2::new(0.0, -1.0)) / len).clamp(-1.0, 1.0)
}

/// `value / reference`, or 0 when the reference is degenerate.
pub fn ratio(value: f32, reference: f32) -> f32 {
    if reference.abs() < DEGENERATE_LEN {
        0.0
    } else {
        value / reference
    }
}
