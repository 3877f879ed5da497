//! CPU evaluation of the metaball field.
//!
//! Mirrors the fragment stage generated in `renderer::shader` so the
//! thresholding can be checked without a GPU.

use glam::{Vec2, Vec3};

use super::field::Snapshot;
use crate::consts::{RIM_SHARPNESS, THRESHOLD};

/// Field value at pixel `p`: sum of `r² / d²` over all sources.
///
/// A pixel exactly on a center yields infinity.
pub fn potential(snapshot: &Snapshot, p: Vec2) -> f32 {
    snapshot
        .entries
        .iter()
        .map(|e| {
            let d = e.truncate() - p;
            (e.z * e.z) / d.length_squared()
        })
        .sum()
}

/// Whether a field value is inside a blob.
#[inline]
pub fn is_inside(sum: f32) -> bool {
    sum >= THRESHOLD
}

/// Color for a pixel with field value `sum`, as RGBA in `[0, 1]`.
///
/// Inside a blob the color blends from black at the threshold to the
/// position gradient `(x / width, y / height, 1)` within a thin rim.
pub fn shade(sum: f32, p: Vec2, size: Vec2) -> [f32; 4] {
    if !is_inside(sum) {
        return [0.0, 0.0, 0.0, 1.0];
    }
    let gradient = Vec3::new(p.x / size.x, p.y / size.y, 1.0);
    let weight = (1.0 - (sum - THRESHOLD) * RIM_SHARPNESS).clamp(0.0, 1.0);
    gradient.lerp(Vec3::ZERO, weight).extend(1.0).to_array()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn snapshot(entries: &[[f32; 3]]) -> Snapshot {
        Snapshot {
            entries: entries.iter().map(|e| Vec3::from_array(*e)).collect(),
        }
    }

    #[test]
    fn test_center_of_source_is_gradient_colored() {
        let snap = snapshot(&[[100.0, 100.0, 50.0]]);
        let p = Vec2::new(100.0, 100.0);
        let sum = potential(&snap, p);
        assert!(sum.is_infinite());
        assert!(is_inside(sum));

        let color = shade(sum, p, Vec2::new(400.0, 200.0));
        assert_eq!(color, [0.25, 0.5, 1.0, 1.0]);
    }

    #[test]
    fn test_far_pixel_is_black() {
        let snap = snapshot(&[[100.0, 100.0, 50.0]]);
        // r² / d² = 2500 / 3600 < 0.99
        let p = Vec2::new(160.0, 100.0);
        let sum = potential(&snap, p);
        assert!(!is_inside(sum));
        assert_eq!(shade(sum, p, Vec2::new(400.0, 400.0)), [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_rim_is_dark_at_threshold() {
        let p = Vec2::new(200.0, 100.0);
        let size = Vec2::new(400.0, 400.0);

        // Right at the threshold the blend is fully black
        assert_eq!(shade(THRESHOLD, p, size), [0.0, 0.0, 0.0, 1.0]);

        // Halfway through the rim
        let half = shade(THRESHOLD + 0.005, p, size);
        assert!((half[0] - 0.25).abs() < 1e-3);
        assert!((half[1] - 0.125).abs() < 1e-3);
        assert!((half[2] - 0.5).abs() < 1e-3);

        // Past the rim the gradient is pure
        assert_eq!(shade(THRESHOLD + 0.02, p, size), [0.5, 0.25, 1.0, 1.0]);
    }

    #[test]
    fn test_empty_field_is_black() {
        let snap = Snapshot::default();
        assert_eq!(potential(&snap, Vec2::new(10.0, 10.0)), 0.0);
    }

    proptest! {
        #[test]
        fn prop_swapping_sources_keeps_sum(
            a in prop::array::uniform3(1.0f32..500.0),
            b in prop::array::uniform3(1.0f32..500.0),
            px in 0.0f32..500.0,
            py in 0.0f32..500.0,
        ) {
            let p = Vec2::new(px, py);
            let forward = potential(&snapshot(&[a, b]), p);
            let swapped = potential(&snapshot(&[b, a]), p);
            if forward.is_finite() {
                prop_assert!((forward - swapped).abs() <= forward.abs() * 1e-6);
            } else {
                prop_assert_eq!(forward, swapped);
            }
        }
    }
}
