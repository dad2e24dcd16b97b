use bevy::prelude::*;

use super::terrace_lerp;

/// Five points spanning one cell edge, from its first to its second corner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeVertices {
    /// First corner.
    pub v1: Vec3,
    /// Quarter point (or outer step).
    pub v2: Vec3,
    /// Midpoint.
    pub v3: Vec3,
    /// Three-quarter point (or one minus the outer step).
    pub v4: Vec3,
    /// Second corner.
    pub v5: Vec3,
}

impl EdgeVertices {
    /// Evenly spaced points between two corners.
    pub fn new(corner1: Vec3, corner2: Vec3) -> Self {
        Self::with_outer_step(corner1, corner2, 0.25)
    }

    /// Like [`Self::new`] but `v2`/`v4` sit `outer_step` in from the corners.
    pub fn with_outer_step(corner1: Vec3, corner2: Vec3, outer_step: f32) -> Self {
        Self {
            v1: corner1,
            v2: corner1.lerp(corner2, outer_step),
            v3: corner1.lerp(corner2, 0.5),
            v4: corner1.lerp(corner2, 1.0 - outer_step),
            v5: corner2,
        }
    }

    /// Applies [`terrace_lerp`] to every point.
    pub fn terrace_lerp(a: Self, b: Self, step: usize) -> Self {
        Self {
            v1: terrace_lerp(a.v1, b.v1, step),
            v2: terrace_lerp(a.v2, b.v2, step),
            v3: terrace_lerp(a.v3, b.v3, step),
            v4: terrace_lerp(a.v4, b.v4, step),
            v5: terrace_lerp(a.v5, b.v5, step),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::TERRACE_STEPS;

    #[test]
    fn even_spacing() {
        let e = EdgeVertices::new(Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0));
        let xs = [e.v1.x, e.v2.x, e.v3.x, e.v4.x, e.v5.x];
        assert_eq!(xs, [0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn outer_step_moves_inner_points() {
        let e = EdgeVertices::with_outer_step(Vec3::ZERO, Vec3::new(6.0, 0.0, 0.0), 1.0 / 6.0);
        assert!((e.v2.x - 1.0).abs() < 1e-5);
        assert!((e.v3.x - 3.0).abs() < 1e-5);
        assert!((e.v4.x - 5.0).abs() < 1e-5);
    }

    #[test]
    fn terrace_lerp_reaches_far_edge() {
        let a = EdgeVertices::new(Vec3::ZERO, Vec3::X);
        let b = EdgeVertices::new(Vec3::new(0.0, 1.0, 1.0), Vec3::new(1.0, 1.0, 1.0));
        let end = EdgeVertices::terrace_lerp(a, b, TERRACE_STEPS);
        assert!((end.v3 - b.v3).length() < 1e-5);
    }
}
