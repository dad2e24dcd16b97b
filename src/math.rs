//! Pure computation helpers extracted for testability.
//!
//! All functions in this module are free of Bevy ECS dependencies and operate
//! on plain numeric / `Vec3` inputs, making them straightforward to unit-test.

use bevy::prelude::Vec3;

/// Maps a noise value from the standard `[-1, 1]` range into `[min, max]`.
///
/// Noise generators (e.g. `Perlin`) produce values centred around zero.
/// This linearly rescales to an arbitrary output range.
///
/// # Examples
/// ```
/// # use hex_map::math::map_noise_to_range;
/// assert_eq!(map_noise_to_range(-1.0, 0.0, 10.0), 0.0);
/// assert_eq!(map_noise_to_range( 1.0, 0.0, 10.0), 10.0);
/// assert_eq!(map_noise_to_range( 0.0, 2.0, 6.0),  4.0);
/// ```
pub fn map_noise_to_range(noise_val: f64, min: f32, max: f32) -> f32 {
    min + ((noise_val as f32 + 1.0) / 2.0) * (max - min)
}

/// Computes the face normal of a triangle defined by three vertices.
///
/// Uses the cross product of edges `(v1 - v0)` and `(v2 - v0)`.
/// Returns `Vec3::ZERO` if the triangle is degenerate (collinear points).
pub fn compute_normal(v0: Vec3, v1: Vec3, v2: Vec3) -> Vec3 {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;
    edge1.cross(edge2).normalize_or_zero()
}

/// Ray/triangle intersection (Möller–Trumbore), double-sided.
///
/// Returns the distance along `direction` to the hit, or `None` when the ray
/// misses or the triangle lies behind the origin. `direction` need not be
/// normalized; the distance is in units of its length.
pub fn ray_triangle_intersection(origin: Vec3, direction: Vec3, triangle: [Vec3; 3]) -> Option<f32> {
    const EPSILON: f32 = 1e-7;
    let [v0, v1, v2] = triangle;
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;
    let p = direction.cross(edge2);
    let det = edge1.dot(p);
    if det.abs() < EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;
    let t_vec = origin - v0;
    let u = t_vec.dot(p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = t_vec.cross(edge1);
    let v = direction.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = edge2.dot(q) * inv_det;
    (t > EPSILON).then_some(t)
}

/// Point on the quadratic Bézier curve `a → b → c` at `t ∈ [0, 1]`.
pub fn quadratic_bezier(a: Vec3, b: Vec3, c: Vec3, t: f32) -> Vec3 {
    let r = 1.0 - t;
    a * (r * r) + b * (2.0 * r * t) + c * (t * t)
}

/// Rotation about +Y that turns local +Z toward `direction` (height ignored).
pub fn yaw_towards(direction: Vec3) -> f32 {
    direction.x.atan2(direction.z)
}

/// Position along a smoothed walk through `path` at `t ∈ [0, path.len()]`.
///
/// Each cell contributes one Bézier segment running from the midpoint of the
/// previous step, bent through the cell's center, to the midpoint of the next
/// step. The walk starts and ends exactly on the first and last points.
pub fn travel_point(path: &[Vec3], t: f32) -> Option<Vec3> {
    let last = path.len().checked_sub(1)?;
    let t = t.clamp(0.0, path.len() as f32);
    let segment = (t.floor() as usize).min(last);
    let b = path[segment];
    let a = if segment == 0 { b } else { (path[segment - 1] + b) * 0.5 };
    let c = if segment == last { b } else { (b + path[segment + 1]) * 0.5 };
    Some(quadratic_bezier(a, b, c, t - segment as f32))
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── map_noise_to_range ──────────────────────────────────────────

    #[test]
    fn noise_min_maps_to_range_min() {
        assert_eq!(map_noise_to_range(-1.0, 0.0, 10.0), 0.0);
    }

    #[test]
    fn noise_max_maps_to_range_max() {
        assert_eq!(map_noise_to_range(1.0, 0.0, 10.0), 10.0);
    }

    #[test]
    fn noise_zero_maps_to_midpoint() {
        let result = map_noise_to_range(0.0, 2.0, 6.0);
        assert!((result - 4.0).abs() < 1e-6);
    }

    // ── compute_normal ──────────────────────────────────────────────

    #[test]
    fn normal_of_xy_plane_triangle() {
        let n = compute_normal(Vec3::ZERO, Vec3::X, Vec3::Y);
        // Cross of X × Y = Z
        assert!((n - Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn normal_of_xz_plane_triangle() {
        let n = compute_normal(Vec3::ZERO, Vec3::X, Vec3::Z);
        // Cross of X × Z = -Y
        assert!((n - Vec3::NEG_Y).length() < 1e-6);
    }

    #[test]
    fn degenerate_triangle_returns_zero() {
        let n = compute_normal(Vec3::ZERO, Vec3::X, Vec3::X * 2.0);
        assert_eq!(n, Vec3::ZERO);
    }

    // ── ray_triangle_intersection ───────────────────────────────────

    const GROUND: [Vec3; 3] = [
        Vec3::new(-1.0, 0.0, -1.0),
        Vec3::new(1.0, 0.0, -1.0),
        Vec3::new(0.0, 0.0, 1.0),
    ];

    #[test]
    fn ray_hits_triangle_from_above() {
        let t = ray_triangle_intersection(Vec3::new(0.0, 5.0, 0.0), Vec3::NEG_Y, GROUND).unwrap();
        assert!((t - 5.0).abs() < 1e-5);
    }

    #[test]
    fn ray_hits_back_face() {
        let t = ray_triangle_intersection(Vec3::new(0.0, -2.0, 0.0), Vec3::Y, GROUND);
        assert!(t.is_some());
    }

    #[test]
    fn ray_misses_outside_triangle() {
        assert!(ray_triangle_intersection(Vec3::new(3.0, 5.0, 0.0), Vec3::NEG_Y, GROUND).is_none());
    }

    #[test]
    fn ray_pointing_away_misses() {
        assert!(ray_triangle_intersection(Vec3::new(0.0, 5.0, 0.0), Vec3::Y, GROUND).is_none());
    }

    #[test]
    fn parallel_ray_misses() {
        assert!(ray_triangle_intersection(Vec3::new(0.0, 0.0, -5.0), Vec3::Z, GROUND).is_none());
    }

    // ── quadratic_bezier ────────────────────────────────────────────

    #[test]
    fn bezier_hits_endpoints() {
        let a = Vec3::ZERO;
        let b = Vec3::new(1.0, 2.0, 0.0);
        let c = Vec3::new(2.0, 0.0, 0.0);
        assert_eq!(quadratic_bezier(a, b, c, 0.0), a);
        assert_eq!(quadratic_bezier(a, b, c, 1.0), c);
        assert!((quadratic_bezier(a, b, c, 0.5) - Vec3::new(1.0, 1.0, 0.0)).length() < 1e-6);
    }

    // ── yaw_towards ─────────────────────────────────────────────────

    #[test]
    fn yaw_of_forward_is_zero() {
        assert_eq!(yaw_towards(Vec3::Z), 0.0);
        assert!((yaw_towards(Vec3::X) - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }

    // ── travel_point ────────────────────────────────────────────────

    #[test]
    fn travel_starts_and_ends_on_path() {
        let path = [Vec3::ZERO, Vec3::X, Vec3::new(1.0, 0.0, 1.0)];
        assert_eq!(travel_point(&path, 0.0), Some(Vec3::ZERO));
        assert_eq!(travel_point(&path, 3.0), Some(path[2]));
        assert_eq!(travel_point(&path, 10.0), Some(path[2]));
        assert_eq!(travel_point(&[], 0.5), None);
    }

    #[test]
    fn travel_passes_step_midpoints() {
        let path = [Vec3::ZERO, Vec3::X, Vec3::new(2.0, 0.0, 0.0)];
        let p = travel_point(&path, 1.0).unwrap();
        assert!((p - Vec3::new(0.5, 0.0, 0.0)).length() < 1e-6);
        let p = travel_point(&path, 2.0).unwrap();
        assert!((p - Vec3::new(1.5, 0.0, 0.0)).length() < 1e-6);
    }
}
