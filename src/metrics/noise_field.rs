use bevy::prelude::*;
use noise::{NoiseFn, Perlin};

use super::{INNER_RADIUS, NOISE_TILE_SIZE, OUTER_RADIUS};
use crate::math;

/// Spatial frequency of the Perlin source, in texels.
const FREQUENCY: f64 = 1.0 / 20.0;

/// Square RGBA table of Perlin samples in `[0, 1]`, tiled over the world.
///
/// Each channel samples the same Perlin source at a different texel offset so
/// the four channels are uncorrelated.
#[derive(Clone, Debug)]
pub struct NoiseField {
    resolution: usize,
    texels: Vec<Vec4>,
}

impl NoiseField {
    /// Resolution used by a default map.
    pub const DEFAULT_RESOLUTION: usize = 512;

    /// Fills a `resolution × resolution` table from a seeded Perlin source.
    pub fn generate(seed: u32, resolution: usize) -> Self {
        let resolution = resolution.max(2);
        let perlin = Perlin::new(seed);
        let size = resolution as f64;
        let channel = |x: usize, y: usize, k: f64| {
            let value = perlin.get([(x as f64 + k * size) * FREQUENCY, (y as f64 + k * size) * FREQUENCY]);
            math::map_noise_to_range(value, 0.0, 1.0).clamp(0.0, 1.0)
        };

        let mut texels = Vec::with_capacity(resolution * resolution);
        for y in 0..resolution {
            for x in 0..resolution {
                texels.push(Vec4::new(
                    channel(x, y, 0.0),
                    channel(x, y, 1.0),
                    channel(x, y, 2.0),
                    1.0,
                ));
            }
        }

        Self { resolution, texels }
    }

    /// Side length of the table.
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    fn texel(&self, x: usize, y: usize) -> Vec4 {
        self.texels[y * self.resolution + x]
    }

    /// Bilinear sample at a world position; the XZ plane wraps every
    /// [`NOISE_TILE_SIZE`] units and the table wraps with it, so the last
    /// column blends into the first.
    pub fn sample(&self, position: Vec3) -> Vec4 {
        let u = ((position.x + OUTER_RADIUS) / NOISE_TILE_SIZE).rem_euclid(1.0);
        let v = ((position.z + INNER_RADIUS) / NOISE_TILE_SIZE).rem_euclid(1.0);

        let size = self.resolution as f32;
        let px = (u * size - 0.5).rem_euclid(size);
        let py = (v * size - 0.5).rem_euclid(size);

        let x0 = px as usize % self.resolution;
        let x1 = (x0 + 1) % self.resolution;
        let y0 = py as usize % self.resolution;
        let y1 = (y0 + 1) % self.resolution;

        let s = px.fract();
        let t = py.fract();

        let c0 = self.texel(x0, y0).lerp(self.texel(x1, y0), s);
        let c1 = self.texel(x0, y1).lerp(self.texel(x1, y1), s);
        c0.lerp(c1, t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texels_are_normalized() {
        let field = NoiseField::generate(3, 32);
        assert_eq!(field.resolution(), 32);
        for t in &field.texels {
            for c in t.to_array() {
                assert!((0.0..=1.0).contains(&c));
            }
        }
    }

    #[test]
    fn same_seed_same_field() {
        let a = NoiseField::generate(9, 16);
        let b = NoiseField::generate(9, 16);
        assert_eq!(a.texels, b.texels);
    }

    #[test]
    fn sampling_wraps_every_tile() {
        let field = NoiseField::generate(5, 64);
        let p = Vec3::new(3.3, 0.0, 7.1);
        let q = p + Vec3::new(NOISE_TILE_SIZE, 0.0, NOISE_TILE_SIZE);
        assert!((field.sample(p) - field.sample(q)).length() < 1e-3);
    }

    #[test]
    fn tile_seam_is_continuous() {
        let field = NoiseField::generate(5, 64);
        let edge = Vec3::new(-OUTER_RADIUS, 0.0, 10.0);
        let before = edge - Vec3::new(0.001, 0.0, 0.0);
        let after = edge + Vec3::new(0.001, 0.0, 0.0);
        assert!((field.sample(before) - field.sample(after)).length() < 0.01);

        let edge = Vec3::new(10.0, 0.0, -INNER_RADIUS);
        let before = edge - Vec3::new(0.0, 0.0, 0.001);
        let after = edge + Vec3::new(0.0, 0.0, 0.001);
        assert!((field.sample(before) - field.sample(after)).length() < 0.01);
    }

    #[test]
    fn texel_centers_sample_exactly() {
        let field = NoiseField::generate(5, 16);
        let texel = NOISE_TILE_SIZE / 16.0;
        let p = Vec3::new(3.5 * texel - OUTER_RADIUS, 0.0, 7.5 * texel - INNER_RADIUS);
        assert!((field.sample(p) - field.texel(3, 7)).length() < 1e-3);
    }

    #[test]
    fn sampling_is_continuous() {
        let field = NoiseField::generate(5, 64);
        let p = Vec3::new(10.0, 0.0, 10.0);
        let q = p + Vec3::new(0.001, 0.0, 0.001);
        assert!((field.sample(p) - field.sample(q)).length() < 0.01);
    }
}
