use bevy::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::{HASH_GRID_SCALE, HASH_GRID_SIZE};

/// Five independent pseudo-random values in `[0, 0.999)`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HexHash {
    /// Urban selection.
    pub a: f32,
    /// Farm selection.
    pub b: f32,
    /// Plant selection.
    pub c: f32,
    /// Variant choice.
    pub d: f32,
    /// Rotation and tower choice.
    pub e: f32,
}

impl HexHash {
    /// Draws the five values from `rng`.
    pub fn create<R: Rng>(rng: &mut R) -> Self {
        let mut next = || rng.gen_range(0.0f32..1.0) * 0.999;
        Self {
            a: next(),
            b: next(),
            c: next(),
            d: next(),
            e: next(),
        }
    }
}

/// Seeded `HASH_GRID_SIZE²` table of [`HexHash`] values addressed by world
/// position.
#[derive(Clone, Debug)]
pub struct HashGrid {
    hashes: Vec<HexHash>,
}

impl HashGrid {
    /// Generates the table from `seed`.
    ///
    /// `rng` is swapped for a stream seeded with `seed` while the table is
    /// filled and restored afterwards, so callers drawing from `rng` see the
    /// same sequence whether or not a hash grid was generated in between.
    pub fn generate(seed: u64, rng: &mut ChaCha8Rng) -> Self {
        let saved = std::mem::replace(rng, ChaCha8Rng::seed_from_u64(seed));
        let hashes = (0..HASH_GRID_SIZE * HASH_GRID_SIZE)
            .map(|_| HexHash::create(rng))
            .collect();
        *rng = saved;
        Self { hashes }
    }

    /// Hash of the slot containing `position`; the table wraps in both axes.
    pub fn sample(&self, position: Vec3) -> HexHash {
        let size = HASH_GRID_SIZE as i32;
        let x = ((position.x * HASH_GRID_SCALE) as i32).rem_euclid(size);
        let z = ((position.z * HASH_GRID_SCALE) as i32).rem_euclid(size);
        self.hashes[(x + z * size) as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_leaves_shared_stream_untouched() {
        let mut untouched = ChaCha8Rng::seed_from_u64(99);
        let mut shared = ChaCha8Rng::seed_from_u64(99);
        let _ = untouched.gen_range(0u32..1000);
        let _ = shared.gen_range(0u32..1000);

        let _grid = HashGrid::generate(1234, &mut shared);

        for _ in 0..16 {
            assert_eq!(shared.gen_range(0u32..1_000_000), untouched.gen_range(0u32..1_000_000));
        }
    }

    #[test]
    fn same_seed_same_table() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let a = HashGrid::generate(42, &mut rng);
        let b = HashGrid::generate(42, &mut rng);
        let p = Vec3::new(12.3, 0.0, 4.5);
        assert_eq!(a.sample(p), b.sample(p));
    }

    #[test]
    fn values_stay_below_one() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let grid = HashGrid::generate(7, &mut rng);
        for h in grid.hashes.iter().take(4096) {
            for v in [h.a, h.b, h.c, h.d, h.e] {
                assert!((0.0..0.999).contains(&v));
            }
        }
    }

    #[test]
    fn negative_positions_wrap() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let grid = HashGrid::generate(7, &mut rng);
        let span = HASH_GRID_SIZE as f32 / HASH_GRID_SCALE;
        let p = Vec3::new(-3.0, 0.0, -5.0);
        let q = p + Vec3::new(span, 0.0, span);
        assert_eq!(grid.sample(p), grid.sample(q));
    }
}
