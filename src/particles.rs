use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

use crate::log; // macro import


/// Largest number of points a single cloud holds.
pub const MAX_POINTS: usize = 100_000;


/// Region a cloud's points are sampled from, centered on the cloud's origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CloudShape {
    /// Flat ring in the xz-plane with a vertical band.
    Annulus {
        r_min: f32,
        r_max: f32,
        y_min: f32,
        y_max: f32,
    },
    Box {
        min: [f32; 3],
        max: [f32; 3],
    },
    /// Spherical shell between `radius` and `radius + depth`.
    Shell {
        radius: f32,
        depth: f32,
    },
}

impl CloudShape {
    /// Distance bounds a generated point falls into, measured the way
    /// [`ParticleCloud::radial_distance`] does for this shape.
    pub fn radial_bounds(&self) -> Option<(f32, f32)> {
        match *self {
            CloudShape::Annulus { r_min, r_max, .. } => Some((r_min, r_max)),
            CloudShape::Shell { radius, depth } => Some((radius, radius + depth)),
            CloudShape::Box { .. } => None,
        }
    }

    fn sample<R: Rng>(&self, rng: &mut R) -> [f32; 3] {
        match *self {
            CloudShape::Annulus {
                r_min,
                r_max,
                y_min,
                y_max,
            } => {
                let angle = rng.gen::<f32>() * TAU;
                let radius = uniform(rng, r_min, r_max);
                [
                    angle.cos() * radius,
                    uniform(rng, y_min, y_max),
                    angle.sin() * radius,
                ]
            }
            CloudShape::Box { min, max } => [
                uniform(rng, min[0], max[0]),
                uniform(rng, min[1], max[1]),
                uniform(rng, min[2], max[2]),
            ],
            CloudShape::Shell { radius, depth } => {
                let r = uniform(rng, radius, radius + depth);
                let theta = (1.0 - rng.gen::<f32>() * 2.0).clamp(-1.0, 1.0).acos();
                let phi = rng.gen::<f32>() * TAU;
                let s = theta.sin();
                [r * s * phi.cos(), r * theta.cos(), r * s * phi.sin()]
            }
        }
    }
}


/// `lo + u * (hi - lo)` with `u` in `[0, 1)`, clamped so float rounding stays in range.
fn uniform<R: Rng>(rng: &mut R, lo: f32, hi: f32) -> f32 {
    let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
    (lo + rng.gen::<f32>() * (hi - lo)).clamp(lo, hi)
}


/// Fixed-size point set stored as a flat `[x, y, z, x, y, z, ...]` buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleCloud {
    pub shape: CloudShape,
    positions: Vec<f32>,
}

impl ParticleCloud {
    /// Samples `count` points from `shape`. Counts above [`MAX_POINTS`] are clamped.
    pub fn generate<R: Rng>(shape: CloudShape, count: usize, rng: &mut R) -> Self {
        if count > MAX_POINTS {
            log!(
                "ParticleCloud::generate(): WARNING: count={} clamped to {}",
                count,
                MAX_POINTS
            );
        }
        let count = count.min(MAX_POINTS);
        let mut positions = Vec::with_capacity(count * 3);
        for _ in 0..count {
            positions.extend_from_slice(&shape.sample(rng));
        }
        log!("ParticleCloud::generate(): shape={:?}, count={}", shape, count);

        Self { shape, positions }
    }

    pub fn len(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    pub fn point(&self, i: usize) -> [f32; 3] {
        [
            self.positions[i * 3],
            self.positions[i * 3 + 1],
            self.positions[i * 3 + 2],
        ]
    }

    pub fn points(&self) -> impl Iterator<Item = [f32; 3]> + '_ {
        self.positions.chunks_exact(3).map(|p| [p[0], p[1], p[2]])
    }

    /// Distance of point `i` from the generator's center: in the xz-plane for
    /// an annulus, in 3D otherwise.
    pub fn radial_distance(&self, i: usize) -> f32 {
        let [x, y, z] = self.point(i);
        match self.shape {
            CloudShape::Annulus { .. } => (x * x + z * z).sqrt(),
            _ => (x * x + y * y + z * z).sqrt(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const TOL: f32 = 1e-4;

    fn wind() -> CloudShape {
        CloudShape::Annulus {
            r_min: 0.12,
            r_max: 0.52,
            y_min: -0.14,
            y_max: 0.06,
        }
    }

    #[test]
    fn test_generates_exact_count() {
        let mut rng = StdRng::seed_from_u64(7);
        for count in [0, 1, 200, 3000] {
            let cloud = ParticleCloud::generate(wind(), count, &mut rng);
            assert_eq!(cloud.len(), count);
            assert_eq!(cloud.positions().len(), count * 3);
            assert_eq!(cloud.points().count(), count);
        }
        assert!(ParticleCloud::generate(wind(), 0, &mut rng).is_empty());
    }

    #[test]
    fn test_oversized_count_is_clamped() {
        let mut rng = StdRng::seed_from_u64(5);
        let cloud = ParticleCloud::generate(wind(), usize::MAX / 3 + 1, &mut rng);
        assert_eq!(cloud.len(), MAX_POINTS);
        assert_eq!(cloud.positions().len(), MAX_POINTS * 3);
    }

    #[test]
    fn test_annulus_radius_and_band() {
        let mut rng = StdRng::seed_from_u64(42);
        let cloud = ParticleCloud::generate(wind(), 500, &mut rng);
        for i in 0..cloud.len() {
            let r = cloud.radial_distance(i);
            assert!(r >= 0.12 - TOL && r <= 0.52 + TOL, "radius {} out of range", r);
            let y = cloud.point(i)[1];
            assert!((-0.14..=0.06).contains(&y));
        }
    }

    #[test]
    fn test_box_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        let shape = CloudShape::Box {
            min: [-6.0, 0.5, -6.0],
            max: [6.0, 3.0, 6.0],
        };
        let cloud = ParticleCloud::generate(shape, 300, &mut rng);
        assert_eq!(shape.radial_bounds(), None);
        for [x, y, z] in cloud.points() {
            assert!((-6.0..=6.0).contains(&x));
            assert!((0.5..=3.0).contains(&y));
            assert!((-6.0..=6.0).contains(&z));
        }
    }

    #[test]
    fn test_shell_distance() {
        let mut rng = StdRng::seed_from_u64(11);
        let shape = CloudShape::Shell {
            radius: 20.0,
            depth: 8.0,
        };
        let cloud = ParticleCloud::generate(shape, 1000, &mut rng);
        let (lo, hi) = shape.radial_bounds().unwrap();
        for i in 0..cloud.len() {
            let r = cloud.radial_distance(i);
            assert!(r >= lo - 1e-3 && r <= hi + 1e-3);
        }
    }

    #[test]
    fn test_same_seed_same_cloud() {
        let a = ParticleCloud::generate(wind(), 200, &mut StdRng::seed_from_u64(2024));
        let b = ParticleCloud::generate(wind(), 200, &mut StdRng::seed_from_u64(2024));
        let c = ParticleCloud::generate(wind(), 200, &mut StdRng::seed_from_u64(2025));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
