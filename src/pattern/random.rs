use super::{Pattern, PatternError, PatternKind};
use crate::pose::{Pose, PoseSequence, round_angle, round_linear};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Viewpoints drawn uniformly from a disk, each with a uniformly random heading.
///
/// With a `seed` the sequence is reproducible. Without one the generator is seeded from the
/// operating system and every call yields a different sequence.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomPattern {
    pub center: (f64, f64),
    pub altitude: f64,
    pub radius: f64,
    pub count: usize,
    pub seed: Option<u64>,
}

impl Default for RandomPattern {
    fn default() -> Self {
        Self {
            center: (0.0, 0.0),
            altitude: 40.0,
            radius: 20.0,
            count: 25,
            seed: Some(42),
        }
    }
}

impl RandomPattern {
    fn rng(&self) -> ChaCha8Rng {
        match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_os_rng(),
        }
    }
}

impl Pattern for RandomPattern {
    fn kind(&self) -> PatternKind {
        PatternKind::Random
    }

    fn poses(&self) -> Result<PoseSequence, PatternError> {
        let (cx, cy) = self.center;
        let altitude = round_linear(self.altitude);
        let mut rng = self.rng();

        Ok((0..self.count)
            .map(|_| {
                let angle = rng.random_range(0.0..TAU);
                // The square root keeps the density uniform over the disk's area.
                let r = self.radius * rng.random::<f64>().sqrt();
                let yaw = rng.random_range(0.0..TAU);

                let x = round_linear(cx + r * angle.cos());
                let y = round_linear(cy + r * angle.sin());
                Pose::at_altitude(x, y, altitude, round_angle(yaw))
            })
            .collect())
    }
}
