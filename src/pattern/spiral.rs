use super::{Pattern, PatternError, PatternKind, progress};
use crate::pose::{Pose, PoseSequence, round_angle, round_linear};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, TAU};

/// An Archimedean spiral growing from the center out to `max_radius` over `rotations` turns.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpiralPattern {
    pub center: (f64, f64),
    pub altitude: f64,
    pub max_radius: f64,
    pub count: usize,
    pub rotations: f64,
}

impl Default for SpiralPattern {
    fn default() -> Self {
        Self {
            center: (0.0, 0.0),
            altitude: 40.0,
            max_radius: 20.0,
            count: 40,
            rotations: 3.0,
        }
    }
}

impl Pattern for SpiralPattern {
    fn kind(&self) -> PatternKind {
        PatternKind::Spiral
    }

    fn poses(&self) -> Result<PoseSequence, PatternError> {
        let (cx, cy) = self.center;
        let altitude = round_linear(self.altitude);

        Ok((0..self.count)
            .map(|i| {
                let t = progress(i, self.count);
                let theta = self.rotations * TAU * t;
                let radius = self.max_radius * t;
                let x = round_linear(cx + radius * theta.cos());
                let y = round_linear(cy + radius * theta.sin());
                Pose::at_altitude(x, y, altitude, round_angle(theta + FRAC_PI_2))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spiral(count: usize) -> SpiralPattern {
        SpiralPattern {
            max_radius: 10.0,
            count,
            rotations: 1.0,
            ..SpiralPattern::default()
        }
    }

    #[test]
    fn starts_at_center_and_ends_on_rim() {
        let poses = spiral(5).poses().unwrap();
        let first = poses.get(0).unwrap();
        let last = poses.get(4).unwrap();
        assert_eq!((first.position().x(), first.position().y()), (0.0, 0.0));
        assert_eq!((last.position().x(), last.position().y()), (10.0, 0.0));
        assert_eq!(first.yaw(), round_angle(FRAC_PI_2));
    }

    #[test]
    fn radius_grows_monotonically() {
        let poses = spiral(20).poses().unwrap();
        let radii: Vec<f64> = poses
            .iter()
            .map(|p| p.position().x().hypot(p.position().y()))
            .collect();
        assert!(radii.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn single_sample_sits_at_center() {
        let poses = spiral(1).poses().unwrap();
        assert_eq!(poses.len(), 1);
        assert_eq!(poses.get(0).unwrap().position().x(), 0.0);
    }
}
