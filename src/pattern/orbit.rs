use super::{Facing, Pattern, PatternError, PatternKind, bearing};
use crate::pose::{Pose, PoseSequence, round_angle, round_linear};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, TAU};

/// A circular orbit at constant altitude.
///
/// Supports [`Facing::Center`] and [`Facing::Travel`], the latter being the tangent of a
/// counter-clockwise orbit.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitPattern {
    pub center: (f64, f64),
    pub altitude: f64,
    pub radius: f64,
    pub count: usize,
    pub facing: Facing,
}

impl Default for OrbitPattern {
    fn default() -> Self {
        Self {
            center: (0.0, 0.0),
            altitude: 40.0,
            radius: 15.0,
            count: 36,
            facing: Facing::Center,
        }
    }
}

impl Pattern for OrbitPattern {
    fn kind(&self) -> PatternKind {
        PatternKind::Orbit
    }

    fn poses(&self) -> Result<PoseSequence, PatternError> {
        let facing = self
            .facing
            .require(self.kind(), &[Facing::Center, Facing::Travel])?;
        let center = (round_linear(self.center.0), round_linear(self.center.1));
        let altitude = round_linear(self.altitude);
        let radius = round_linear(self.radius);

        Ok((0..self.count)
            .map(|i| {
                let theta = round_angle(TAU * i as f64 / self.count as f64);
                let x = round_linear(center.0 + radius * theta.cos());
                let y = round_linear(center.1 + radius * theta.sin());
                let yaw = match facing {
                    Facing::Center => round_angle(bearing((x, y), center)),
                    _ => round_angle(theta + FRAC_PI_2),
                };
                Pose::at_altitude(x, y, altitude, yaw)
            })
            .collect())
    }
}
