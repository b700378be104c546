use super::{Facing, Pattern, PatternError, PatternKind, bearing, progress};
use crate::pose::{Pose, PoseSequence, round_angle, round_linear};
use serde::{Deserialize, Serialize};

/// Evenly spaced samples on the segment from `start` to `end`, both included.
///
/// Supports [`Facing::Travel`] and [`Facing::Fixed`]. A zero-length segment has a heading of 0.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearPattern {
    pub start: (f64, f64),
    pub end: (f64, f64),
    pub altitude: f64,
    pub count: usize,
    pub facing: Facing,
}

impl Default for LinearPattern {
    fn default() -> Self {
        Self {
            start: (-15.0, -15.0),
            end: (15.0, 15.0),
            altitude: 40.0,
            count: 20,
            facing: Facing::Travel,
        }
    }
}

impl Pattern for LinearPattern {
    fn kind(&self) -> PatternKind {
        PatternKind::Linear
    }

    fn poses(&self) -> Result<PoseSequence, PatternError> {
        let facing = self
            .facing
            .require(self.kind(), &[Facing::Travel, Facing::Fixed])?;
        let start = (round_linear(self.start.0), round_linear(self.start.1));
        let end = (round_linear(self.end.0), round_linear(self.end.1));
        let altitude = round_linear(self.altitude);
        let yaw = match facing {
            Facing::Travel => round_angle(bearing(start, end)),
            _ => 0.0,
        };

        Ok((0..self.count)
            .map(|i| {
                let t = progress(i, self.count);
                let x = round_linear(start.0 + t * (end.0 - start.0));
                let y = round_linear(start.1 + t * (end.1 - start.1));
                Pose::at_altitude(x, y, altitude, yaw)
            })
            .collect())
    }
}
