use super::{Pattern, PatternError, PatternKind};
use crate::pose::{Pose, PoseSequence, round_angle, round_linear};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// A figure-eight traced by `x = sin t`, `y = sin 2t`, scaled to `width` by `height`.
///
/// The heading always follows the velocity of the curve.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FigureEightPattern {
    pub center: (f64, f64),
    pub altitude: f64,
    pub width: f64,
    pub height: f64,
    pub count: usize,
}

impl Default for FigureEightPattern {
    fn default() -> Self {
        Self {
            center: (0.0, 0.0),
            altitude: 40.0,
            width: 20.0,
            height: 15.0,
            count: 50,
        }
    }
}

impl Pattern for FigureEightPattern {
    fn kind(&self) -> PatternKind {
        PatternKind::FigureEight
    }

    fn poses(&self) -> Result<PoseSequence, PatternError> {
        let (cx, cy) = self.center;
        let (half_width, half_height) = (self.width / 2.0, self.height / 2.0);
        let altitude = round_linear(self.altitude);

        Ok((0..self.count)
            .map(|i| {
                let t = TAU * i as f64 / self.count as f64;
                let x = round_linear(cx + half_width * t.sin());
                let y = round_linear(cy + half_height * (2.0 * t).sin());

                // Derivative of the parametric curve with respect to t.
                let dx = half_width * t.cos();
                let dy = self.height * (2.0 * t).cos();
                Pose::at_altitude(x, y, altitude, round_angle(dy.atan2(dx)))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_4;

    #[test]
    fn starts_at_center_heading_up_and_right() {
        let poses = FigureEightPattern {
            width: 2.0,
            height: 1.0,
            count: 4,
            ..FigureEightPattern::default()
        }
        .poses()
        .unwrap();

        let first = poses.get(0).unwrap();
        assert_eq!((first.position().x(), first.position().y()), (0.0, 0.0));
        assert_eq!(first.yaw(), round_angle(FRAC_PI_4));
    }

    #[test]
    fn lobes_reach_half_width() {
        let poses = FigureEightPattern {
            width: 2.0,
            height: 1.0,
            count: 4,
            ..FigureEightPattern::default()
        }
        .poses()
        .unwrap();

        let xs: Vec<f64> = poses.iter().map(|p| p.position().x()).collect();
        assert_eq!(xs, vec![0.0, 1.0, 0.0, -1.0]);
    }

    #[test]
    fn has_exactly_count_poses() {
        assert_eq!(FigureEightPattern::default().poses().unwrap().len(), 50);
    }
}
