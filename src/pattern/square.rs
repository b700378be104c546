use super::{Facing, Pattern, PatternError, PatternKind, bearing};
use crate::pose::{Pose, PoseSequence, round_angle, round_linear};
use serde::{Deserialize, Serialize};

/// Visits the corners of a square counter-clockwise, starting bottom-left.
///
/// Each edge is sampled `points_per_side` times starting at its first corner. The last sample of
/// the closing edge is dropped, so the pattern yields `4 * points_per_side - 1` poses.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SquarePattern {
    pub center: (f64, f64),
    pub altitude: f64,
    pub side_length: f64,
    pub points_per_side: usize,
    pub facing: Facing,
}

impl Default for SquarePattern {
    fn default() -> Self {
        Self {
            center: (0.0, 0.0),
            altitude: 40.0,
            side_length: 30.0,
            points_per_side: 8,
            facing: Facing::Center,
        }
    }
}

impl SquarePattern {
    fn corners(&self) -> [(f64, f64); 4] {
        let (cx, cy) = self.center;
        let half = self.side_length / 2.0;
        [
            (cx - half, cy - half),
            (cx + half, cy - half),
            (cx + half, cy + half),
            (cx - half, cy + half),
        ]
    }
}

impl Pattern for SquarePattern {
    fn kind(&self) -> PatternKind {
        PatternKind::Square
    }

    fn poses(&self) -> Result<PoseSequence, PatternError> {
        let facing = self.facing.require(
            self.kind(),
            &[Facing::Center, Facing::Travel, Facing::Fixed],
        )?;
        let per_side = self.points_per_side;
        let corners = self.corners();
        let altitude = round_linear(self.altitude);

        Ok((0..corners.len())
            .flat_map(|edge| (0..per_side).map(move |j| (edge, j)))
            .filter(|&(edge, j)| !(edge == corners.len() - 1 && j + 1 == per_side))
            .map(|(edge, j)| {
                let start = corners[edge];
                let end = corners[(edge + 1) % corners.len()];
                let t = j as f64 / per_side as f64;
                let x = round_linear(start.0 + t * (end.0 - start.0));
                let y = round_linear(start.1 + t * (end.1 - start.1));
                let yaw = match facing {
                    Facing::Center => round_angle(bearing((x, y), self.center)),
                    Facing::Travel => round_angle(bearing(start, end)),
                    Facing::Fixed => 0.0,
                };
                Pose::at_altitude(x, y, altitude, yaw)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn square(points_per_side: usize, facing: Facing) -> SquarePattern {
        SquarePattern {
            center: (0.0, 0.0),
            altitude: 10.0,
            side_length: 2.0,
            points_per_side,
            facing,
        }
    }

    #[rstest]
    #[case(1, 3)]
    #[case(2, 7)]
    #[case(8, 31)]
    #[case(0, 0)]
    fn length_is_four_sides_minus_one(#[case] per_side: usize, #[case] len: usize) {
        assert_eq!(square(per_side, Facing::Center).poses().unwrap().len(), len);
    }

    #[test]
    fn travel_heading_follows_edges() {
        let yaws: Vec<f64> = square(2, Facing::Travel)
            .poses()
            .unwrap()
            .iter()
            .map(Pose::yaw)
            .collect();
        assert_eq!(
            yaws,
            vec![0.0, 0.0, 1.570796, 1.570796, 3.141593, 3.141593, -1.570796]
        );
    }

    #[test]
    fn first_pose_faces_center_from_corner() {
        let poses = square(2, Facing::Center).poses().unwrap();
        let first = poses.get(0).unwrap();
        assert_eq!((first.position().x(), first.position().y()), (-1.0, -1.0));
        assert_eq!(first.yaw(), 0.785398);
    }
}
