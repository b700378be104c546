use super::{Facing, Pattern, PatternError, PatternKind, bearing};
use crate::pose::{Pose, PoseSequence, round_angle, round_linear};
use serde::{Deserialize, Serialize};

/// A `rows` by `cols` lattice spanning `width` by `height` meters, visited row by row.
///
/// An axis with a single sample collapses onto the center. Supports [`Facing::Center`] and
/// [`Facing::Fixed`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridPattern {
    pub center: (f64, f64),
    pub altitude: f64,
    pub width: f64,
    pub height: f64,
    pub rows: usize,
    pub cols: usize,
    pub facing: Facing,
}

impl Default for GridPattern {
    fn default() -> Self {
        Self {
            center: (0.0, 0.0),
            altitude: 40.0,
            width: 30.0,
            height: 30.0,
            rows: 5,
            cols: 5,
            facing: Facing::Center,
        }
    }
}

/// Coordinate of sample `index` of `count` spread over `extent` around `center`.
fn lattice(center: f64, extent: f64, index: usize, count: usize) -> f64 {
    match count > 1 {
        true => round_linear(center - extent / 2.0 + index as f64 * extent / (count - 1) as f64),
        false => center,
    }
}

impl Pattern for GridPattern {
    fn kind(&self) -> PatternKind {
        PatternKind::Grid
    }

    fn poses(&self) -> Result<PoseSequence, PatternError> {
        let facing = self
            .facing
            .require(self.kind(), &[Facing::Center, Facing::Fixed])?;
        let center = (round_linear(self.center.0), round_linear(self.center.1));
        let altitude = round_linear(self.altitude);
        let width = round_linear(self.width);
        let height = round_linear(self.height);

        Ok((0..self.rows)
            .flat_map(|row| (0..self.cols).map(move |col| (row, col)))
            .map(|(row, col)| {
                let x = lattice(center.0, width, col, self.cols);
                let y = lattice(center.1, height, row, self.rows);
                let yaw = match facing {
                    Facing::Center => round_angle(bearing((x, y), center)),
                    _ => 0.0,
                };
                Pose::at_altitude(x, y, altitude, yaw)
            })
            .collect())
    }
}
