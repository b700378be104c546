use super::{Facing, Pattern, PatternError, PatternKind, progress};
use crate::pose::{Pose, PoseSequence, round_angle, round_linear};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Row length covered by one sample along a sweep.
///
/// Independent of `spacing`; sweeps keep this density whatever the row pitch is.
const SAMPLE_DISTANCE: f64 = 2.0;

/// Back-and-forth coverage of a rectangle.
///
/// Rows run parallel to the X axis, starting at the lower Y bound and advancing by `spacing`
/// until the row coordinate passes the upper bound. Even rows sweep towards +X and odd rows back
/// towards -X. Supports [`Facing::Travel`] and [`Facing::Fixed`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LawnmowerPattern {
    pub x_bounds: (f64, f64),
    pub y_bounds: (f64, f64),
    pub altitude: f64,
    pub spacing: f64,
    pub facing: Facing,
}

impl Default for LawnmowerPattern {
    fn default() -> Self {
        Self {
            x_bounds: (-20.0, 20.0),
            y_bounds: (-20.0, 20.0),
            altitude: 40.0,
            spacing: 5.0,
            facing: Facing::Travel,
        }
    }
}

/// Largest magnitude accepted for a bound, in meters.
///
/// Keeps every millimeter position exactly representable.
const MAX_COORDINATE: f64 = 1e9;

/// Largest number of poses a single sweep may produce.
const MAX_POSES: usize = 1 << 24;

/// `value` in whole millimeters, saturating outside the `i64` range.
fn millimeters(value: f64) -> i64 {
    (value * 1000.0).round_ties_even() as i64
}

/// Row layout of a validated sweep, in millimeters.
struct Sweep {
    first_row: i64,
    spacing: i64,
    rows: usize,
    samples_per_row: usize,
}

impl LawnmowerPattern {
    fn invalid(&self, name: &'static str, reason: impl Into<String>) -> PatternError {
        PatternError::InvalidParameter {
            pattern: self.kind(),
            name,
            reason: reason.into(),
        }
    }

    fn check_bounds(&self, name: &'static str, (lo, hi): (f64, f64)) -> Result<(), PatternError> {
        if !lo.is_finite() || !hi.is_finite() {
            return Err(self.invalid(name, "bounds must be finite"));
        }
        if lo.abs() > MAX_COORDINATE || hi.abs() > MAX_COORDINATE {
            return Err(self.invalid(
                name,
                format!("bounds must lie within ±{MAX_COORDINATE} m, got ({lo}, {hi})"),
            ));
        }
        Ok(())
    }

    /// Validate the parameters and count rows and samples up front.
    ///
    /// Rows are stepped in whole millimeters, so the sweep always ends once a row passes the
    /// upper Y bound.
    fn sweep(&self) -> Result<Sweep, PatternError> {
        self.check_bounds("x_bounds", self.x_bounds)?;
        self.check_bounds("y_bounds", self.y_bounds)?;

        // Checked after rounding so a sub-millimeter spacing cannot stall the sweep.
        if !self.spacing.is_finite() || millimeters(self.spacing) <= 0 {
            return Err(self.invalid(
                "spacing",
                format!("expected a positive spacing but got {}", self.spacing),
            ));
        }
        let spacing = millimeters(self.spacing);

        let (first_row, last_row) = (millimeters(self.y_bounds.0), millimeters(self.y_bounds.1));
        let rows = match last_row >= first_row {
            true => ((last_row - first_row) / spacing + 1) as usize,
            false => 0,
        };

        let samples_per_row =
            row_samples(round_linear((self.x_bounds.1 - self.x_bounds.0).abs()));
        if samples_per_row > MAX_POSES {
            return Err(self.invalid(
                "x_bounds",
                format!("a row would hold {samples_per_row} samples, more than {MAX_POSES}"),
            ));
        }
        if rows.checked_mul(samples_per_row).is_none_or(|n| n > MAX_POSES) {
            return Err(self.invalid(
                "y_bounds",
                format!("{rows} rows of {samples_per_row} samples exceed {MAX_POSES} poses"),
            ));
        }

        Ok(Sweep {
            first_row,
            spacing,
            rows,
            samples_per_row,
        })
    }
}

/// Samples along a row of `length` meters, never fewer than both end points.
fn row_samples(length: f64) -> usize {
    ((length / SAMPLE_DISTANCE).round_ties_even() as usize).max(2)
}

impl Pattern for LawnmowerPattern {
    fn kind(&self) -> PatternKind {
        PatternKind::Lawnmower
    }

    fn poses(&self) -> Result<PoseSequence, PatternError> {
        let facing = self
            .facing
            .require(self.kind(), &[Facing::Travel, Facing::Fixed])?;
        let sweep = self.sweep()?;

        let (min_x, max_x) = (round_linear(self.x_bounds.0), round_linear(self.x_bounds.1));
        let altitude = round_linear(self.altitude);
        let count = sweep.samples_per_row;

        let mut poses = Vec::with_capacity(sweep.rows * count);
        for row in 0..sweep.rows {
            let y = (sweep.first_row + row as i64 * sweep.spacing) as f64 / 1000.0;

            let (x_start, x_end, heading) = match row % 2 == 0 {
                true => (min_x, max_x, 0.0),
                false => (max_x, min_x, round_angle(PI)),
            };
            let yaw = match facing {
                Facing::Travel => heading,
                _ => 0.0,
            };

            poses.extend((0..count).map(|i| {
                let x = round_linear(x_start + progress(i, count) * (x_end - x_start));
                Pose::at_altitude(x, y, altitude, yaw)
            }));
        }

        Ok(poses.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::round_to;
    use rstest::rstest;

    fn lawnmower(spacing: f64, facing: Facing) -> LawnmowerPattern {
        LawnmowerPattern {
            x_bounds: (-20.0, 20.0),
            y_bounds: (-20.0, 20.0),
            altitude: 40.0,
            spacing,
            facing,
        }
    }

    fn rows(poses: &PoseSequence) -> Vec<(f64, f64)> {
        let mut rows: Vec<(f64, f64)> = Vec::new();
        for pose in poses {
            let row = (pose.position().y(), pose.yaw());
            if rows.last() != Some(&row) {
                rows.push(row);
            }
        }
        rows
    }

    #[test]
    fn rows_advance_by_spacing_and_alternate_heading() {
        let poses = lawnmower(4.0, Facing::Travel).poses().unwrap();
        let rows = rows(&poses);

        assert_eq!(rows.len(), 11);
        assert_eq!(poses.len(), 11 * 20);
        for pair in rows.windows(2) {
            assert_eq!(pair[1].0 - pair[0].0, 4.0);
        }
        for (i, (_, yaw)) in rows.iter().enumerate() {
            let expected = match i % 2 {
                0 => 0.0,
                _ => round_to(PI, 6),
            };
            assert_eq!(*yaw, expected);
        }
    }

    #[test]
    fn rows_sweep_back_and_forth() {
        let poses = lawnmower(40.0, Facing::Travel).poses().unwrap();
        let xs: Vec<f64> = poses.iter().map(|p| p.position().x()).collect();
        assert_eq!(xs.len(), 40);
        assert_eq!((xs[0], xs[19]), (-20.0, 20.0));
        assert_eq!((xs[20], xs[39]), (20.0, -20.0));
    }

    #[test]
    fn fixed_facing_keeps_zero_yaw() {
        let poses = lawnmower(10.0, Facing::Fixed).poses().unwrap();
        assert!(poses.iter().all(|p| p.yaw() == 0.0));
    }

    #[rstest]
    #[case(0.0)]
    #[case(-4.0)]
    #[case(0.0004)]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    fn non_positive_spacing_is_rejected(#[case] spacing: f64) {
        assert!(matches!(
            lawnmower(spacing, Facing::Travel).poses(),
            Err(PatternError::InvalidParameter { name: "spacing", .. })
        ));
    }

    #[test]
    fn last_row_stays_below_upper_bound() {
        let poses = lawnmower(3.0, Facing::Travel).poses().unwrap();
        let ys: Vec<f64> = rows(&poses).iter().map(|(y, _)| *y).collect();
        assert_eq!(ys.len(), 14);
        assert_eq!(ys.first(), Some(&-20.0));
        assert_eq!(ys.last(), Some(&19.0));
    }

    #[test]
    fn inverted_y_bounds_yield_no_rows() {
        let pattern = LawnmowerPattern {
            y_bounds: (5.0, -5.0),
            ..lawnmower(1.0, Facing::Travel)
        };
        assert!(pattern.poses().unwrap().is_empty());
    }

    #[test]
    fn far_from_origin_rows_still_terminate() {
        let pattern = LawnmowerPattern {
            x_bounds: (0.0, 0.0),
            y_bounds: (1e8, 1e8 + 64.0),
            ..lawnmower(1.0, Facing::Travel)
        };
        let poses = pattern.poses().unwrap();
        let ys: Vec<f64> = rows(&poses).iter().map(|(y, _)| *y).collect();
        assert_eq!(ys.len(), 65);
        assert_eq!(ys.last(), Some(&(1e8 + 64.0)));
        assert_eq!(poses.len(), 65 * 2);
    }

    #[rstest]
    #[case((-20.0, 20.0), (1e17, 1e17 + 64.0), "y_bounds")]
    #[case((-1e30, 1e30), (0.0, 0.0), "x_bounds")]
    #[case((f64::NEG_INFINITY, 0.0), (0.0, 0.0), "x_bounds")]
    #[case((0.0, 0.0), (0.0, f64::NAN), "y_bounds")]
    #[case((-1e8, 1e8), (0.0, 0.0), "x_bounds")]
    #[case((-20.0, 20.0), (-1e8, 1e8), "y_bounds")]
    fn oversized_or_invalid_bounds_are_rejected(
        #[case] x_bounds: (f64, f64),
        #[case] y_bounds: (f64, f64),
        #[case] expected: &str,
    ) {
        let pattern = LawnmowerPattern {
            x_bounds,
            y_bounds,
            ..lawnmower(1.0, Facing::Travel)
        };
        match pattern.poses() {
            Err(PatternError::InvalidParameter { name, .. }) => assert_eq!(name, expected),
            other => panic!("expected {expected} to be rejected, got {other:?}"),
        }
    }

    #[rstest]
    #[case(0.0, 2)]
    #[case(3.0, 2)]
    #[case(5.0, 2)]
    #[case(7.0, 4)]
    #[case(40.0, 20)]
    fn row_sample_count(#[case] length: f64, #[case] count: usize) {
        assert_eq!(row_samples(length), count);
    }

    #[test]
    fn single_column_area_still_has_two_samples_per_row() {
        let pattern = LawnmowerPattern {
            x_bounds: (3.0, 3.0),
            ..lawnmower(1.0, Facing::Travel)
        };
        let poses = pattern.poses().unwrap();
        assert_eq!(poses.len(), 41 * 2);
        assert!(poses.iter().all(|p| p.position().x() == 3.0));
    }
}
