//! Deterministic camera trajectories.
//!
//! Every pattern is a plain parameter struct implementing [`Pattern`]. Positions are rounded to
//! millimeters and angles to micro-radians so that two capture runs with the same parameters
//! visit bit-identical poses, which pixel-level differencing between runs depends on.

mod figure_eight;
mod grid;
mod lawnmower;
mod linear;
mod orbit;
mod random;
mod spiral;
mod square;

pub use figure_eight::FigureEightPattern;
pub use grid::GridPattern;
pub use lawnmower::LawnmowerPattern;
pub use linear::LinearPattern;
pub use orbit::OrbitPattern;
pub use random::RandomPattern;
pub use spiral::SpiralPattern;
pub use square::SquarePattern;

use crate::pose::{ANGULAR_DECIMALS, PoseSequence, round_to};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PatternError {
    #[error("{pattern} pattern does not support facing `{facing}`")]
    UnsupportedFacing { pattern: PatternKind, facing: Facing },
    #[error("invalid {name} for {pattern} pattern: {reason}")]
    InvalidParameter {
        pattern: PatternKind,
        name: &'static str,
        reason: String,
    },
    #[error("unknown pattern `{0}`")]
    UnknownPattern(String),
}

/// Produces an ordered sequence of camera poses.
pub trait Pattern {
    fn kind(&self) -> PatternKind;
    fn poses(&self) -> Result<PoseSequence, PatternError>;
}

/// How a pattern chooses the yaw of each pose.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    /// Point at the pattern's reference point.
    Center,
    /// Point along the direction of travel.
    Travel,
    /// Keep a yaw of zero.
    Fixed,
}

impl Facing {
    fn require(self, pattern: PatternKind, supported: &[Facing]) -> Result<Self, PatternError> {
        match supported.contains(&self) {
            true => Ok(self),
            false => Err(PatternError::UnsupportedFacing {
                pattern,
                facing: self,
            }),
        }
    }
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Facing::Center => "center",
            Facing::Travel => "travel",
            Facing::Fixed => "fixed",
        };
        f.write_str(name)
    }
}

/// Identifies one of the supported patterns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PatternKind {
    Orbit,
    Square,
    Lawnmower,
    Grid,
    Linear,
    FigureEight,
    Random,
    Spiral,
}

impl PatternKind {
    pub const ALL: [PatternKind; 8] = [
        PatternKind::Orbit,
        PatternKind::Square,
        PatternKind::Lawnmower,
        PatternKind::Grid,
        PatternKind::Linear,
        PatternKind::FigureEight,
        PatternKind::Random,
        PatternKind::Spiral,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PatternKind::Orbit => "orbit",
            PatternKind::Square => "square",
            PatternKind::Lawnmower => "lawnmower",
            PatternKind::Grid => "grid",
            PatternKind::Linear => "linear",
            PatternKind::FigureEight => "figure8",
            PatternKind::Random => "random",
            PatternKind::Spiral => "spiral",
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PatternKind {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PatternKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| PatternError::UnknownPattern(s.to_owned()))
    }
}

/// A pattern together with its parameters.
///
/// Serialized with a `pattern_type` tag so a dataset descriptor records exactly which trajectory
/// produced it. Missing parameters fall back to the stock preset of that pattern.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "pattern_type", rename_all = "snake_case")]
pub enum PatternSpec {
    Orbit(OrbitPattern),
    Square(SquarePattern),
    Lawnmower(LawnmowerPattern),
    Grid(GridPattern),
    Linear(LinearPattern),
    #[serde(rename = "figure8")]
    FigureEight(FigureEightPattern),
    Random(RandomPattern),
    Spiral(SpiralPattern),
}

impl PatternSpec {
    /// The stock preset for `kind`.
    pub fn example(kind: PatternKind) -> Self {
        match kind {
            PatternKind::Orbit => PatternSpec::Orbit(OrbitPattern::default()),
            PatternKind::Square => PatternSpec::Square(SquarePattern::default()),
            PatternKind::Lawnmower => PatternSpec::Lawnmower(LawnmowerPattern::default()),
            PatternKind::Grid => PatternSpec::Grid(GridPattern::default()),
            PatternKind::Linear => PatternSpec::Linear(LinearPattern::default()),
            PatternKind::FigureEight => PatternSpec::FigureEight(FigureEightPattern::default()),
            PatternKind::Random => PatternSpec::Random(RandomPattern::default()),
            PatternKind::Spiral => PatternSpec::Spiral(SpiralPattern::default()),
        }
    }

    fn as_pattern(&self) -> &dyn Pattern {
        match self {
            PatternSpec::Orbit(p) => p,
            PatternSpec::Square(p) => p,
            PatternSpec::Lawnmower(p) => p,
            PatternSpec::Grid(p) => p,
            PatternSpec::Linear(p) => p,
            PatternSpec::FigureEight(p) => p,
            PatternSpec::Random(p) => p,
            PatternSpec::Spiral(p) => p,
        }
    }
}

impl Pattern for PatternSpec {
    fn kind(&self) -> PatternKind {
        self.as_pattern().kind()
    }

    fn poses(&self) -> Result<PoseSequence, PatternError> {
        self.as_pattern().poses()
    }
}

/// Yaw of the ray from `from` towards `to`.
fn bearing(from: (f64, f64), to: (f64, f64)) -> f64 {
    (to.1 - from.1).atan2(to.0 - from.0)
}

/// Normalized progress of sample `i` out of `count`, from 0 to 1 inclusive.
fn progress(i: usize, count: usize) -> f64 {
    match count > 1 {
        true => round_to(i as f64 / (count - 1) as f64, ANGULAR_DECIMALS),
        false => 0.0,
    }
}
