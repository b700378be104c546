use nalgebra::UnitQuaternion;
use serde::{Deserialize, Serialize};

/// Decimal places kept for linear quantities in meters.
pub const LINEAR_DECIMALS: i32 = 3;

/// Decimal places kept for angular quantities in radians.
pub const ANGULAR_DECIMALS: i32 = 6;

/// Round `value` to `decimals` decimal places, ties to even.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round_ties_even() / scale
}

pub(crate) fn round_linear(value: f64) -> f64 {
    round_to(value, LINEAR_DECIMALS)
}

pub(crate) fn round_angle(value: f64) -> f64 {
    round_to(value, ANGULAR_DECIMALS)
}

/// A point in the simulator's local frame.
///
/// Units are meters. The Z axis points down, so a camera flying above the
/// ground has a negative `z`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    x: f64,
    y: f64,
    z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn z(&self) -> f64 {
        self.z
    }

    /// Height above the ground plane as `|z|`, so either sign convention for `z` reads the same.
    pub fn altitude(&self) -> f64 {
        self.z.abs()
    }
}

/// Roll, pitch and yaw of a camera.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EulerAngles {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl EulerAngles {
    pub fn to_degrees(self) -> Self {
        Self {
            roll: self.roll.to_degrees(),
            pitch: self.pitch.to_degrees(),
            yaw: self.yaw.to_degrees(),
        }
    }
}

/// A camera viewpoint: position plus heading.
///
/// Generated poses only ever carry a yaw; roll and pitch are zero.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    position: Position,

    /// Heading in radians, counter-clockwise from +X.
    yaw: f64,
}

impl Pose {
    pub fn new(position: Position, yaw: f64) -> Self {
        Self { position, yaw }
    }

    /// Create a pose hovering `altitude` meters above `(x, y)`.
    pub fn at_altitude(x: f64, y: f64, altitude: f64, yaw: f64) -> Self {
        Self::new(Position::new(x, y, -altitude), yaw)
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn yaw(&self) -> f64 {
        self.yaw
    }

    pub fn pitch(&self) -> f64 {
        0.0
    }

    pub fn roll(&self) -> f64 {
        0.0
    }

    pub fn euler_angles(&self) -> EulerAngles {
        EulerAngles {
            roll: self.roll(),
            pitch: self.pitch(),
            yaw: self.yaw,
        }
    }

    /// Orientation as a unit quaternion using the Z-Y-X convention.
    pub fn quaternion(&self) -> UnitQuaternion<f64> {
        UnitQuaternion::from_euler_angles(self.roll(), self.pitch(), self.yaw)
    }
}

/// An ordered list of poses.
///
/// The index of a pose is its capture order and doubles as the key that
/// names the image captured there.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoseSequence {
    poses: Vec<Pose>,
}

impl PoseSequence {
    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Pose> {
        self.poses.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Pose> {
        self.poses.iter()
    }

    pub fn as_slice(&self) -> &[Pose] {
        &self.poses
    }

    pub fn into_vec(self) -> Vec<Pose> {
        self.poses
    }
}

impl From<Vec<Pose>> for PoseSequence {
    fn from(poses: Vec<Pose>) -> Self {
        Self { poses }
    }
}

impl FromIterator<Pose> for PoseSequence {
    fn from_iter<I: IntoIterator<Item = Pose>>(iter: I) -> Self {
        Self {
            poses: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for PoseSequence {
    type Item = Pose;
    type IntoIter = std::vec::IntoIter<Pose>;

    fn into_iter(self) -> Self::IntoIter {
        self.poses.into_iter()
    }
}

impl<'a> IntoIterator for &'a PoseSequence {
    type Item = &'a Pose;
    type IntoIter = std::slice::Iter<'a, Pose>;

    fn into_iter(self) -> Self::IntoIter {
        self.poses.iter()
    }
}
