// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the message types which are exchanged with the snake driver.

use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use serde::Deserialize;
use serde::Serialize;

use crate::utils::N_JOINTS;

/// Cartesian velocity target of the end effector.
///
/// Only the linear part is tracked by the differential inverse kinematics, the angular part is
/// carried along for transports which always send full twists.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Default)]
pub struct Twist {
    /// Linear velocity in \[m/s\].
    pub linear: [f64; 3],
    /// Angular velocity in \[rad/s\]. Ignored by the driver.
    pub angular: [f64; 3],
}

impl Twist {
    /// Creates a twist with the given linear velocity and no angular velocity.
    pub fn from_linear(linear: [f64; 3]) -> Self {
        Twist {
            linear,
            angular: [0.; 3],
        }
    }

    /// Linear velocity as the task-space command of the differential inverse kinematics.
    pub fn linear_velocity(&self) -> Vector3<f64> {
        Vector3::from_column_slice(&self.linear)
    }
}

/// Position of the end effector in world frame in \[m\].
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Orientation of the end effector in world frame as quaternion.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct Orientation {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for Orientation {
    fn default() -> Self {
        Orientation::identity()
    }
}

impl Orientation {
    pub fn identity() -> Self {
        Orientation {
            x: 0.,
            y: 0.,
            z: 0.,
            w: 1.,
        }
    }

    pub fn norm(&self) -> f64 {
        f64::sqrt(self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite() && self.w.is_finite()
    }

    /// Returns the same rotation from the other hemisphere.
    pub fn negate(self) -> Self {
        Orientation {
            x: -self.x,
            y: -self.y,
            z: -self.z,
            w: -self.w,
        }
    }

    pub fn to_unit_quaternion(&self) -> UnitQuaternion<f64> {
        UnitQuaternion::from_quaternion(Quaternion::new(self.w, self.x, self.y, self.z))
    }
}

/// Pose of the end effector, published once per control cycle.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Default)]
pub struct Pose {
    pub position: Position,
    pub orientation: Orientation,
}

/// Request for moving every joint directly to the given angle, bypassing the inverse kinematics.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct JointStateRequest {
    /// One target angle per joint in \[rad\].
    pub joint_state: Vec<f64>,
}

impl From<[f64; N_JOINTS]> for JointStateRequest {
    fn from(joint_state: [f64; N_JOINTS]) -> Self {
        JointStateRequest {
            joint_state: joint_state.to_vec(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Default)]
pub struct JointStateResponse {
    pub success: bool,
}

/// Last received velocity and gain command.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Default)]
pub struct Command {
    pub twist: Twist,
    /// Gain of the secondary objective, never negative.
    pub gain: f64,
}
