// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the kinematic model contract and the default snake model.
use crate::utils::{Matrix3x7, Vector7};
use std::fmt;

mod snake_model;

pub use snake_model::SnakeModel;

/// Enumerates the seven joints and the end effector of the snake.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Frame {
    Joint1,
    Joint2,
    Joint3,
    Joint4,
    Joint5,
    Joint6,
    Joint7,
    EndEffector,
}

impl Frame {
    /// Index of the joint the frame belongs to, `None` for the end effector.
    pub fn joint_index(&self) -> Option<usize> {
        match self {
            Frame::Joint1 => Some(0),
            Frame::Joint2 => Some(1),
            Frame::Joint3 => Some(2),
            Frame::Joint4 => Some(3),
            Frame::Joint5 => Some(4),
            Frame::Joint6 => Some(5),
            Frame::Joint7 => Some(6),
            Frame::EndEffector => None,
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.joint_index() {
            Some(index) => write!(f, "Joint {}", index + 1),
            None => write!(f, "End-Effector"),
        }
    }
}

/// Calculates the quantities of a manipulator which the differential inverse kinematics needs.
///
/// Both functions are evaluated once per control cycle for the current joint configuration,
/// their results are never cached across cycles.
pub trait KinematicModel {
    /// Gets the 3x7 translational Jacobian of the end effector in world frame.
    ///
    /// # Arguments
    /// * `q` - Joint position.
    /// # Return
    /// Matrix mapping joint velocities to the linear end-effector velocity.
    fn jacobian(&self, q: &Vector7) -> Matrix3x7;

    /// Gets the joint velocity which pulls the snake toward its preferred posture.
    ///
    /// Implementations must return the zero vector whenever `k0` is zero.
    ///
    /// # Arguments
    /// * `q` - Joint position.
    /// * `k0` - Non-negative gain of the secondary objective.
    fn q0dot(&self, q: &Vector7, k0: f64) -> Vector7;
}

#[cfg(test)]
mod tests {
    use crate::model::Frame;

    #[test]
    fn frame_names() {
        assert_eq!(Frame::Joint1.to_string(), "Joint 1");
        assert_eq!(Frame::Joint7.to_string(), "Joint 7");
        assert_eq!(Frame::EndEffector.to_string(), "End-Effector");
        assert_eq!(Frame::EndEffector.joint_index(), None);
    }
}
