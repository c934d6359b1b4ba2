// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the kinematic model of the snake manipulator.
use nalgebra::{Isometry3, Translation3, Unit, UnitQuaternion, Vector3};

use crate::model::{Frame, KinematicModel};
use crate::utils::{Matrix3x7, Vector7, N_JOINTS};

/// Default length of every link in \[m\].
pub static DEFAULT_LINK_LENGTH: f64 = 0.1;
/// Default height of the first joint above the world origin in \[m\].
pub static DEFAULT_BASE_HEIGHT: f64 = 0.05;

/// Serial chain of seven revolute joints.
///
/// The joint axes alternate between yaw (Z) and pitch (Y), starting with a yaw joint at the base.
/// Every joint is followed by a straight link along its local Z axis, so in the zero
/// configuration the snake stands upright.
#[derive(Debug, Clone)]
pub struct SnakeModel {
    link_lengths: [f64; N_JOINTS],
    base_height: f64,
    neutral_pose: Vector7,
}

impl Default for SnakeModel {
    fn default() -> Self {
        SnakeModel::new([DEFAULT_LINK_LENGTH; N_JOINTS], DEFAULT_BASE_HEIGHT)
    }
}

impl SnakeModel {
    /// Creates a new SnakeModel with the all-zero configuration as preferred posture.
    ///
    /// # Arguments
    /// * `link_lengths` - Length of the link following each joint in \[m\].
    /// * `base_height` - Offset of the first joint above the world origin in \[m\].
    pub fn new(link_lengths: [f64; N_JOINTS], base_height: f64) -> Self {
        SnakeModel {
            link_lengths,
            base_height,
            neutral_pose: Vector7::zeros(),
        }
    }

    /// Sets the posture the secondary objective pulls the redundant joints toward.
    pub fn with_neutral_pose(mut self, neutral_pose: Vector7) -> Self {
        self.neutral_pose = neutral_pose;
        self
    }

    pub fn neutral_pose(&self) -> &Vector7 {
        &self.neutral_pose
    }

    /// Rotation axis of the given joint in its local frame.
    pub fn joint_axis(joint: usize) -> Unit<Vector3<f64>> {
        if joint % 2 == 0 {
            Vector3::z_axis()
        } else {
            Vector3::y_axis()
        }
    }

    /// Gets the pose of the given frame in world frame.
    ///
    /// A joint frame sits at the joint origin and already contains the joint rotation.
    /// # Arguments
    /// * `frame` - The desired frame.
    /// * `q` - Joint position.
    pub fn pose(&self, frame: &Frame, q: &Vector7) -> Isometry3<f64> {
        let last_joint = frame.joint_index();
        let mut transform = Isometry3::translation(0., 0., self.base_height);
        for joint in 0..N_JOINTS {
            transform *= Isometry3::from_parts(
                Translation3::identity(),
                UnitQuaternion::from_axis_angle(&SnakeModel::joint_axis(joint), q[joint]),
            );
            if last_joint == Some(joint) {
                return transform;
            }
            transform *= Isometry3::translation(0., 0., self.link_lengths[joint]);
        }
        transform
    }

    /// Computes forward kinematics: joint positions -> end-effector pose in world frame.
    pub fn forward_kinematics(&self, q: &Vector7) -> Isometry3<f64> {
        self.pose(&Frame::EndEffector, q)
    }

    /// Returns the joint origins and joint axes in world frame together with the end-effector
    /// position.
    fn joint_frames(
        &self,
        q: &Vector7,
    ) -> (
        [Vector3<f64>; N_JOINTS],
        [Vector3<f64>; N_JOINTS],
        Vector3<f64>,
    ) {
        let mut origins = [Vector3::zeros(); N_JOINTS];
        let mut axes = [Vector3::zeros(); N_JOINTS];
        let mut transform = Isometry3::translation(0., 0., self.base_height);
        for joint in 0..N_JOINTS {
            let axis = SnakeModel::joint_axis(joint);
            origins[joint] = transform.translation.vector;
            axes[joint] = transform.rotation * axis.into_inner();
            transform *= Isometry3::from_parts(
                Translation3::identity(),
                UnitQuaternion::from_axis_angle(&axis, q[joint]),
            );
            transform *= Isometry3::translation(0., 0., self.link_lengths[joint]);
        }
        (origins, axes, transform.translation.vector)
    }
}

impl KinematicModel for SnakeModel {
    fn jacobian(&self, q: &Vector7) -> Matrix3x7 {
        let (origins, axes, ee_position) = self.joint_frames(q);
        let mut jacobian = Matrix3x7::zeros();
        for joint in 0..N_JOINTS {
            // z_i x (p_ee - p_i)
            let column = axes[joint].cross(&(ee_position - origins[joint]));
            jacobian.set_column(joint, &column);
        }
        jacobian
    }

    fn q0dot(&self, q: &Vector7, k0: f64) -> Vector7 {
        if k0 == 0. {
            return Vector7::zeros();
        }
        // negative gradient of 0.5 * |q - q_neutral|^2
        -k0 * (q - self.neutral_pose)
    }
}
