// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the differential inverse kinematics which maps a Cartesian velocity of the end
//! effector to the next joint positions of the snake.
//!
//! The task velocity is resolved with the Moore-Penrose pseudo-inverse of the Jacobian. The
//! redundant degrees of freedom are used to follow a secondary objective by projecting its
//! joint velocity into the null space of the Jacobian:
//! ```text
//! dq = J⁺·dx + (I - J⁺·J)·q0dot
//! q_next = clamp(q + dq·dt, -JOINT_LIMIT, JOINT_LIMIT)
//! ```

use std::f64::consts::PI;

use crate::exception::{SnakeException, SnakeResult};
use crate::utils::{Matrix3x7, Matrix7, Matrix7x3, Vector7, N_JOINTS};
use nalgebra::Vector3;

/// Symmetric actuation range of every joint: 120 degrees.
pub static JOINT_LIMIT: f64 = 2. * PI / 3.;
/// Singular values of the Jacobian below this value are treated as zero.
pub static DEFAULT_RANK_TOLERANCE: f64 = 1e-10;
/// Control period of the reference deployment in \[s\].
pub static DEFAULT_CONTROL_PERIOD: f64 = 0.032;
/// Dimension of the task space (linear velocity only).
pub const TASK_DIMENSION: usize = 3;

const SVD_EPSILON: f64 = f64::EPSILON;
const MAX_SVD_ITERATIONS: usize = 1000;

/// Computes the Moore-Penrose pseudo-inverse of the Jacobian together with its rank.
///
/// The pseudo-inverse is computed with a singular value decomposition, so it stays well defined
/// if the Jacobian is rank deficient. A Jacobian with non-finite entries (or one the SVD cannot
/// decompose) is treated like the zero matrix.
/// # Arguments
/// * `jacobian` - 3x7 task Jacobian.
/// * `tolerance` - Singular values below this value are treated as zero.
/// # Return
/// 7x3 pseudo-inverse and the numerical rank of the Jacobian.
pub fn pseudo_inverse_with_rank(jacobian: &Matrix3x7, tolerance: f64) -> (Matrix7x3, usize) {
    let tolerance = if tolerance.is_finite() {
        tolerance.abs()
    } else {
        DEFAULT_RANK_TOLERANCE
    };
    if !jacobian.iter().all(|x| x.is_finite()) {
        return (Matrix7x3::zeros(), 0);
    }
    match jacobian.try_svd(true, true, SVD_EPSILON, MAX_SVD_ITERATIONS) {
        Some(svd) => {
            let rank = svd.rank(tolerance);
            // only fails for a negative tolerance or missing singular vectors
            let pseudo_inverse = svd
                .pseudo_inverse(tolerance)
                .unwrap_or_else(|_| Matrix7x3::zeros());
            (pseudo_inverse, rank)
        }
        None => (Matrix7x3::zeros(), 0),
    }
}

/// Computes the Moore-Penrose pseudo-inverse of the Jacobian with the default tolerance.
pub fn pseudo_inverse(jacobian: &Matrix3x7) -> Matrix7x3 {
    pseudo_inverse_with_rank(jacobian, DEFAULT_RANK_TOLERANCE).0
}

/// Computes the projector `I - J⁺·J` onto the null space of the Jacobian.
///
/// Joint velocities of the form `P·v` produce no end-effector velocity to first order.
pub fn null_space_projector(jacobian: &Matrix3x7, jacobian_pinv: &Matrix7x3) -> Matrix7 {
    Matrix7::identity() - jacobian_pinv * jacobian
}

/// Clamps every joint position independently to `[-limit, limit]`.
///
/// The direction of the motion is not preserved, a joint exceeding its limit simply stops at the
/// limit.
///
/// The sign of `limit` is ignored. A NaN limit leaves the positions unchanged.
pub fn clamp_joint_positions(q: &Vector7, limit: f64) -> Vector7 {
    let limit = limit.abs();
    q.map(|x| f64::max(f64::min(x, limit), -limit))
}

/// Result of one differential inverse kinematics step.
#[derive(Debug, Copy, Clone)]
pub struct IkStep {
    /// Joint positions to command, always within [`JOINT_LIMIT`].
    pub q_next: Vector7,
    /// Joint velocity before integration and saturation.
    pub joint_velocity: Vector7,
    /// Numerical rank of the Jacobian.
    pub jacobian_rank: usize,
    /// Joints which were stopped at their limit in this step.
    pub saturated: [bool; N_JOINTS],
}

impl IkStep {
    /// Determines whether the Jacobian lost rank.
    pub fn is_degenerate(&self) -> bool {
        self.jacobian_rank < TASK_DIMENSION
    }

    /// Determines whether at least one joint was clamped.
    pub fn is_saturated(&self) -> bool {
        self.saturated.iter().any(|&x| x)
    }

    /// # Errors
    /// * DegenerateJacobian if the rank of the Jacobian is smaller than 3.
    pub fn check_rank(&self) -> SnakeResult<()> {
        if self.is_degenerate() {
            return Err(SnakeException::DegenerateJacobian {
                rank: self.jacobian_rank,
            });
        }
        Ok(())
    }
}

/// Resolves a Cartesian velocity into the next joint positions and reports diagnostics.
///
/// # Arguments
/// * `q` - Current joint positions.
/// * `dx` - Target linear velocity of the end effector.
/// * `_k0` - Gain of the secondary objective. Not used directly, the gain has to be applied by
/// the model when computing `q0dot`.
/// * `jacobian` - Task Jacobian at `q`.
/// * `q0dot` - Joint velocity of the secondary objective at `q`, zero for `k0 == 0`.
/// * `dt` - Control period in \[s\].
/// * `rank_tolerance` - Singular values below this value are treated as zero.
pub fn resolve_step(
    q: &Vector7,
    dx: &Vector3<f64>,
    _k0: f64,
    jacobian: &Matrix3x7,
    q0dot: &Vector7,
    dt: f64,
    rank_tolerance: f64,
) -> IkStep {
    let (jacobian_pinv, jacobian_rank) = pseudo_inverse_with_rank(jacobian, rank_tolerance);
    let dq_task = jacobian_pinv * dx;
    let dq_null = null_space_projector(jacobian, &jacobian_pinv) * q0dot;
    let joint_velocity = dq_task + dq_null;
    let q_candidate = q + joint_velocity * dt;

    let mut saturated = [false; N_JOINTS];
    for (flag, x) in saturated.iter_mut().zip(q_candidate.iter()) {
        *flag = x.abs() > JOINT_LIMIT;
    }
    IkStep {
        q_next: clamp_joint_positions(&q_candidate, JOINT_LIMIT),
        joint_velocity,
        jacobian_rank,
        saturated,
    }
}

/// Resolves a Cartesian velocity into the next joint positions.
///
/// See [`resolve_step`] for the arguments.
/// # Return
/// Joint positions within `[-JOINT_LIMIT, JOINT_LIMIT]`.
pub fn resolve(
    q: &Vector7,
    dx: &Vector3<f64>,
    k0: f64,
    jacobian: &Matrix3x7,
    q0dot: &Vector7,
    dt: f64,
) -> Vector7 {
    resolve_step(q, dx, k0, jacobian, q0dot, dt, DEFAULT_RANK_TOLERANCE).q_next
}

#[cfg(test)]
mod tests {
    use nalgebra::Vector3;

    use crate::model::{KinematicModel, SnakeModel};
    use crate::robot::differential_ik::{
        clamp_joint_positions, null_space_projector, pseudo_inverse, pseudo_inverse_with_rank,
        resolve, resolve_step, DEFAULT_CONTROL_PERIOD, DEFAULT_RANK_TOLERANCE, JOINT_LIMIT,
    };
    use crate::utils::{Matrix3x7, Matrix7, Vector7, N_JOINTS};

    fn slice_compare(a: &[f64], b: &[f64], thresh: f64) {
        assert_eq!(a.len(), b.len());
        for i in 0..a.len() {
            float_compare(a[i], b[i], thresh);
        }
    }

    fn float_compare(a: f64, b: f64, thresh: f64) {
        assert!((a - b).abs() < thresh, "{} != {}", a, b);
    }

    fn bent_configuration() -> Vector7 {
        Vector7::from_row_slice(&[0.3, -0.4, 0.2, 0.7, -0.1, 0.5, 0.25])
    }

    fn test_jacobians() -> Vec<Matrix3x7> {
        let model = SnakeModel::default();
        vec![
            model.jacobian(&bent_configuration()),
            // rank 1, the snake stands upright
            model.jacobian(&Vector7::zeros()),
            Matrix3x7::from_row_slice(&[
                1., 2., 0., -1., 0.5, 0., 3., //
                0., 1., 1., 0., -2., 1., 0., //
                2., 0., -1., 4., 0., 0.5, 1.,
            ]),
            // rank 2, the last row repeats the first one
            Matrix3x7::from_row_slice(&[
                1., 2., 0., -1., 0.5, 0., 3., //
                0., 1., 1., 0., -2., 1., 0., //
                1., 2., 0., -1., 0.5, 0., 3.,
            ]),
            Matrix3x7::zeros(),
        ]
    }

    #[test]
    fn pseudo_inverse_identity() {
        for jacobian in test_jacobians() {
            let jacobian_pinv = pseudo_inverse(&jacobian);
            assert!((jacobian * jacobian_pinv * jacobian - jacobian).norm() < 1e-9);
            assert!((jacobian_pinv * jacobian * jacobian_pinv - jacobian_pinv).norm() < 1e-9);
        }
    }

    #[test]
    fn pseudo_inverse_of_full_rank_jacobian_is_right_inverse() {
        let jacobian = SnakeModel::default().jacobian(&bent_configuration());
        let (jacobian_pinv, rank) = pseudo_inverse_with_rank(&jacobian, DEFAULT_RANK_TOLERANCE);
        assert_eq!(rank, 3);
        let expected = jacobian.transpose()
            * (jacobian * jacobian.transpose())
                .try_inverse()
                .expect("full rank");
        assert!((jacobian_pinv - expected).norm() < 1e-9);
    }

    #[test]
    fn rank_of_degenerate_jacobians() {
        let jacobians = test_jacobians();
        let ranks: Vec<usize> = jacobians
            .iter()
            .map(|jacobian| pseudo_inverse_with_rank(jacobian, DEFAULT_RANK_TOLERANCE).1)
            .collect();
        assert_eq!(ranks, vec![3, 1, 3, 2, 0]);
    }

    #[test]
    fn non_finite_jacobian_is_treated_as_zero() {
        let mut jacobian = Matrix3x7::zeros();
        jacobian[(1, 2)] = f64::NAN;
        let (jacobian_pinv, rank) = pseudo_inverse_with_rank(&jacobian, DEFAULT_RANK_TOLERANCE);
        assert_eq!(rank, 0);
        assert_eq!(jacobian_pinv.norm(), 0.);
    }

    #[test]
    fn null_space_non_interference() {
        let q0dot = Vector7::from_row_slice(&[0.5, -1., 2., 0.3, -0.7, 1.1, -0.2]);
        for jacobian in test_jacobians() {
            let projector = null_space_projector(&jacobian, &pseudo_inverse(&jacobian));
            assert!((jacobian * projector * q0dot).norm() < 1e-9);
        }
    }

    #[test]
    fn zero_jacobian_gives_identity_projector() {
        let jacobian = Matrix3x7::zeros();
        let jacobian_pinv = pseudo_inverse(&jacobian);
        assert_eq!(jacobian_pinv.norm(), 0.);
        assert_eq!(null_space_projector(&jacobian, &jacobian_pinv), Matrix7::identity());

        let q = Vector7::from_element(0.1);
        let q0dot = Vector7::from_element(1.);
        let q_next = resolve(&q, &Vector3::new(1., 0., 0.), 1., &jacobian, &q0dot, 0.5);
        slice_compare(q_next.as_slice(), &[0.6; N_JOINTS], 1e-12);
    }

    #[test]
    fn without_gain_only_the_task_term_remains() {
        let model = SnakeModel::default();
        let dt = DEFAULT_CONTROL_PERIOD;
        let dx = Vector3::new(0.02, -0.01, 0.03);
        for q in [bent_configuration(), Vector7::zeros(), Vector7::from_element(-0.3)].iter() {
            let jacobian = model.jacobian(q);
            let expected =
                clamp_joint_positions(&(q + pseudo_inverse(&jacobian) * dx * dt), JOINT_LIMIT);
            let q_next = resolve(q, &dx, 0., &jacobian, &Vector7::zeros(), dt);
            slice_compare(q_next.as_slice(), expected.as_slice(), 1e-12);
        }
    }

    #[test]
    fn zero_gain_gives_no_posture_motion() {
        let model = SnakeModel::default();
        let q = bent_configuration();
        let jacobian = model.jacobian(&q);
        let dx = Vector3::new(0.01, 0., 0.);
        let q0dot = model.q0dot(&q, 0.);
        assert_eq!(q0dot, Vector7::zeros());
        let q_next = resolve(&q, &dx, 0., &jacobian, &q0dot, 0.032);
        let expected =
            clamp_joint_positions(&(q + pseudo_inverse(&jacobian) * dx * 0.032), JOINT_LIMIT);
        slice_compare(q_next.as_slice(), expected.as_slice(), 1e-15);
    }

    #[test]
    fn posture_gradient_is_projected_regardless_of_gain() {
        let q = bent_configuration();
        let jacobian = SnakeModel::default().jacobian(&q);
        let dx = Vector3::new(0.01, 0., 0.);
        let q0dot = Vector7::from_element(0.3);
        let step = resolve_step(&q, &dx, 0., &jacobian, &q0dot, 0.032, DEFAULT_RANK_TOLERANCE);
        let pinv = pseudo_inverse(&jacobian);
        let expected = pinv * dx + null_space_projector(&jacobian, &pinv) * q0dot;
        slice_compare(step.joint_velocity.as_slice(), expected.as_slice(), 1e-12);
    }

    #[test]
    fn posture_regularization_does_not_move_the_tip() {
        let model = SnakeModel::default();
        let q = bent_configuration();
        let k0 = 1.5;
        let jacobian = model.jacobian(&q);
        let step = resolve_step(
            &q,
            &Vector3::zeros(),
            k0,
            &jacobian,
            &model.q0dot(&q, k0),
            0.032,
            DEFAULT_RANK_TOLERANCE,
        );
        assert!(!step.is_saturated());
        assert!(step.joint_velocity.norm() > 1e-3);
        assert!((jacobian * step.joint_velocity).norm() < 1e-9);
        assert!((jacobian * (step.q_next - q)).norm() < 1e-9);
    }

    #[test]
    fn saturation_is_componentwise() {
        let q = Vector7::from_row_slice(&[2.0, -2.0, 0., 0.5, -0.5, 1., -1.]);
        let q0dot = Vector7::from_row_slice(&[100., -100., 1., 0., 0., 100., -100.]);
        let step = resolve_step(
            &q,
            &Vector3::zeros(),
            1.,
            &Matrix3x7::zeros(),
            &q0dot,
            0.032,
            DEFAULT_RANK_TOLERANCE,
        );
        slice_compare(
            step.q_next.as_slice(),
            &[JOINT_LIMIT, -JOINT_LIMIT, 0.032, 0.5, -0.5, JOINT_LIMIT, -JOINT_LIMIT],
            1e-12,
        );
        assert_eq!(step.saturated, [true, true, false, false, false, true, true]);
    }

    #[test]
    fn out_of_range_input_is_clamped() {
        let q = Vector7::from_element(3.);
        let q_next = resolve(
            &q,
            &Vector3::zeros(),
            0.,
            &Matrix3x7::zeros(),
            &Vector7::zeros(),
            0.032,
        );
        slice_compare(q_next.as_slice(), &[JOINT_LIMIT; N_JOINTS], 1e-12);
    }

    #[test]
    fn clamping_ignores_the_sign_of_the_limit() {
        let q = Vector7::from_row_slice(&[-3., -1., 0., 0.5, 1., 2., 3.]);
        let expected = [-2., -1., 0., 0.5, 1., 2., 2.];
        for &limit in [2., -2.].iter() {
            slice_compare(clamp_joint_positions(&q, limit).as_slice(), &expected, 1e-15);
        }
        assert_eq!(clamp_joint_positions(&q, f64::NAN), q);
    }

    #[test]
    fn zero_command_produces_no_motion() {
        let model = SnakeModel::default();
        for q in [bent_configuration(), Vector7::zeros(), Vector7::from_element(2.)].iter() {
            let q_next = resolve(
                q,
                &Vector3::zeros(),
                0.,
                &model.jacobian(q),
                &Vector7::zeros(),
                0.032,
            );
            assert_eq!(&q_next, q);
        }
    }

    #[test]
    fn small_x_velocity_from_upright_pose() {
        let model = SnakeModel::default();
        let q = Vector7::zeros();
        let dx = Vector3::new(0.01, 0., 0.);
        let dt = 0.032;
        let jacobian = model.jacobian(&q);
        let step = resolve_step(&q, &dx, 0., &jacobian, &Vector7::zeros(), dt, DEFAULT_RANK_TOLERANCE);
        assert!(step.is_degenerate());
        assert!(step.check_rank().is_err());
        assert!(!step.is_saturated());

        let delta = step.q_next - q;
        assert!(delta.norm() <= step.joint_velocity.norm() * dt + 1e-15);
        for joint in 0..N_JOINTS {
            if jacobian[(0, joint)] > 0. {
                // pitch joints push the tip along x
                assert!(delta[joint] > 0.);
            } else {
                float_compare(delta[joint], 0., 1e-15);
            }
            assert!(step.q_next[joint].abs() <= JOINT_LIMIT);
        }
        // the joint with the longest lever arm moves most
        assert!(delta[1] > delta[3] && delta[3] > delta[5]);
        // the commanded velocity is reproduced in task space
        let achieved = jacobian * step.joint_velocity;
        slice_compare(achieved.as_slice(), dx.as_slice(), 1e-12);
    }
}
