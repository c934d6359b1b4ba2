// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains functions for extracting a unit quaternion from a rotation matrix.

use log::warn;
use nalgebra::Matrix3;
use serde::Deserialize;
use serde::Serialize;

use crate::exception::{SnakeException, SnakeResult};
use crate::robot::control_types::Orientation;

/// Denominators of the trace method below this value are treated as singular.
pub static ORIENTATION_SINGULARITY_TOLERANCE: f64 = 1e-9;

/// Available algorithms for [`quaternion_from_rotation`].
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum QuaternionMethod {
    /// Shepperd's method: the largest of the trace and the diagonal elements is used as pivot.
    /// Finite for every proper rotation.
    Robust,
    /// Unguarded trace method. Reproduces the reference output but divides by zero for rotation
    /// angles of 180 degrees.
    Trace,
}

impl Default for QuaternionMethod {
    fn default() -> Self {
        QuaternionMethod::Robust
    }
}

/// Converts a proper rotation matrix into a unit quaternion.
///
/// # Arguments
/// * `rotation` - Orthonormal 3x3 matrix with determinant +1.
/// * `method` - Algorithm to use.
/// # Return
/// Quaternion with `w >= 0`. With [`QuaternionMethod::Trace`] the components are not finite if
/// the rotation angle is 180 degrees.
pub fn quaternion_from_rotation(rotation: &Matrix3<f64>, method: QuaternionMethod) -> Orientation {
    match method {
        QuaternionMethod::Robust => robust_quaternion(rotation),
        QuaternionMethod::Trace => trace_quaternion(rotation),
    }
}

/// Converts a rotation matrix with the trace method but refuses to divide by a small number.
///
/// The trace method loses precision long before `w` reaches zero. It is only accepted while the
/// trace is the largest Shepperd pivot, which guarantees `4w >= 2`.
/// # Errors
/// * OrientationSingularity if the trace is not the largest pivot or `4w` is smaller than
/// [`ORIENTATION_SINGULARITY_TOLERANCE`].
pub fn checked_quaternion_from_rotation(rotation: &Matrix3<f64>) -> SnakeResult<Orientation> {
    let trace = rotation.trace();
    let denominator = 2. * f64::sqrt(f64::max(1. + trace, 0.));
    let trace_is_pivot = (0..3).all(|i| trace >= rotation[(i, i)]);
    if !(trace_is_pivot && denominator >= ORIENTATION_SINGULARITY_TOLERANCE) {
        return Err(SnakeException::OrientationSingularity { denominator });
    }
    Ok(trace_quaternion(rotation))
}

/// Converts a rotation matrix like [`quaternion_from_rotation`] but never returns a non-finite
/// quaternion.
///
/// If the trace method is ill-conditioned, the robust method is used instead.
pub fn guarded_quaternion_from_rotation(
    rotation: &Matrix3<f64>,
    method: QuaternionMethod,
) -> Orientation {
    match method {
        QuaternionMethod::Robust => robust_quaternion(rotation),
        QuaternionMethod::Trace => match checked_quaternion_from_rotation(rotation) {
            Ok(orientation) if orientation.is_finite() => orientation,
            Ok(_) => {
                warn!("Trace method produced a non-finite quaternion, using robust method");
                robust_quaternion(rotation)
            }
            Err(error) => {
                warn!("{}, using robust method", error);
                robust_quaternion(rotation)
            }
        },
    }
}

fn trace_quaternion(r: &Matrix3<f64>) -> Orientation {
    let w = f64::sqrt(1. + r[(0, 0)] + r[(1, 1)] + r[(2, 2)]) / 2.;
    Orientation {
        x: (r[(2, 1)] - r[(1, 2)]) / (4. * w),
        y: (r[(0, 2)] - r[(2, 0)]) / (4. * w),
        z: (r[(1, 0)] - r[(0, 1)]) / (4. * w),
        w,
    }
}

fn robust_quaternion(r: &Matrix3<f64>) -> Orientation {
    let trace = r.trace();
    let (r00, r11, r22) = (r[(0, 0)], r[(1, 1)], r[(2, 2)]);
    let orientation = if trace >= r00 && trace >= r11 && trace >= r22 {
        let s = 2. * f64::sqrt(f64::max(1. + trace, 0.));
        Orientation {
            x: (r[(2, 1)] - r[(1, 2)]) / s,
            y: (r[(0, 2)] - r[(2, 0)]) / s,
            z: (r[(1, 0)] - r[(0, 1)]) / s,
            w: s / 4.,
        }
    } else if r00 >= r11 && r00 >= r22 {
        let s = 2. * f64::sqrt(f64::max(1. + r00 - r11 - r22, 0.));
        Orientation {
            x: s / 4.,
            y: (r[(0, 1)] + r[(1, 0)]) / s,
            z: (r[(0, 2)] + r[(2, 0)]) / s,
            w: (r[(2, 1)] - r[(1, 2)]) / s,
        }
    } else if r11 >= r22 {
        let s = 2. * f64::sqrt(f64::max(1. + r11 - r00 - r22, 0.));
        Orientation {
            x: (r[(0, 1)] + r[(1, 0)]) / s,
            y: s / 4.,
            z: (r[(1, 2)] + r[(2, 1)]) / s,
            w: (r[(0, 2)] - r[(2, 0)]) / s,
        }
    } else {
        let s = 2. * f64::sqrt(f64::max(1. + r22 - r00 - r11, 0.));
        Orientation {
            x: (r[(0, 2)] + r[(2, 0)]) / s,
            y: (r[(1, 2)] + r[(2, 1)]) / s,
            z: s / 4.,
            w: (r[(1, 0)] - r[(0, 1)]) / s,
        }
    };
    // q and -q are the same rotation, keep the hemisphere of the trace method
    if orientation.w < 0. {
        orientation.negate()
    } else {
        orientation
    }
}
