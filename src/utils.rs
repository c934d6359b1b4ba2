// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! contains useful type definitions and conversion functions.
use nalgebra::{Matrix3, Matrix4, SMatrix, SVector, Vector3};

/// Number of actuated joints of the snake.
pub const N_JOINTS: usize = 7;

/// A Vector with 7 entries
pub type Vector7 = SVector<f64, N_JOINTS>;
/// A Matrix with 3 rows and 7 columns
pub type Matrix3x7 = SMatrix<f64, 3, N_JOINTS>;
/// A Matrix with 7 rows and 3 columns
pub type Matrix7x3 = SMatrix<f64, N_JOINTS, 3>;
/// A Matrix with 7 rows and 7 columns
pub type Matrix7 = SMatrix<f64, N_JOINTS, N_JOINTS>;

/// converts a 4x4 row-major homogeneous matrix (as returned by the simulator) to a Matrix4
pub fn array_to_homogeneous(array: &[f64; 16]) -> Matrix4<f64> {
    Matrix4::from_row_slice(array)
}

/// converts a Matrix4 to a 4x4 row-major homogeneous array
pub fn homogeneous_to_array(matrix: &Matrix4<f64>) -> [f64; 16] {
    let mut out = [0.; 16];
    for row in 0..4 {
        for column in 0..4 {
            out[row * 4 + column] = matrix[(row, column)];
        }
    }
    out
}

/// splits a 4x4 row-major homogeneous array into its translation and its raw 3x3 rotation block.
///
/// The rotation block is returned as is, without re-orthonormalization, so that the orientation
/// extractor sees exactly what the simulator reported.
pub fn split_homogeneous(array: &[f64; 16]) -> (Vector3<f64>, Matrix3<f64>) {
    let transform = array_to_homogeneous(array);
    let translation = Vector3::new(transform[(0, 3)], transform[(1, 3)], transform[(2, 3)]);
    let rotation: Matrix3<f64> = transform.fixed_view::<3, 3>(0, 0).into_owned();
    (translation, rotation)
}

/// Determines whether the given array represents a valid homogeneous transformation matrix.
/// transform is represented as a 4x4 matrix in row-major format
#[allow(clippy::float_cmp)]
pub fn is_homogeneous_transformation(transform: &[f64; 16]) -> bool {
    const ORTHONORMAL_THRESHOLD: f64 = 1e-5;
    if transform[12] != 0.0 || transform[13] != 0.0 || transform[14] != 0.0 || transform[15] != 1.0
    {
        return false;
    }
    for row in 0..3 {
        let norm = f64::sqrt(
            transform[row * 4].powi(2) + transform[row * 4 + 1].powi(2) + transform[row * 4 + 2].powi(2),
        );
        if f64::abs(norm - 1.) > ORTHONORMAL_THRESHOLD {
            return false;
        }
    }
    for column in 0..3 {
        let norm = f64::sqrt(
            transform[column].powi(2) + transform[4 + column].powi(2) + transform[8 + column].powi(2),
        );
        if f64::abs(norm - 1.) > ORTHONORMAL_THRESHOLD {
            return false;
        }
    }
    true
}
