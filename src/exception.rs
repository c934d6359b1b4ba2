// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains exception and Result definitions
use crate::robot::logger::Record;
use thiserror::Error;

/// Represents all kind of errors which can occur while driving the snake.
#[derive(Error, Debug)]
pub enum SnakeException {
    /// DegenerateJacobian is reported if the task Jacobian lost rank. The pseudo-inverse is still
    /// well defined, so this is a warning-level condition and never aborts a control cycle.
    #[error("Degenerate Jacobian: rank {rank} < 3, task velocity can only be tracked partially")]
    DegenerateJacobian { rank: usize },

    /// OrientationSingularity is reported if the trace based quaternion extraction would divide
    /// by (almost) zero, i.e. the rotation angle is close to 180 degrees.
    #[error("Orientation singularity: quaternion denominator {denominator:e} is too close to zero")]
    OrientationSingularity { denominator: f64 },

    /// InvalidCommand is returned if an inbound velocity or gain command is rejected.
    #[error("{message:?}")]
    InvalidCommand { message: String },

    /// InvalidJointState is returned if an initialization request does not hold one angle per
    /// joint.
    #[error("Invalid joint state: expected {expected} joint angles but found {found}")]
    InvalidJointState { expected: usize, found: usize },

    /// ControlException is returned if a control cycle had to be aborted.
    /// The exception holds a vector with the last recorded cycles. The number of recorded
    /// cycles can be configured in the [`DriverParams`](`crate::DriverParams`).
    #[error("{error}")]
    ControlException {
        /// Vector of cycles logged just before the exception occurred.
        log: Option<Vec<Record>>,
        /// Explanatory string.
        error: String,
    },

    /// SimulationException is returned if the simulated device could not be stepped.
    #[error("{message:?}")]
    SimulationException { message: String },

    /// ConfigException is returned if the driver parameters cannot be loaded.
    #[error("{message:?}")]
    ConfigException { message: String },
}

/// creates a ConfigException from anything printable
pub(crate) fn create_config_exception<M: ToString>(message: M) -> SnakeException {
    SnakeException::ConfigException {
        message: message.to_string(),
    }
}

/// Result type which can have SnakeException as Error
pub type SnakeResult<T> = Result<T, SnakeException>;
