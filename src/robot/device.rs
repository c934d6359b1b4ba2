// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the interface of the (simulated) snake hardware.
use crate::exception::SnakeResult;

#[cfg(test)]
use mockall::automock;

/// Actuators, position sensors and clock of a snake.
///
/// Joints are addressed by their zero-based index.
#[cfg_attr(test, automock)]
pub trait Device {
    /// Commands the target angle of a joint in \[rad\].
    fn set_position(&mut self, joint: usize, angle: f64);

    /// Reads the measured angle of a joint in \[rad\].
    fn get_position(&self, joint: usize) -> f64;

    /// Enables all position sensors with the given sampling period in \[ms\].
    fn enable_sensors(&mut self, sampling_period: u32);

    /// Gets the pose of the end effector in world frame as row-major 4x4 homogeneous matrix.
    fn end_effector_transform(&self) -> [f64; 16];

    /// Basic time step of the simulation in \[ms\].
    fn basic_time_step(&self) -> f64;

    /// Advances the simulation by one basic time step.
    ///
    /// # Errors
    /// * SimulationException if the simulation cannot advance anymore.
    fn step(&mut self) -> SnakeResult<()>;
}
