// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains a lightweight in-process simulation of the snake hardware.
use crate::exception::{SnakeException, SnakeResult};
use crate::model::SnakeModel;
use crate::robot::device::Device;
use crate::utils::{homogeneous_to_array, Vector7, N_JOINTS};

/// Default basic time step of the simulation in \[ms\].
pub static DEFAULT_BASIC_TIME_STEP: f64 = 32.;
/// Default maximum joint velocity of the simulated position servos in \[rad/s\].
pub static DEFAULT_MAX_JOINT_VELOCITY: f64 = 10.;

/// Kinematic simulation of the snake.
///
/// Every joint is an ideal position servo which moves toward its target with bounded velocity.
/// Position sensors read NaN until they are enabled and sampled for the first time, just like
/// the sensors of the simulator the driver was written for.
#[derive(Debug, Clone)]
pub struct SimulatedSnake {
    model: SnakeModel,
    positions: Vector7,
    targets: Vector7,
    readings: Vector7,
    max_joint_velocity: f64,
    basic_time_step: f64,
    sampling_period: Option<u32>,
    time: f64,
    last_sample: Option<f64>,
    duration: Option<f64>,
}

impl SimulatedSnake {
    /// Creates a new simulation with all joints at zero.
    pub fn new(model: SnakeModel) -> Self {
        SimulatedSnake {
            model,
            positions: Vector7::zeros(),
            targets: Vector7::zeros(),
            readings: Vector7::from_element(f64::NAN),
            max_joint_velocity: DEFAULT_MAX_JOINT_VELOCITY,
            basic_time_step: DEFAULT_BASIC_TIME_STEP,
            sampling_period: None,
            time: 0.,
            last_sample: None,
            duration: None,
        }
    }

    /// Sets the basic time step in \[ms\].
    pub fn with_basic_time_step(mut self, basic_time_step: f64) -> Self {
        self.basic_time_step = basic_time_step;
        self
    }

    /// Sets the maximum joint velocity of the servos in \[rad/s\].
    pub fn with_max_joint_velocity(mut self, max_joint_velocity: f64) -> Self {
        self.max_joint_velocity = max_joint_velocity;
        self
    }

    /// Ends the simulation after the given simulated time in \[ms\].
    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn model(&self) -> &SnakeModel {
        &self.model
    }

    /// True joint positions, independent of the sensors.
    pub fn positions(&self) -> &Vector7 {
        &self.positions
    }

    /// Elapsed simulated time in \[ms\].
    pub fn time(&self) -> f64 {
        self.time
    }

    fn sample(&mut self) {
        if let Some(period) = self.sampling_period {
            let due = match self.last_sample {
                Some(last_sample) => self.time - last_sample >= period as f64,
                None => true,
            };
            if due {
                self.readings = self.positions;
                self.last_sample = Some(self.time);
            }
        }
    }
}

impl Device for SimulatedSnake {
    fn set_position(&mut self, joint: usize, angle: f64) {
        if joint < N_JOINTS {
            self.targets[joint] = angle;
        }
    }

    fn get_position(&self, joint: usize) -> f64 {
        if joint < N_JOINTS {
            self.readings[joint]
        } else {
            f64::NAN
        }
    }

    fn enable_sensors(&mut self, sampling_period: u32) {
        self.sampling_period = Some(sampling_period);
        self.last_sample = None;
    }

    fn end_effector_transform(&self) -> [f64; 16] {
        homogeneous_to_array(&self.model.forward_kinematics(&self.positions).to_homogeneous())
    }

    fn basic_time_step(&self) -> f64 {
        self.basic_time_step
    }

    fn step(&mut self) -> SnakeResult<()> {
        if let Some(duration) = self.duration {
            if self.time + self.basic_time_step > duration {
                return Err(SnakeException::SimulationException {
                    message: format!("simulation ended after {} ms", self.time),
                });
            }
        }
        let max_delta = self.max_joint_velocity * self.basic_time_step / 1000.;
        for joint in 0..N_JOINTS {
            let delta = self.targets[joint] - self.positions[joint];
            if delta.is_finite() {
                self.positions[joint] += f64::max(f64::min(delta, max_delta), -max_delta);
            }
        }
        self.time += self.basic_time_step;
        self.sample();
        Ok(())
    }
}
