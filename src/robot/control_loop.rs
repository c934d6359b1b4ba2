// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the [`SnakeDriver`] which runs one differential inverse kinematics cycle per call.
use log::{debug, info, warn, Level};
use nalgebra::Vector3;

use crate::config::DriverParams;
use crate::exception::{SnakeException, SnakeResult};
use crate::model::KinematicModel;
use crate::robot::command_inbox::CommandInbox;
use crate::robot::control_types::{JointStateRequest, JointStateResponse, Pose, Position};
use crate::robot::device::Device;
use crate::robot::differential_ik::{resolve_step, IkStep};
use crate::robot::logger::{CycleCommandLog, CycleState, Logger};
use crate::robot::orientation::guarded_quaternion_from_rotation;
use crate::utils::{is_homogeneous_transformation, split_homogeneous, Vector7, N_JOINTS};

/// Drives a snake with Cartesian velocity commands.
///
/// The driver owns the joint configuration and the most recently received command. It has to be
/// stepped once per control period by the simulation:
/// ```no_run
/// # use snakesim::{DriverParams, SimulatedSnake, SnakeDriver, SnakeModel, SnakeResult, Twist, Device};
/// # fn main() -> SnakeResult<()> {
/// let device = SimulatedSnake::new(SnakeModel::default());
/// let mut driver = SnakeDriver::new(device, SnakeModel::default(), DriverParams::default())?;
/// driver.init_joint_state(&[0., 0.4, 0., -0.6, 0., 0.8, 0.].into())?;
/// driver.commands().set_twist(Twist::from_linear([0.01, 0., 0.]))?;
/// for _ in 0..100 {
///     let pose = driver.step()?;
///     println!("{:?}", pose);
///     driver.device_mut().step()?;
/// }
/// # Ok(())
/// # }
/// ```
pub struct SnakeDriver<D: Device, M: KinematicModel> {
    device: D,
    model: M,
    params: DriverParams,
    commands: CommandInbox,
    logger: Logger,
    q: Vector7,
    degenerate: bool,
    saturated: [bool; N_JOINTS],
}

impl<D: Device, M: KinematicModel> SnakeDriver<D, M> {
    /// Creates a new driver and enables the position sensors of the device.
    ///
    /// # Errors
    /// * ConfigException if the parameters are invalid.
    pub fn new(mut device: D, model: M, params: DriverParams) -> SnakeResult<Self> {
        params.validate()?;
        device.enable_sensors(params.sensor_sampling_period);
        Ok(SnakeDriver {
            device,
            model,
            logger: Logger::new(params.log_size),
            params,
            commands: CommandInbox::new(),
            q: Vector7::zeros(),
            degenerate: false,
            saturated: [false; N_JOINTS],
        })
    }

    /// Returns a handle for the velocity and gain command channels.
    pub fn commands(&self) -> CommandInbox {
        self.commands.clone()
    }

    pub fn params(&self) -> &DriverParams {
        &self.params
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Last joint positions sent to the actuators.
    pub fn joint_positions(&self) -> &Vector7 {
        &self.q
    }

    /// Determines whether the Jacobian of the last cycle was rank deficient.
    pub fn is_degenerate(&self) -> bool {
        self.degenerate
    }

    /// Joints which were stopped at their limit in the last cycle.
    pub fn saturated_joints(&self) -> &[bool; N_JOINTS] {
        &self.saturated
    }

    fn read_joint_positions(&self) -> Vector7 {
        Vector7::from_fn(|joint, _| self.device.get_position(joint))
    }

    /// Computes the next joint positions for the given measured joint positions.
    ///
    /// The Jacobian and the posture gradient are evaluated for `q`, nothing is cached.
    pub fn update_joint_position(&self, q: &Vector7, dx: &Vector3<f64>, k0: f64) -> IkStep {
        let jacobian = self.model.jacobian(q);
        let q0dot = self.model.q0dot(q, k0);
        resolve_step(
            q,
            dx,
            k0,
            &jacobian,
            &q0dot,
            self.params.control_period,
            self.params.rank_tolerance,
        )
    }

    /// Runs one control cycle.
    ///
    /// Reads the joint positions, resolves the latest velocity command, commands the actuators
    /// and returns the pose of the end effector.
    /// # Errors
    /// * ControlException if a sensor reading is not finite. The actuators are not commanded in
    /// this cycle.
    pub fn step(&mut self) -> SnakeResult<Pose> {
        let command = self.commands.snapshot();
        let q = self.read_joint_positions();
        let state = CycleState { q, command };
        if !q.iter().all(|x| x.is_finite()) {
            self.logger.log(&state, None);
            return Err(SnakeException::ControlException {
                log: Some(self.logger.flush()),
                error: format!("non-finite joint position reading {:?}", q.as_slice()),
            });
        }

        let ik_step = self.update_joint_position(&q, &command.twist.linear_velocity(), command.gain);
        self.track_rank(&ik_step);
        self.track_saturation(&ik_step);

        for (joint, &angle) in ik_step.q_next.iter().enumerate() {
            self.device.set_position(joint, angle);
        }
        self.q = ik_step.q_next;
        self.logger.log(
            &state,
            Some(&CycleCommandLog {
                q_c: ik_step.q_next,
                dq: ik_step.joint_velocity,
                jacobian_rank: ik_step.jacobian_rank,
            }),
        );

        let pose = self.end_effector_pose();
        debug!(
            "dx {:?} k0 {} -> q {:?}, end effector at {:?}",
            command.twist.linear,
            command.gain,
            ik_step.q_next.as_slice(),
            pose.position
        );
        Ok(pose)
    }

    /// Reports changes of the Jacobian rank, once per transition.
    fn track_rank(&mut self, ik_step: &IkStep) -> Option<Level> {
        let level = match ik_step.check_rank() {
            Err(error) if !self.degenerate => {
                warn!("{}", error);
                Some(Level::Warn)
            }
            Ok(()) if self.degenerate => {
                info!("Jacobian regained full rank");
                Some(Level::Info)
            }
            _ => None,
        };
        self.degenerate = ik_step.is_degenerate();
        level
    }

    /// Reports joints which newly reached their limit.
    fn track_saturation(&mut self, ik_step: &IkStep) -> Option<Level> {
        let newly_saturated = ik_step
            .saturated
            .iter()
            .zip(self.saturated.iter())
            .any(|(&now, &before)| now && !before);
        self.saturated = ik_step.saturated;
        if newly_saturated {
            warn!("Joints saturated at limit: {:?}", ik_step.saturated);
            Some(Level::Warn)
        } else {
            None
        }
    }

    /// Builds the pose message of the end effector from its world transform.
    pub fn end_effector_pose(&self) -> Pose {
        let transform = self.device.end_effector_transform();
        if !is_homogeneous_transformation(&transform) {
            warn!("End effector transform is not a valid homogeneous transformation");
        }
        let (translation, rotation) = split_homogeneous(&transform);
        Pose {
            position: Position {
                x: translation.x,
                y: translation.y,
                z: translation.z,
            },
            orientation: guarded_quaternion_from_rotation(
                &rotation,
                self.params.orientation_method,
            ),
        }
    }

    /// Advances the simulation by `seconds` of simulated time.
    ///
    /// # Errors
    /// * SimulationException if the device cannot be stepped or has no positive time step.
    pub fn delay_simulation(&mut self, seconds: f64) -> SnakeResult<()> {
        let basic_time_step = self.device.basic_time_step();
        if !(basic_time_step.is_finite() && basic_time_step > 0.) {
            return Err(SnakeException::SimulationException {
                message: format!("invalid basic time step {} ms", basic_time_step),
            });
        }
        let n_iter = (1000. * seconds / basic_time_step).floor().max(0.) as usize;
        for _ in 0..n_iter {
            self.device.step()?;
        }
        Ok(())
    }

    /// Moves every joint directly to the requested angle and waits until the snake settled.
    ///
    /// The inverse kinematics and the joint limits are bypassed. Blocks for
    /// [`settle_duration`](`DriverParams::settle_duration`) of simulated time.
    /// # Errors
    /// * InvalidJointState if the request does not hold exactly one angle per joint.
    /// * InvalidCommand if an angle is not finite.
    /// * SimulationException if the simulation could not be advanced.
    pub fn init_joint_state(
        &mut self,
        request: &JointStateRequest,
    ) -> SnakeResult<JointStateResponse> {
        if request.joint_state.len() != N_JOINTS {
            return Err(SnakeException::InvalidJointState {
                expected: N_JOINTS,
                found: request.joint_state.len(),
            });
        }
        if !request.joint_state.iter().all(|x| x.is_finite()) {
            return Err(SnakeException::InvalidCommand {
                message: format!("joint state {:?} is not finite", request.joint_state),
            });
        }
        info!("Initializing joint state to {:?}", request.joint_state);
        for (joint, &angle) in request.joint_state.iter().enumerate() {
            self.device.set_position(joint, angle);
        }
        self.q = Vector7::from_column_slice(&request.joint_state);
        self.delay_simulation(self.params.settle_duration)?;
        Ok(JointStateResponse { success: true })
    }
}
