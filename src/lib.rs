// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! # snakesim-rs
//! snakesim-rs drives a simulated, kinematically redundant snake manipulator with seven revolute
//! joints. A Cartesian velocity of the end effector is resolved into joint positions with
//! differential inverse kinematics, while the redundant degrees of freedom are pulled toward a
//! preferred posture.
//!
//! ## Design
//! The library is divided into two main modules:
//! * [model](`crate::model`) - contains the [`KinematicModel`] contract and the default
//!   [`SnakeModel`].
//! * [robot](`crate::robot`) - contains the numeric core and the [`SnakeDriver`] which runs it
//!   once per control cycle.
//!
//! The numeric core consists of pure functions:
//! * [`resolve`](`crate::robot::differential_ik::resolve`) maps a Cartesian velocity to the
//!   next joint positions: `q_next = clamp(q + (J⁺·dx + (I - J⁺·J)·q0dot)·dt)`.
//! * [`quaternion_from_rotation`](`crate::robot::orientation::quaternion_from_rotation`)
//!   extracts the orientation of the end effector for the published pose.
//!
//! # Example:
//!```no_run
//! use snakesim::{Device, DriverParams, SimulatedSnake, SnakeDriver, SnakeModel, SnakeResult, Twist};
//! fn main() -> SnakeResult<()> {
//!     let params = DriverParams::load("params/snake_driver.toml")?;
//!     let device = SimulatedSnake::new(SnakeModel::default());
//!     let mut driver = SnakeDriver::new(device, SnakeModel::default(), params)?;
//!     driver.init_joint_state(&[0., 0.4, 0., -0.6, 0., 0.8, 0.].into())?;
//!     let commands = driver.commands();
//!     commands.set_twist(Twist::from_linear([0.01, 0., 0.]))?;
//!     commands.set_gain(0.5)?;
//!     for _ in 0..100 {
//!         let pose = driver.step()?;
//!         println!("{:?}", pose);
//!         driver.device_mut().step()?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! [`SnakeDriver::commands`] returns a handle which can be moved into the callbacks of any
//! transport. The last received twist and gain win, the driver samples them once per cycle.
//!
//! All fallible functions return a [`SnakeResult`]. Numerically degenerate situations like a
//! rank deficient Jacobian or a 180 degree end-effector rotation are handled without an error,
//! the driver only logs them through the [`log`](https://docs.rs/log) facade.
pub mod config;
pub mod exception;
pub mod model;
pub mod robot;
pub mod utils;

pub use config::DriverParams;
pub use exception::{SnakeException, SnakeResult};
pub use model::{Frame, KinematicModel, SnakeModel};
pub use robot::control_loop::SnakeDriver;
pub use robot::control_types::*;
pub use robot::device::Device;
pub use robot::differential_ik::{resolve, resolve_step, IkStep, JOINT_LIMIT};
pub use robot::orientation::{quaternion_from_rotation, QuaternionMethod};
pub use robot::simulation::SimulatedSnake;
pub use robot::CommandInbox;
pub use utils::*;
