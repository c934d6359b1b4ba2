// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the parameters of the snake driver and functions for loading them from TOML files.
use std::fs::read_to_string;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

use crate::exception::{create_config_exception, SnakeResult};
use crate::robot::differential_ik::{DEFAULT_CONTROL_PERIOD, DEFAULT_RANK_TOLERANCE};
use crate::robot::orientation::QuaternionMethod;

/// Default time the snake is given to settle after an initialization request in \[s\].
pub static DEFAULT_SETTLE_DURATION: f64 = 1.0;
/// Default sampling period of the position sensors in \[ms\].
pub static DEFAULT_SENSOR_SAMPLING_PERIOD: u32 = 16;
/// Default number of control cycles kept for a
/// [`ControlException`](`crate::exception::SnakeException::ControlException`).
pub static DEFAULT_LOG_SIZE: usize = 50;

/// Parameters of the [`SnakeDriver`](`crate::SnakeDriver`).
///
/// Every field is optional in the parameter file:
/// ```toml
/// control_period = 0.032
/// settle_duration = 1.0
/// sensor_sampling_period = 16
/// orientation_method = "robust"
/// rank_tolerance = 1e-10
/// log_size = 50
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DriverParams {
    /// Control period used for integrating the joint velocity in \[s\].
    pub control_period: f64,
    /// Simulated time to wait after an initialization request in \[s\].
    pub settle_duration: f64,
    /// Sampling period of the position sensors in \[ms\].
    pub sensor_sampling_period: u32,
    /// Algorithm for the orientation of the published pose.
    pub orientation_method: QuaternionMethod,
    /// Singular values of the Jacobian below this value are treated as zero.
    pub rank_tolerance: f64,
    /// Number of control cycles kept for error reports.
    pub log_size: usize,
}

impl Default for DriverParams {
    fn default() -> Self {
        DriverParams {
            control_period: DEFAULT_CONTROL_PERIOD,
            settle_duration: DEFAULT_SETTLE_DURATION,
            sensor_sampling_period: DEFAULT_SENSOR_SAMPLING_PERIOD,
            orientation_method: QuaternionMethod::default(),
            rank_tolerance: DEFAULT_RANK_TOLERANCE,
            log_size: DEFAULT_LOG_SIZE,
        }
    }
}

impl DriverParams {
    /// Loads the parameters from a TOML file.
    ///
    /// # Errors
    /// * ConfigException if the file cannot be read, parsed or holds invalid values.
    pub fn load<P: AsRef<Path>>(path: P) -> SnakeResult<Self> {
        let path = path.as_ref();
        let params_str = read_to_string(path).map_err(|e| {
            create_config_exception(format!("cannot load parameter file {:?}: {}", path, e))
        })?;
        DriverParams::from_toml_str(params_str.as_str())
    }

    /// Parses the parameters from a TOML string.
    ///
    /// # Errors
    /// * ConfigException if the string cannot be parsed or holds invalid values.
    pub fn from_toml_str(params_str: &str) -> SnakeResult<Self> {
        let params: DriverParams = toml::from_str(params_str).map_err(|e| {
            create_config_exception(format!("cannot read parameter file: {}", e))
        })?;
        params.validate()?;
        Ok(params)
    }

    /// # Errors
    /// * ConfigException if a value is out of its valid range.
    pub fn validate(&self) -> SnakeResult<()> {
        if !(self.control_period.is_finite() && self.control_period > 0.) {
            return Err(create_config_exception(format!(
                "control_period must be positive but is {}",
                self.control_period
            )));
        }
        if !(self.settle_duration.is_finite() && self.settle_duration >= 0.) {
            return Err(create_config_exception(format!(
                "settle_duration must not be negative but is {}",
                self.settle_duration
            )));
        }
        if !(self.rank_tolerance.is_finite() && self.rank_tolerance >= 0.) {
            return Err(create_config_exception(format!(
                "rank_tolerance must not be negative but is {}",
                self.rank_tolerance
            )));
        }
        if self.log_size == 0 {
            return Err(create_config_exception("log_size must be at least 1"));
        }
        Ok(())
    }
}
