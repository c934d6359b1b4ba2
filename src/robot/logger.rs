// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the logging type definitions for [`ControlException`](`crate::exception::SnakeException::ControlException`)
use std::collections::VecDeque;
use std::fmt::Debug;

use crate::robot::control_types::Command;
use crate::utils::Vector7;

/// Inputs of one control cycle. Structure used only for logging purposes.
#[derive(Debug, Copy, Clone)]
pub struct CycleState {
    /// measured joint positions.
    pub q: Vector7,
    /// command which was active during the cycle.
    pub command: Command,
}

/// Output of one control cycle. Structure used only for logging purposes.
#[derive(Debug, Copy, Clone)]
pub struct CycleCommandLog {
    /// commanded joint positions after saturation.
    pub q_c: Vector7,
    /// joint velocity before integration.
    pub dq: Vector7,
    /// rank of the Jacobian.
    pub jacobian_rank: usize,
}

/// One row of the log contains the inputs of a control cycle and the joint command it produced.
/// Provided by the [`ControlException`](`crate::exception::SnakeException::ControlException`).
#[derive(Debug, Copy, Clone)]
pub struct Record {
    /// Inputs of the cycle.
    pub state: CycleState,
    /// Command of the cycle, `None` if the cycle was aborted before commanding the actuators.
    pub command: Option<CycleCommandLog>,
}

impl Record {
    /// creates a string representation based on the debug formatter
    pub fn log(&self) -> String {
        format!("{:?}", self)
    }
}

/// Ring buffer of the last `log_size` control cycles.
pub(crate) struct Logger {
    records: VecDeque<Record>,
    log_size: usize,
}

impl Logger {
    pub fn new(log_size: usize) -> Self {
        Logger {
            records: VecDeque::with_capacity(log_size),
            log_size,
        }
    }
    pub fn log(&mut self, state: &CycleState, command: Option<&CycleCommandLog>) {
        if self.log_size == 0 {
            return;
        }
        if self.records.len() == self.log_size {
            self.records.pop_front();
        }
        self.records.push_back(Record {
            state: *state,
            command: command.copied(),
        });
    }
    /// Returns the recorded cycles, oldest first, and empties the log.
    pub fn flush(&mut self) -> Vec<Record> {
        self.records.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::robot::control_types::Command;
    use crate::robot::logger::{CycleCommandLog, CycleState, Logger};
    use crate::utils::Vector7;

    fn state(value: f64) -> CycleState {
        CycleState {
            q: Vector7::from_element(value),
            command: Command::default(),
        }
    }

    #[test]
    fn keeps_only_the_latest_cycles() {
        let mut logger = Logger::new(3);
        for i in 0..5 {
            let command = CycleCommandLog {
                q_c: Vector7::from_element(i as f64),
                dq: Vector7::zeros(),
                jacobian_rank: 3,
            };
            logger.log(&state(i as f64), Some(&command));
        }
        let records = logger.flush();
        let first_joint: Vec<f64> = records.iter().map(|record| record.state.q[0]).collect();
        assert_eq!(first_joint, vec![2., 3., 4.]);
        assert!(records.iter().all(|record| record.command.is_some()));
        assert!(logger.flush().is_empty());
    }

    #[test]
    fn aborted_cycles_have_no_command() {
        let mut logger = Logger::new(2);
        logger.log(&state(f64::NAN), None);
        let records = logger.flush();
        assert_eq!(records.len(), 1);
        assert!(records[0].command.is_none());
        assert!(records[0].log().contains("NaN"));
    }
}
