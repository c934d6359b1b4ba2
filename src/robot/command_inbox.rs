// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the inbox for asynchronously received velocity and gain commands.
use std::sync::{Arc, Mutex, MutexGuard};

use log::{trace, warn};

use crate::exception::{SnakeException, SnakeResult};
use crate::robot::control_types::{Command, Twist};

/// Shared slot holding the most recently received command.
///
/// Cloned handles can be moved into subscriber callbacks on other threads. Every accepted message
/// replaces the previous value, nothing is queued. The control loop takes a
/// [`snapshot`](`Self::snapshot`) once per cycle.
#[derive(Debug, Clone, Default)]
pub struct CommandInbox {
    command: Arc<Mutex<Command>>,
}

impl CommandInbox {
    pub fn new() -> Self {
        CommandInbox::default()
    }

    fn lock(&self) -> MutexGuard<Command> {
        // the command is plain data, a panicking writer cannot leave it half written
        self.command
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replaces the velocity target.
    ///
    /// # Errors
    /// * InvalidCommand if the linear velocity is not finite. The previous twist is kept.
    pub fn set_twist(&self, twist: Twist) -> SnakeResult<()> {
        if !twist.linear.iter().all(|x| x.is_finite()) {
            warn!("Rejected twist with non-finite linear velocity {:?}", twist.linear);
            return Err(SnakeException::InvalidCommand {
                message: format!("twist has non-finite linear velocity {:?}", twist.linear),
            });
        }
        trace!("Received twist {:?}", twist.linear);
        self.lock().twist = twist;
        Ok(())
    }

    /// Replaces the gain of the secondary objective.
    ///
    /// # Errors
    /// * InvalidCommand if the gain is negative or not finite. The previous gain is kept.
    pub fn set_gain(&self, gain: f64) -> SnakeResult<()> {
        if !(gain.is_finite() && gain >= 0.) {
            warn!("Rejected gain {}", gain);
            return Err(SnakeException::InvalidCommand {
                message: format!("gain must be finite and non-negative but is {}", gain),
            });
        }
        trace!("Received gain {}", gain);
        self.lock().gain = gain;
        Ok(())
    }

    /// Returns a copy of the most recently received command.
    pub fn snapshot(&self) -> Command {
        *self.lock()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use crate::robot::command_inbox::CommandInbox;
    use crate::robot::control_types::{Command, Twist};

    #[test]
    fn starts_without_motion() {
        assert_eq!(CommandInbox::new().snapshot(), Command::default());
    }

    #[test]
    fn last_write_wins() {
        let inbox = CommandInbox::new();
        inbox.set_twist(Twist::from_linear([0.1, 0., 0.])).unwrap();
        inbox.set_twist(Twist::from_linear([0., 0.2, 0.])).unwrap();
        inbox.set_gain(1.).unwrap();
        inbox.set_gain(0.5).unwrap();
        let command = inbox.snapshot();
        assert_eq!(command.twist.linear, [0., 0.2, 0.]);
        assert_eq!(command.gain, 0.5);
    }

    #[test]
    fn invalid_commands_keep_previous_value() {
        let inbox = CommandInbox::new();
        inbox.set_gain(2.).unwrap();
        inbox.set_twist(Twist::from_linear([0.1, 0., 0.])).unwrap();
        assert!(inbox.set_gain(-1.).is_err());
        assert!(inbox.set_gain(f64::NAN).is_err());
        assert!(inbox.set_twist(Twist::from_linear([f64::INFINITY, 0., 0.])).is_err());
        let command = inbox.snapshot();
        assert_eq!(command.gain, 2.);
        assert_eq!(command.twist.linear, [0.1, 0., 0.]);
    }

    #[test]
    fn angular_velocity_is_accepted_as_is() {
        let inbox = CommandInbox::new();
        let twist = Twist {
            linear: [0., 0., 0.01],
            angular: [f64::NAN, 0., 0.],
        };
        assert!(inbox.set_twist(twist).is_ok());
    }

    #[test]
    fn handles_share_the_slot() {
        let inbox = CommandInbox::new();
        let subscriber = inbox.clone();
        thread::spawn(move || {
            subscriber
                .set_twist(Twist::from_linear([0., 0., -0.05]))
                .unwrap();
            subscriber.set_gain(3.).unwrap();
        })
        .join()
        .unwrap();
        let command = inbox.snapshot();
        assert_eq!(command.twist.linear, [0., 0., -0.05]);
        assert_eq!(command.gain, 3.);
    }
}
