// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the snake driver and the numeric core it runs every control cycle.

mod command_inbox;
pub mod control_loop;
pub mod control_types;
pub mod device;
pub mod differential_ik;
pub mod logger;
pub mod orientation;
pub mod simulation;

pub use command_inbox::CommandInbox;
