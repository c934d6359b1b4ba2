// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

use std::path::PathBuf;

use clap::Parser;
use log::{error, info, LevelFilter};

use snakesim::{
    Device, DriverParams, SimulatedSnake, SnakeDriver, SnakeModel, SnakeResult, Twist,
};

/// An example showing how to move the end effector of a simulated snake with a constant
/// Cartesian velocity while the redundant joints are pulled toward the upright posture.
#[derive(Parser, Debug)]
#[clap(author, version, name = "snake_driver")]
struct CommandLineArguments {
    /// Parameter file of the driver
    #[clap(long, default_value = "params/snake_driver.toml")]
    pub params: PathBuf,
    /// Velocity of the end effector along x in m/s
    #[clap(long, default_value = "0.01", allow_hyphen_values = true)]
    pub vx: f64,
    /// Velocity of the end effector along y in m/s
    #[clap(long, default_value = "0.0", allow_hyphen_values = true)]
    pub vy: f64,
    /// Velocity of the end effector along z in m/s
    #[clap(long, default_value = "0.0", allow_hyphen_values = true)]
    pub vz: f64,
    /// Gain of the posture objective
    #[clap(long, default_value = "0.0")]
    pub gain: f64,
    /// Number of control cycles to run
    #[clap(long, default_value = "100")]
    pub cycles: usize,
    /// Print a line for every control cycle
    #[clap(short, long, action)]
    pub verbose: bool,
}

fn init_logging(verbose: bool) -> Result<(), log::SetLoggerError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {}] {}",
                record.level(),
                record.target(),
                message
            ))
        })
        .level(if verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .chain(std::io::stdout())
        .apply()
}

fn main() -> SnakeResult<()> {
    let args = CommandLineArguments::parse();
    if let Err(e) = init_logging(args.verbose) {
        eprintln!("could not initialise logging: {}", e);
    }
    let params = DriverParams::load(&args.params)?;
    info!("Loaded parameters {:?}", params);

    let device = SimulatedSnake::new(SnakeModel::default());
    let mut driver = SnakeDriver::new(device, SnakeModel::default(), params)?;
    driver.init_joint_state(&[0., 0.4, 0., -0.6, 0., 0.8, 0.].into())?;
    info!("Finished moving to initial joint configuration.");

    let commands = driver.commands();
    commands.set_twist(Twist::from_linear([args.vx, args.vy, args.vz]))?;
    commands.set_gain(args.gain)?;

    let mut last_pose = driver.end_effector_pose();
    for _ in 0..args.cycles {
        match driver.step() {
            Ok(pose) => last_pose = pose,
            Err(e) => error!("{}", e),
        }
        driver.device_mut().step()?;
    }
    info!(
        "Finished motion after {} ms, end effector at {:?} with orientation {:?}",
        driver.device().time(),
        last_pose.position,
        last_pose.orientation
    );
    Ok(())
}
