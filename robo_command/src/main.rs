//! # Robo Command
//!
//! Simulated robot control loop on top of the cooperative task scheduler.
//!
//! Registers the drive resource, installs `ArcadeDrive` as its default task,
//! and schedules the configured task script at the given ticks while the
//! cycle runner ticks the scheduler at the configured period.

use std::path::PathBuf;
use std::process;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use robo_command::config::{RobotConfig, load_config};
use robo_command::cycle::{CycleRunner, rt_setup};
use robo_command::drive::{DriveTrain, SharedDrive, SimDrive};
use robo_command::input::VirtualJoystick;
use robo_command::tasks::{ArcadeDrive, build_script_task};
use robo_command::{Scheduler, TaskId};
use robo_common::consts::DEFAULT_CONFIG_PATH;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Robo Command: tick-driven task scheduler for robot control
#[derive(Parser, Debug)]
#[command(name = "robo_command")]
#[command(version)]
#[command(about = "Cooperative task scheduler with exclusive resource arbitration")]
struct Args {
    /// Path to the robot configuration TOML.
    #[arg(default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Stop after N ticks (overrides scheduler.max_ticks).
    #[arg(long, value_name = "N")]
    ticks: Option<u64>,

    /// CPU core to pin the control thread to (rt feature only).
    #[arg(long, default_value_t = 1)]
    cpu_core: usize,

    /// SCHED_FIFO priority (rt feature only).
    #[arg(long, default_value_t = 80)]
    rt_priority: i32,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    let config = load_config(&args.config);
    setup_tracing(&args, config.as_ref().ok());

    info!("Robo Command v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = config
        .map_err(|e| -> Box<dyn std::error::Error> {
            format!("config {}: {e}", args.config.display()).into()
        })
        .and_then(|config| run(&args, config));
    if let Err(e) = result {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Robo Command shutdown complete");
}

fn run(args: &Args, mut config: RobotConfig) -> Result<(), Box<dyn std::error::Error>> {
    if args.ticks.is_some() {
        config.scheduler.max_ticks = args.ticks;
    }
    info!(
        service = %config.shared.service_name,
        tick_period_us = config.scheduler.tick_period_us,
        script_len = config.script.len(),
        "Config OK"
    );

    let mut scheduler = Scheduler::new();
    let drive_resource = scheduler.register_resource(&config.drive.resource_name)?;

    let sim = SimDrive::shared(config.drive.counts_per_tick);
    let drive: SharedDrive = sim.clone();
    let joystick = Rc::new(VirtualJoystick::new());

    let arcade = scheduler.add_task(ArcadeDrive::new(drive.clone(), joystick, drive_resource))?;
    scheduler.set_default_task(drive_resource, arcade)?;

    let tick_period = config.scheduler.tick_period();
    let mut script: Vec<(u64, TaskId)> = Vec::with_capacity(config.script.len());
    for entry in &config.script {
        let task = build_script_task(entry, &drive, drive_resource, tick_period)?;
        script.push((entry.at_tick, scheduler.add_boxed_task(task)?));
    }

    rt_setup(args.cpu_core, args.rt_priority)?;
    info!(cpu_core = args.cpu_core, priority = args.rt_priority, "RT setup complete");

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })?;

    let mut runner = CycleRunner::new(scheduler, &config.scheduler);
    let mut next = 0;
    runner.run(&running, |s| {
        sim.borrow_mut().advance();

        while let Some(&(at_tick, task)) = script.get(next) {
            if at_tick > s.tick_count() {
                break;
            }
            next += 1;
            let name = s.task_name(task).unwrap_or("?").to_string();
            match s.schedule(task) {
                Ok(()) => info!(task = %name, tick = s.tick_count(), "script task scheduled"),
                Err(e) => warn!(task = %name, error = %e, "script task not scheduled"),
            }
        }
    })?;

    let encoder = sim.borrow().left_encoder().unwrap_or(f64::NAN);
    info!(
        ticks = runner.scheduler().tick_count(),
        faults = runner.faults(),
        left_encoder = encoder,
        "run complete"
    );
    Ok(())
}

/// Setup tracing subscriber from the configured level and CLI flags.
fn setup_tracing(args: &Args, config: Option<&RobotConfig>) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        config.map_or(Level::INFO, |c| c.shared.log_level.into())
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
