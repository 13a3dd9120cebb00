//! Integration test: arcade default task, scripted drive tasks, cycle runner.

use std::rc::Rc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use robo_command::config::load_config_from_str;
use robo_command::cycle::CycleRunner;
use robo_command::drive::{DriveTrain, SharedDrive, SimDrive};
use robo_command::input::VirtualJoystick;
use robo_command::tasks::{ArcadeDrive, DriveForDistance, DriveForTime, build_script_task};
use robo_command::{ResourceId, Scheduler, TaskExit, TaskId, TaskState};

struct Robot {
    scheduler: Scheduler,
    sim: Rc<std::cell::RefCell<SimDrive>>,
    drive: SharedDrive,
    joystick: Rc<VirtualJoystick>,
    drive_resource: ResourceId,
    arcade: TaskId,
}

fn robot(counts_per_tick: f64) -> Robot {
    let mut scheduler = Scheduler::new();
    let drive_resource = scheduler.register_resource("drive").unwrap();
    let sim = SimDrive::shared(counts_per_tick);
    let drive: SharedDrive = sim.clone();
    let joystick = Rc::new(VirtualJoystick::new());
    let arcade = scheduler
        .add_task(ArcadeDrive::new(drive.clone(), joystick.clone(), drive_resource))
        .unwrap();
    scheduler.set_default_task(drive_resource, arcade).unwrap();

    Robot {
        scheduler,
        sim,
        drive,
        joystick,
        drive_resource,
        arcade,
    }
}

impl Robot {
    /// One control cycle: physics, then scheduler.
    fn cycle(&mut self) {
        self.sim.borrow_mut().advance();
        self.scheduler.tick().unwrap();
    }
}

#[test]
fn arcade_owns_drive_at_startup() {
    let mut r = robot(10.0);
    assert_eq!(r.scheduler.owner(r.drive_resource), Some(r.arcade));

    r.joystick.set(0.0, 0.5);
    r.cycle();
    assert_eq!(r.sim.borrow().power(), (0.125, 0.125));
}

#[test]
fn drive_for_distance_then_arcade_resumes() {
    let mut r = robot(10.0);
    r.joystick.set(0.0, 0.5);
    r.cycle();

    let dfd = r
        .scheduler
        .add_task(DriveForDistance::new(r.drive.clone(), r.drive_resource, 0.5, 100.0))
        .unwrap();
    r.scheduler.schedule(dfd).unwrap();

    assert_eq!(r.scheduler.state(r.arcade), Some(TaskState::Idle));
    assert_eq!(r.scheduler.last_exit(r.arcade), Some(TaskExit::Interrupted));
    assert_eq!(r.scheduler.owner(r.drive_resource), Some(dfd));
    assert_eq!(r.sim.borrow().power(), (0.5, 0.5));
    assert_eq!(r.sim.borrow().left_encoder(), Ok(0.0));

    // 5 counts per tick at half power.
    let mut cycles = 0;
    while r.scheduler.is_active(dfd) {
        r.cycle();
        cycles += 1;
        assert!(cycles <= 100, "DriveForDistance never finished");
    }
    assert_eq!(cycles, 20);
    assert_eq!(r.scheduler.last_exit(dfd), Some(TaskExit::Completed));
    assert_eq!(r.sim.borrow().power(), (0.0, 0.0));

    // Arcade re-armed in the same tick, executes on the next.
    assert_eq!(r.scheduler.owner(r.drive_resource), Some(r.arcade));
    assert_eq!(r.scheduler.activations(r.arcade), 2);
    r.cycle();
    assert_eq!(r.sim.borrow().power(), (0.125, 0.125));
}

#[test]
fn distance_task_preempts_time_task() {
    let mut r = robot(10.0);
    let dft = r
        .scheduler
        .add_task(DriveForTime::new(
            r.drive.clone(),
            r.drive_resource,
            -0.3,
            Duration::from_secs(5),
            Duration::from_millis(10),
        ))
        .unwrap();
    let dfd = r
        .scheduler
        .add_task(DriveForDistance::new(r.drive.clone(), r.drive_resource, 0.8, 40.0))
        .unwrap();

    r.scheduler.schedule(dft).unwrap();
    r.cycle();
    assert_eq!(r.sim.borrow().power(), (-0.3, -0.3));

    r.scheduler.schedule(dfd).unwrap();
    assert_eq!(r.scheduler.last_exit(dft), Some(TaskExit::Interrupted));
    assert_eq!(r.sim.borrow().power(), (0.8, 0.8));
    assert_eq!(r.scheduler.active_tasks(), &[dfd]);
}

#[test]
fn drive_for_time_counts_ticks() {
    let mut r = robot(10.0);
    let dft = r
        .scheduler
        .add_task(DriveForTime::new(
            r.drive.clone(),
            r.drive_resource,
            0.4,
            Duration::from_millis(50),
            Duration::from_millis(10),
        ))
        .unwrap();
    r.scheduler.schedule(dft).unwrap();

    for _ in 0..4 {
        r.cycle();
        assert!(r.scheduler.is_active(dft));
    }
    r.cycle();
    assert_eq!(r.scheduler.last_exit(dft), Some(TaskExit::Completed));
    assert_eq!(r.scheduler.owner(r.drive_resource), Some(r.arcade));
}

#[test]
fn scripted_run_through_cycle_runner() {
    let config = load_config_from_str(
        r#"
[shared]
service_name = "scenario"

[scheduler]
tick_period_us = 1000
max_ticks = 40

[drive]
counts_per_tick = 10.0

[[script]]
at_tick = 5
task = "drive_for_distance"
power = 1.0
distance = 50.0
"#,
    )
    .unwrap();

    let mut r = robot(config.drive.counts_per_tick);
    let script: Vec<(u64, TaskId)> = config
        .script
        .iter()
        .map(|entry| {
            let task = build_script_task(
                entry,
                &r.drive,
                r.drive_resource,
                config.scheduler.tick_period(),
            )
            .unwrap();
            (entry.at_tick, r.scheduler.add_boxed_task(task).unwrap())
        })
        .collect();
    let (_, dfd) = script[0];

    let sim = r.sim.clone();
    let mut runner = CycleRunner::new(r.scheduler, &config.scheduler);
    let running = AtomicBool::new(true);
    let mut next = 0;
    runner
        .run(&running, |s| {
            sim.borrow_mut().advance();
            while next < script.len() && script[next].0 <= s.tick_count() {
                s.schedule(script[next].1).unwrap();
                next += 1;
            }
        })
        .unwrap();

    let s = runner.scheduler();
    assert_eq!(s.tick_count(), 40);
    assert_eq!(s.activations(dfd), 1);
    assert_eq!(s.last_exit(dfd), Some(TaskExit::Completed));
    assert_eq!(s.owner(r.drive_resource), Some(r.arcade));
    assert_eq!(s.activations(r.arcade), 2);
    assert_eq!(runner.faults(), 0);
}
