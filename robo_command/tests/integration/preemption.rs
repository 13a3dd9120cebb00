//! Integration test: multi-resource preemption and default re-arming.

use robo_command::{ResourceId, ResourceSet, Scheduler, SchedulerError, TaskExit, TaskId};

use super::{Recorder, Trace, drain, new_trace};

/// Every resource owned by at most one active task requiring it.
fn assert_exclusive(s: &Scheduler, resources: &[ResourceId]) {
    for &r in resources {
        if let Some(owner) = s.owner(r) {
            assert!(s.is_active(owner), "{r} owned by inactive task {owner}");
            assert!(s.requirements(owner).unwrap().contains(r));
        }
    }
    for &t in s.active_tasks() {
        for r in s.requirements(t).unwrap() {
            assert_eq!(s.owner(r), Some(t), "{t} lost {r}");
        }
    }
}

struct Rig {
    s: Scheduler,
    trace: Trace,
    drive: ResourceId,
    arm: ResourceId,
    intake: ResourceId,
}

fn rig() -> Rig {
    let mut s = Scheduler::new();
    let drive = s.register_resource("drive").unwrap();
    let arm = s.register_resource("arm").unwrap();
    let intake = s.register_resource("intake").unwrap();
    Rig {
        s,
        trace: new_trace(),
        drive,
        arm,
        intake,
    }
}

impl Rig {
    fn add(&mut self, task: Recorder) -> TaskId {
        self.s.add_task(task).unwrap()
    }

    fn all(&self) -> [ResourceId; 3] {
        [self.drive, self.arm, self.intake]
    }
}

#[test]
fn new_task_interrupts_all_conflicting_owners_first() {
    let mut c = rig();
    let t = c.add(Recorder::new("T", ResourceSet::single(c.drive), &c.trace));
    let u = c.add(Recorder::new("U", ResourceSet::single(c.arm), &c.trace));
    let bystander = c.add(Recorder::new("B", ResourceSet::single(c.intake), &c.trace));
    let n = c.add(Recorder::new(
        "N",
        ResourceSet::single(c.drive).with(c.arm),
        &c.trace,
    ));
    for id in [t, u, bystander] {
        c.s.schedule(id).unwrap();
    }
    drain(&c.trace);

    c.s.schedule(n).unwrap();
    assert_eq!(
        drain(&c.trace),
        [("T", "interrupted"), ("U", "interrupted"), ("N", "initialize")]
    );
    assert_eq!(c.s.active_tasks(), &[bystander, n]);
    assert_exclusive(&c.s, &c.all());
}

#[test]
fn defaults_return_on_every_freed_resource() {
    let mut c = rig();
    let drive_default = c.add(Recorder::new("DriveIdle", ResourceSet::single(c.drive), &c.trace));
    let arm_default = c.add(Recorder::new("ArmHold", ResourceSet::single(c.arm), &c.trace));
    let combo = c.add(
        Recorder::new("Combo", ResourceSet::single(c.drive).with(c.arm), &c.trace).runs(3),
    );
    c.s.set_default_task(c.drive, drive_default).unwrap();
    c.s.set_default_task(c.arm, arm_default).unwrap();
    drain(&c.trace);

    c.s.schedule(combo).unwrap();
    assert_eq!(
        drain(&c.trace),
        [
            ("DriveIdle", "interrupted"),
            ("ArmHold", "interrupted"),
            ("Combo", "initialize")
        ]
    );

    for _ in 0..3 {
        c.s.tick().unwrap();
    }
    let trace = drain(&c.trace);
    assert_eq!(
        &trace[trace.len() - 3..],
        [
            ("Combo", "end"),
            ("DriveIdle", "initialize"),
            ("ArmHold", "initialize")
        ]
    );
    assert_eq!(c.s.owner(c.drive), Some(drive_default));
    assert_eq!(c.s.owner(c.arm), Some(arm_default));
    assert_eq!(c.s.owner(c.intake), None);
    assert_exclusive(&c.s, &c.all());
}

#[test]
fn every_activation_gets_exactly_one_terminal_callback() {
    let mut c = rig();
    let a = c.add(Recorder::new("A", ResourceSet::single(c.drive), &c.trace).runs(2));
    let b = c.add(Recorder::new(
        "B",
        ResourceSet::single(c.drive).with(c.arm),
        &c.trace,
    ).runs(3));
    let z = c.add(Recorder::new("Z", ResourceSet::EMPTY, &c.trace).runs(5));

    // A mix of completions, preemptions and a cancellation.
    let plan: [&[TaskId]; 6] = [&[a, z], &[b], &[], &[a], &[], &[b]];
    for step in plan {
        for &id in step {
            let _ = c.s.schedule(id);
        }
        c.s.tick().unwrap();
        assert_exclusive(&c.s, &c.all());
    }
    for id in [a, b, z] {
        c.s.cancel(id).unwrap();
    }

    let trace = drain(&c.trace);
    for name in ["A", "B", "Z"] {
        let count = |cb: &str| trace.iter().filter(|(n, k)| *n == name && *k == cb).count();
        assert_eq!(
            count("initialize"),
            count("end") + count("interrupted"),
            "{name}: {trace:?}"
        );
    }
    assert!(c.s.active_tasks().is_empty());
}

#[test]
fn rejected_schedule_leaves_no_trace() {
    let mut c = rig();
    let ghost = ResourceId::from_raw(40).unwrap();
    let holder = c.add(Recorder::new("Holder", ResourceSet::single(c.drive), &c.trace));
    let bad = c.add(Recorder::new(
        "Bad",
        ResourceSet::single(c.drive).with(ghost),
        &c.trace,
    ));
    c.s.schedule(holder).unwrap();
    drain(&c.trace);

    assert_eq!(c.s.schedule(bad), Err(SchedulerError::UnknownResource(ghost)));
    assert!(matches!(
        c.s.schedule(holder),
        Err(SchedulerError::AlreadyActive { .. })
    ));
    assert!(drain(&c.trace).is_empty());
    assert_eq!(c.s.owner(c.drive), Some(holder));
    assert_eq!(c.s.last_exit(holder), None);
}

#[test]
fn preempted_task_can_be_rescheduled() {
    let mut c = rig();
    let t = c.add(Recorder::new("T", ResourceSet::single(c.arm), &c.trace));
    let n = c.add(Recorder::new("N", ResourceSet::single(c.arm), &c.trace).runs(1));

    c.s.schedule(t).unwrap();
    c.s.schedule(n).unwrap();
    assert_eq!(c.s.last_exit(t), Some(TaskExit::Interrupted));
    c.s.tick().unwrap();

    c.s.schedule(t).unwrap();
    assert_eq!(c.s.activations(t), 2);
    assert_eq!(c.s.owner(c.arm), Some(t));
}
