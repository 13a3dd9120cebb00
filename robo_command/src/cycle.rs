//! Fixed-period cycle driver: pre-tick hook → `Scheduler::tick()` → sleep.
//!
//! ## RT Setup Sequence
//! 1. `mlockall(MCL_CURRENT | MCL_FUTURE)`: lock all pages.
//! 2. Prefault stack pages.
//! 3. `sched_setaffinity`: pin to a CPU core.
//! 4. `sched_setscheduler(SCHED_FIFO, prio)`: RT priority.
//!
//! Without the `rt` feature every step is a no-op and the loop paces itself
//! with `std::thread::sleep`.
//!
//! ## Cycle Loop
//! With `rt`: absolute-time sleep on `CLOCK_MONOTONIC` for drift-free pacing.
//! Overruns are counted and logged, never fatal: a slow tick only delays
//! the next one. Task faults are logged; with `stop_on_fault` the first one
//! ends the loop.

use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tracing::{info, warn};

use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use crate::scheduler::Scheduler;

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-cycle timing statistics.
#[derive(Debug, Clone)]
pub struct CycleStats {
    /// Total cycles executed.
    pub cycle_count: u64,
    /// Last cycle duration [ns].
    pub last_cycle_ns: i64,
    /// Minimum cycle duration [ns].
    pub min_cycle_ns: i64,
    /// Maximum cycle duration [ns].
    pub max_cycle_ns: i64,
    /// Running sum for average computation.
    pub sum_cycle_ns: i64,
    /// Number of overruns detected.
    pub overruns: u64,
    /// Maximum wake-up latency [ns] (time between expected and actual wake).
    pub max_latency_ns: i64,
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

impl CycleStats {
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_ns: 0,
            min_cycle_ns: i64::MAX,
            max_cycle_ns: 0,
            sum_cycle_ns: 0,
            overruns: 0,
            max_latency_ns: 0,
        }
    }

    /// Record a cycle duration. O(1), no allocation.
    #[inline]
    pub fn record(&mut self, duration_ns: i64, latency_ns: i64) {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        self.min_cycle_ns = self.min_cycle_ns.min(duration_ns);
        self.max_cycle_ns = self.max_cycle_ns.max(duration_ns);
        self.sum_cycle_ns = self.sum_cycle_ns.saturating_add(duration_ns);
        self.max_latency_ns = self.max_latency_ns.max(latency_ns);
    }

    /// Average cycle time [ns] (returns 0 if no cycles).
    #[inline]
    pub fn avg_cycle_ns(&self) -> i64 {
        if self.cycle_count == 0 {
            0
        } else {
            self.sum_cycle_ns / self.cycle_count as i64
        }
    }
}

// ─── Errors ─────────────────────────────────────────────────────────

/// Errors during RT setup or cycle execution.
#[derive(Debug, Error)]
pub enum CycleError {
    /// RT system call failed.
    #[error("RT setup error: {0}")]
    RtSetup(String),

    /// Task fault with `stop_on_fault` set.
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

// ─── RT Setup ───────────────────────────────────────────────────────

#[cfg(feature = "rt")]
fn rt_mlockall() -> Result<(), CycleError> {
    use nix::sys::mman::{MlockallFlags, mlockall};
    mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
        .map_err(|e| CycleError::RtSetup(format!("mlockall failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_mlockall() -> Result<(), CycleError> {
    Ok(())
}

/// Touch 256 KiB of stack so the loop never page-faults on it.
fn prefault_stack() {
    let mut buf = [0u8; 256 * 1024];
    for byte in buf.iter_mut() {
        // SAFETY: `byte` is a valid, exclusive reference into `buf`.
        unsafe { core::ptr::write_volatile(byte, 0xFF) };
    }
    core::hint::black_box(&buf);
}

#[cfg(feature = "rt")]
fn rt_set_affinity(cpu: usize) -> Result<(), CycleError> {
    use nix::sched::{CpuSet, sched_setaffinity};
    use nix::unistd::Pid;

    let mut cpuset = CpuSet::new();
    cpuset
        .set(cpu)
        .map_err(|e| CycleError::RtSetup(format!("CpuSet::set({cpu}) failed: {e}")))?;
    sched_setaffinity(Pid::from_raw(0), &cpuset)
        .map_err(|e| CycleError::RtSetup(format!("sched_setaffinity failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_set_affinity(_cpu: usize) -> Result<(), CycleError> {
    Ok(())
}

#[cfg(feature = "rt")]
fn rt_set_scheduler(priority: i32) -> Result<(), CycleError> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    // SAFETY: `param` outlives the call; pid 0 is the calling thread.
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        return Err(CycleError::RtSetup(format!(
            "sched_setscheduler(SCHED_FIFO, {priority}) failed: {err}"
        )));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_scheduler(_priority: i32) -> Result<(), CycleError> {
    Ok(())
}

/// Perform the RT setup sequence. Call before `CycleRunner::run`.
pub fn rt_setup(cpu_core: usize, rt_priority: i32) -> Result<(), CycleError> {
    rt_mlockall()?;
    prefault_stack();
    rt_set_affinity(cpu_core)?;
    rt_set_scheduler(rt_priority)?;
    Ok(())
}

// ─── Cycle Runner ───────────────────────────────────────────────────

/// Owns the scheduler and calls `tick()` once per period.
pub struct CycleRunner {
    scheduler: Scheduler,
    stats: CycleStats,
    /// Tick period [ns].
    cycle_time_ns: i64,
    stop_on_fault: bool,
    max_ticks: Option<u64>,
    faults: u64,
}

impl CycleRunner {
    pub fn new(scheduler: Scheduler, config: &SchedulerConfig) -> Self {
        Self {
            scheduler,
            stats: CycleStats::new(),
            cycle_time_ns: i64::try_from(config.tick_period().as_nanos()).unwrap_or(i64::MAX),
            stop_on_fault: config.stop_on_fault,
            max_ticks: config.max_ticks,
            faults: 0,
        }
    }

    #[inline]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    #[inline]
    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    #[inline]
    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    /// Task faults seen so far.
    #[inline]
    pub fn faults(&self) -> u64 {
        self.faults
    }

    /// Run until `running` is cleared or `max_ticks` ticks have run.
    ///
    /// `pre_tick` runs at the start of every cycle, before `tick()`; it is
    /// where input glue schedules tasks and sensors are sampled.
    ///
    /// # Errors
    /// The first task fault if `stop_on_fault` is set; RT clock failures.
    pub fn run<F>(&mut self, running: &AtomicBool, pre_tick: F) -> Result<(), CycleError>
    where
        F: FnMut(&mut Scheduler),
    {
        info!(
            cycle_time_ns = self.cycle_time_ns,
            max_ticks = ?self.max_ticks,
            "entering cycle loop"
        );

        #[cfg(feature = "rt")]
        let result = self.run_rt_loop(running, pre_tick);

        #[cfg(not(feature = "rt"))]
        let result = self.run_sim_loop(running, pre_tick);

        info!(
            cycles = self.stats.cycle_count,
            avg_ns = self.stats.avg_cycle_ns(),
            max_ns = self.stats.max_cycle_ns,
            overruns = self.stats.overruns,
            faults = self.faults,
            "cycle loop stopped"
        );
        result
    }

    fn should_continue(&self, running: &AtomicBool) -> bool {
        running.load(Ordering::SeqCst)
            && self
                .max_ticks
                .is_none_or(|max| self.scheduler.tick_count() < max)
    }

    /// RT cycle loop using `clock_nanosleep(TIMER_ABSTIME)`.
    #[cfg(feature = "rt")]
    fn run_rt_loop<F>(&mut self, running: &AtomicBool, mut pre_tick: F) -> Result<(), CycleError>
    where
        F: FnMut(&mut Scheduler),
    {
        use nix::time::{ClockId, ClockNanosleepFlags, clock_gettime, clock_nanosleep};

        let clock = ClockId::CLOCK_MONOTONIC;
        let now = || {
            clock_gettime(clock).map_err(|e| CycleError::RtSetup(format!("clock_gettime: {e}")))
        };
        let mut next_wake = now()?;

        while self.should_continue(running) {
            let cycle_start = now()?;
            let wake_latency_ns = timespec_diff_ns(&cycle_start, &next_wake).abs();
            next_wake = timespec_add_ns(next_wake, self.cycle_time_ns);

            self.cycle_body(&mut pre_tick)?;

            let duration_ns = timespec_diff_ns(&now()?, &cycle_start);
            self.record(duration_ns, wake_latency_ns);

            let _ = clock_nanosleep(clock, ClockNanosleepFlags::TIMER_ABSTIME, &next_wake);
        }
        Ok(())
    }

    /// Simulation cycle loop using `std::thread::sleep`.
    #[cfg(not(feature = "rt"))]
    fn run_sim_loop<F>(&mut self, running: &AtomicBool, mut pre_tick: F) -> Result<(), CycleError>
    where
        F: FnMut(&mut Scheduler),
    {
        use std::time::{Duration, Instant};

        let cycle_duration = Duration::from_nanos(self.cycle_time_ns.unsigned_abs());

        while self.should_continue(running) {
            let cycle_start = Instant::now();

            self.cycle_body(&mut pre_tick)?;

            let elapsed = cycle_start.elapsed();
            self.record(i64::try_from(elapsed.as_nanos()).unwrap_or(i64::MAX), 0);

            if let Some(remaining) = cycle_duration.checked_sub(elapsed) {
                std::thread::sleep(remaining);
            }
        }
        Ok(())
    }

    fn cycle_body<F>(&mut self, pre_tick: &mut F) -> Result<(), CycleError>
    where
        F: FnMut(&mut Scheduler),
    {
        pre_tick(&mut self.scheduler);

        match self.scheduler.tick() {
            Ok(()) => Ok(()),
            Err(e) => {
                self.faults += 1;
                warn!(tick = self.scheduler.tick_count(), faults = self.faults, "tick reported a task fault");
                if self.stop_on_fault {
                    Err(e.into())
                } else {
                    Ok(())
                }
            }
        }
    }

    fn record(&mut self, duration_ns: i64, latency_ns: i64) {
        self.stats.record(duration_ns, latency_ns);
        if duration_ns > self.cycle_time_ns {
            self.stats.overruns += 1;
            warn!(
                tick = self.scheduler.tick_count(),
                actual_ns = duration_ns,
                budget_ns = self.cycle_time_ns,
                "cycle overrun"
            );
        }
    }
}

// ─── Time Helpers ───────────────────────────────────────────────────

#[cfg(feature = "rt")]
fn timespec_add_ns(ts: nix::sys::time::TimeSpec, ns: i64) -> nix::sys::time::TimeSpec {
    use nix::sys::time::TimeSpec;
    let total = ts.tv_nsec() + ns;
    TimeSpec::new(
        ts.tv_sec() + total.div_euclid(1_000_000_000),
        total.rem_euclid(1_000_000_000),
    )
}

/// Difference `a - b` in nanoseconds.
#[cfg(feature = "rt")]
fn timespec_diff_ns(a: &nix::sys::time::TimeSpec, b: &nix::sys::time::TimeSpec) -> i64 {
    (a.tv_sec() - b.tv_sec()) * 1_000_000_000 + (a.tv_nsec() - b.tv_nsec())
}

// ─── Tests ──────────────────────────────────────────────────────────
