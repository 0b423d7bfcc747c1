//! Zombie induction: let a child terminate and withhold the wait for a while

use crate::{
    cli::config::ZombieConfig,
    error::LifecycleError,
    inspect::{ProcInspector, ProcState},
    process::{reaper::reap, spawn_child, ChildState, TerminationStatus},
    util::milestone_log::MilestoneLog,
};
use eyre::WrapErr;
use nix::unistd::{getpid, Pid};
use std::{
    thread,
    time::{Duration, Instant},
};
use tracing::{debug, warn};

/// What the parent saw before and after reaping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZombieReport {
    pub pid: Pid,
    /// State seen through `/proc` during the delay window
    pub observed_state: Option<ProcState>,
    pub status: TerminationStatus,
    /// `/proc` no longer lists the PID after the wait
    pub gone_after_reap: bool,
}

pub fn run(
    config: &ZombieConfig,
    inspector: &ProcInspector,
    log: &MilestoneLog,
) -> eyre::Result<ZombieReport> {
    println!("--- Simulating a Zombie Process ---");

    let child_log = log.clone();
    let mut handle = spawn_child("ZombieChild", move || {
        println!(
            "Child ({}): I am alive but will exit immediately.",
            getpid()
        );
        child_log.record("ZombieChild", "exiting immediately");
        0
    })
    .wrap_err("Failed to spawn zombie child")?;
    let pid = handle.pid();

    let delay = config.delay();
    println!(
        "Parent ({}): I created a child ({}) but I will not wait for it.",
        getpid(),
        pid
    );
    println!(
        "Parent: I am going to sleep for {} seconds.",
        delay.as_secs_f64()
    );
    println!(">>> NOW, open a new terminal and run: ps -el | grep 'Z'");
    println!(
        ">>> You should see a process with PID {} marked as <defunct>.",
        pid
    );
    log.record("MainProcess", format!("Withholding wait on PID {}", pid));

    let window_end = Instant::now() + delay;
    let observed_state = observe_zombie(inspector, pid, window_end, config.poll_interval());
    match observed_state {
        Some(state) => {
            handle.observe(ChildState::Zombie);
            println!("Parent: /proc reports child {} in state {}.", pid, state);
        }
        None => debug!("Child {} not observed as a zombie before the window closed", pid),
    }

    let remaining = window_end.saturating_duration_since(Instant::now());
    thread::sleep(remaining);

    let reaped = reap(&mut handle).wrap_err("Failed to reap zombie child")?;
    let gone_after_reap = match inspector.status(pid.as_raw()) {
        Err(LifecycleError::ProcessNotFound(_)) => true,
        Ok(record) => {
            warn!(
                "PID {} still listed after reaping (state {}); likely reused",
                pid, record.state
            );
            false
        }
        Err(e) => {
            warn!("Failed to check PID {} after reaping: {}", pid, e);
            false
        }
    };

    println!(
        "Parent: Woke up and reaped the child ({}). The zombie is gone.\n",
        reaped.status
    );
    log.record("MainProcess", format!("Reaped zombie PID {}", pid));

    Ok(ZombieReport {
        pid,
        observed_state,
        status: reaped.status,
        gone_after_reap,
    })
}

/// Poll the child's status record until it shows `Z` or the window closes
fn observe_zombie(
    inspector: &ProcInspector,
    pid: Pid,
    window_end: Instant,
    poll_interval: Duration,
) -> Option<ProcState> {
    loop {
        match inspector.status(pid.as_raw()) {
            Ok(record) if record.state.is_zombie() => return Some(record.state),
            Ok(_) => {}
            Err(e) => {
                warn!("Failed to inspect child {}: {}", pid, e);
                return None;
            }
        }
        let now = Instant::now();
        if now >= window_end {
            return None;
        }
        thread::sleep(poll_interval.min(window_end - now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fork_guard;

    #[test]
    fn test_zombie_is_observed_then_reaped() {
        let _guard = fork_guard();

        let config = ZombieConfig {
            delay_secs: 2,
            poll_interval_ms: 10,
        };
        let report = run(&config, &ProcInspector::new(), &MilestoneLog::disabled()).unwrap();
        assert_eq!(report.observed_state, Some(ProcState::Zombie));
        assert_eq!(report.status, TerminationStatus::Exited(0));
        assert!(report.gone_after_reap);
    }
}
