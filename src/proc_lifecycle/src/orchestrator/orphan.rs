//! Orphan induction: the parent leaves before its child

use crate::{
    cli::config::OrphanConfig,
    inspect::ProcInspector,
    process::{spawn_child, ProcessHandle},
    util::milestone_log::MilestoneLog,
};
use eyre::WrapErr;
use nix::unistd::{getpid, getppid};
use std::thread;

/// Spawn a child that outlives this process, then abandon it.
///
/// The returned handle is already `Orphaned`; the caller is expected to exit
/// without waiting. The child's own termination is collected by whichever
/// process it is re-parented to.
pub fn run(config: &OrphanConfig, log: &MilestoneLog) -> eyre::Result<ProcessHandle> {
    println!("--- Simulating an Orphan Process ---");

    let child_delay = config.child_delay();
    let child_log = log.clone();
    let mut handle = spawn_child("OrphanChild", move || {
        let pid = getpid();
        let original_parent = getppid();
        println!("Child ({}): My parent is {}.", pid, original_parent);
        println!("Child: My parent is about to die. I will be an orphan.");

        thread::sleep(child_delay);

        let new_parent = getppid();
        println!(
            "Child ({}): I am an orphan. My new parent is {} (usually init/systemd PID 1).",
            pid, new_parent
        );
        match ProcInspector::new().status(pid.as_raw()) {
            Ok(record) => println!("Child ({}): /proc reports PPid {}.", pid, record.ppid),
            Err(e) => println!("Child ({}): unable to read own status: {}", pid, e),
        }
        child_log.record(
            "OrphanChild",
            format!("re-parented from {} to {}", original_parent, new_parent),
        );
        println!("Child: I will now exit.");
        0
    })
    .wrap_err("Failed to spawn orphan child")?;

    println!(
        "Parent ({}): I am exiting now, leaving my child ({}) as an orphan.",
        getpid(),
        handle.pid()
    );
    log.record(
        "MainProcess",
        format!("Exiting without waiting for PID {}", handle.pid()),
    );

    // Let the child print its first lines before the parent goes away
    thread::sleep(config.parent_grace());
    handle.abandon();
    Ok(handle)
}
