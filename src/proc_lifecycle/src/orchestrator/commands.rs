//! Spawn-then-exec: run each command in its own child, one at a time

use crate::{
    process::{exec_or_exit, reaper::reap, spawn_child, TerminationStatus},
    util::milestone_log::MilestoneLog,
};
use eyre::WrapErr;
use nix::unistd::{getpid, Pid};
use tracing::{error, info};

/// Outcome of one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub command: String,
    pub pid: Pid,
    pub status: TerminationStatus,
}

/// Execute each command string in a fresh child and wait for it before
/// starting the next.
///
/// A command that cannot be found makes its child exit with
/// [`EXEC_FAILURE_STATUS`](crate::process::EXEC_FAILURE_STATUS); the parent only
/// observes that status. Spawn failures skip the command.
pub fn run(commands: &[String], log: &MilestoneLog) -> eyre::Result<Vec<CommandOutcome>> {
    println!("--- Executing Commands in Children ---");
    println!("Parent Process PID: {}", getpid());

    let mut outcomes = Vec::with_capacity(commands.len());
    for command in commands {
        let child_command = command.clone();
        let child_log = log.clone();
        let spawned = spawn_child("CommandChild", move || {
            println!("\nChild {}: Executing '{}'...", getpid(), child_command);
            child_log.record(
                &format!("Child-{}", getpid()),
                format!("Executing '{}'", child_command),
            );
            exec_or_exit(&child_command)
        });

        let mut handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                error!("Failed to spawn child for '{}': {}", command, e);
                println!("Parent: Failed to run '{}': {}", command, e);
                continue;
            }
        };

        let reaped = reap(&mut handle)
            .wrap_err_with(|| format!("Failed to wait for command '{}'", command))?;
        println!(
            "Parent: Child {} running '{}' {}.",
            reaped.pid, command, reaped.status
        );
        info!("Command '{}' (PID {}) {}", command, reaped.pid, reaped.status);
        log.record(
            "MainProcess",
            format!("Command '{}' (PID {}) {}", command, reaped.pid, reaped.status),
        );
        outcomes.push(CommandOutcome {
            command: command.clone(),
            pid: reaped.pid,
            status: reaped.status,
        });
    }

    println!("\nParent: All commands executed by children.\n");
    Ok(outcomes)
}
