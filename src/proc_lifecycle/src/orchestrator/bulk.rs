//! Bulk spawn: create N children, then wait on each in creation order

use crate::{
    cli::config::BulkConfig,
    process::{spawn_child, Reaped, SpawnBatch},
    util::{logging::is_verbose, milestone_log::MilestoneLog},
};
use eyre::WrapErr;
use nix::unistd::{getpid, getppid};
use std::thread;
use tracing::error;

/// Spawn `count` children, each sleeping a staggered delay before reporting
/// its identity, and reap them in spawn order.
///
/// A failed spawn is reported and skipped; a failed wait aborts the scenario.
pub fn run(count: usize, config: &BulkConfig, log: &MilestoneLog) -> eyre::Result<Vec<Reaped>> {
    println!("--- Creating {} Child Processes ---", count);
    println!("Parent Process PID: {}", getpid());
    log.record("MainProcess", format!("Creating {} child processes", count));

    let mut batch = SpawnBatch::new();
    for index in 0..count {
        let name = format!("Child-{}", index + 1);
        let delay = config.stagger(index);
        let child_log = log.clone();
        let child_name = name.clone();

        let spawned = spawn_child(&name, move || {
            child_log.record(&child_name, "started");
            thread::sleep(delay);
            println!(
                "  -> {}: My PID is {}, My Parent's PID is {}.",
                child_name,
                getpid(),
                getppid()
            );
            child_log.record(&child_name, "finished");
            0
        });

        match spawned {
            Ok(handle) => {
                println!("Parent: Created child with PID: {}", handle.pid());
                if is_verbose() {
                    println!(
                        "Parent: {} created at {}",
                        name,
                        handle.created_at().format("%H:%M:%S%.3f")
                    );
                }
                log.record("MainProcess", format!("Launched {} (PID {})", name, handle.pid()));
                batch.push(handle);
            }
            Err(e) => {
                error!("Failed to spawn {}: {}", name, e);
                println!("Parent: Failed to create {}: {}", name, e);
            }
        }
    }

    let reports = batch
        .reap_in_order()
        .wrap_err("Failed to wait for bulk children")?;
    for report in &reports {
        println!(
            "Parent: Child {} has finished with status {}.",
            report.pid, report.status
        );
    }
    println!("Parent: All children have completed.\n");
    log.record("MainProcess", "All children have completed");

    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fork_guard;
    use std::collections::HashSet;

    #[test]
    fn test_bulk_spawn_reports_every_child() {
        let _guard = fork_guard();

        let config = BulkConfig { stagger_ms: 10 };
        for count in [0usize, 1, 4] {
            let reports = run(count, &config, &MilestoneLog::disabled()).unwrap();
            assert_eq!(reports.len(), count);
            let pids: HashSet<_> = reports.iter().map(|r| r.pid).collect();
            assert_eq!(pids.len(), count);
            assert!(reports.iter().all(|r| r.status.success()));
        }
    }
}
