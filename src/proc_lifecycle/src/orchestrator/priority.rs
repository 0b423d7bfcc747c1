//! Priority competition: CPU-bound children at different niceness values
//!
//! Each child reports `(pid, niceness, elapsed)` back over a pipe as a single
//! short line, which the kernel writes atomically. Niceness only biases the
//! scheduler under contention, so the ordering is probabilistic; pinning all
//! children to one CPU creates that contention on multi-core hosts.

use super::workload::cpu_bound_task;
use crate::{
    cli::config::PriorityConfig,
    process::{
        priority::{adjust_niceness, get_niceness, pin_to_cpu},
        spawn_child, SpawnBatch, TerminationStatus,
    },
    util::milestone_log::MilestoneLog,
};
use eyre::WrapErr;
use nix::unistd::{getpid, pipe, Pid};
use std::{
    collections::HashMap,
    fs::File,
    io::{Read, Write},
    time::{Duration, Instant},
};
use tracing::{error, warn};

/// One child's result, in termination order
#[derive(Debug, Clone, PartialEq)]
pub struct PriorityOutcome {
    pub pid: Pid,
    /// Increment the child applied to its inherited niceness
    pub requested: i32,
    /// Niceness the child actually ran at, if it reported back
    pub niceness: Option<i32>,
    pub elapsed: Option<Duration>,
    pub status: TerminationStatus,
}

pub fn run(config: &PriorityConfig, log: &MilestoneLog) -> eyre::Result<Vec<PriorityOutcome>> {
    println!("--- Process Prioritization with nice() ---");
    println!(
        "Creating {} CPU-bound child processes with nice values: {:?}",
        config.nice_values.len(),
        config.nice_values
    );
    println!("The child with the lowest nice value (highest priority) should finish first.");
    if let Some(cpu) = config.pin_cpu {
        println!("All children are pinned to CPU {}.", cpu);
    }

    let (read_end, write_end) = pipe().wrap_err("Failed to create result pipe")?;
    let reader = File::from(read_end);
    let writer = File::from(write_end);

    let mut batch = SpawnBatch::new();
    for &nice in &config.nice_values {
        let name = format!("Nice{}", nice);
        let child_log = log.clone();
        let writer = &writer;
        let spawned = spawn_child(&name, move || {
            run_prioritized_child(nice, config.iterations, config.pin_cpu, writer, &child_log)
        });
        match spawned {
            Ok(handle) => batch.push(handle.with_niceness(nice)),
            Err(e) => {
                error!("Failed to spawn child with nice {}: {}", nice, e);
                println!("Parent: Failed to create child with nice {}: {}", nice, e);
            }
        }
    }
    // Children hold their own copies; EOF arrives once they have all exited
    drop(writer);

    let reports = batch
        .reap_any_order()
        .wrap_err("Failed to wait for prioritized children")?;

    let results = read_results(reader);
    let requested: HashMap<Pid, i32> = batch
        .handles()
        .iter()
        .filter_map(|h| h.niceness().map(|n| (h.pid(), n)))
        .collect();

    let outcomes: Vec<PriorityOutcome> = reports
        .iter()
        .map(|report| {
            let result = results.get(&report.pid);
            PriorityOutcome {
                pid: report.pid,
                requested: requested.get(&report.pid).copied().unwrap_or_default(),
                niceness: result.map(|(nice, _)| *nice),
                elapsed: result.map(|(_, elapsed)| *elapsed),
                status: report.status,
            }
        })
        .collect();

    println!("\nParent: All prioritized children have completed.");
    for (rank, outcome) in outcomes.iter().enumerate() {
        match (outcome.niceness, outcome.elapsed) {
            (Some(nice), Some(elapsed)) => println!(
                "  #{} PID {} (nice {}): {:.2}s",
                rank + 1,
                outcome.pid,
                nice,
                elapsed.as_secs_f64()
            ),
            _ => println!(
                "  #{} PID {} did not report ({})",
                rank + 1,
                outcome.pid,
                outcome.status
            ),
        }
    }
    println!();
    log.record("MainProcess", "All prioritized children have completed");

    Ok(outcomes)
}

fn run_prioritized_child(
    nice: i32,
    iterations: u64,
    pin_cpu: Option<usize>,
    writer: &File,
    log: &MilestoneLog,
) -> i32 {
    let pid = getpid();
    if let Some(cpu) = pin_cpu {
        if let Err(e) = pin_to_cpu(cpu) {
            warn!("PID {} could not pin to CPU {}: {}", pid, cpu, e);
        }
    }

    let niceness = match adjust_niceness(nice) {
        Ok(change) => change.after,
        Err(e) => {
            warn!("PID {} could not adjust niceness by {}: {}", pid, nice, e);
            get_niceness().unwrap_or_default()
        }
    };

    let name = format!("Nice{}", nice);
    println!(
        "Child (PID {}, Nice {}): Starting CPU-bound task.",
        pid, niceness
    );
    log.record(&name, "started");

    let start = Instant::now();
    cpu_bound_task(iterations);
    let elapsed = start.elapsed();

    println!(
        "--> Child (PID {}, Nice {}): FINISHED in {:.2}s.",
        pid,
        niceness,
        elapsed.as_secs_f64()
    );
    log.record(
        &name,
        format!("finished in {:.2} seconds", elapsed.as_secs_f64()),
    );

    let line = format_result(pid, niceness, elapsed);
    if let Err(e) = (&*writer).write_all(line.as_bytes()) {
        warn!("PID {} could not report its result: {}", pid, e);
    }
    0
}

fn format_result(pid: Pid, niceness: i32, elapsed: Duration) -> String {
    format!("{} {} {}\n", pid, niceness, elapsed.as_nanos())
}

fn parse_result(line: &str) -> Option<(Pid, i32, Duration)> {
    let mut fields = line.split_whitespace();
    let pid = fields.next()?.parse().ok()?;
    let niceness = fields.next()?.parse().ok()?;
    let nanos: u64 = fields.next()?.parse().ok()?;
    Some((Pid::from_raw(pid), niceness, Duration::from_nanos(nanos)))
}

fn read_results(mut reader: File) -> HashMap<Pid, (i32, Duration)> {
    let mut content = String::new();
    if let Err(e) = reader.read_to_string(&mut content) {
        warn!("Failed to read child results: {}", e);
    }
    content
        .lines()
        .filter_map(parse_result)
        .map(|(pid, nice, elapsed)| (pid, (nice, elapsed)))
        .collect()
}
