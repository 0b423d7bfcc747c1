//! Service boot simulation: launch named services concurrently and join them

use crate::{
    cli::config::ServicesConfig,
    process::{spawn_child, SpawnBatch, TerminationStatus},
    util::milestone_log::MilestoneLog,
};
use eyre::WrapErr;
use nix::unistd::Pid;
use rand::Rng;
use std::{thread, time::Duration};
use tracing::error;

/// One service's planned work and how it ended
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceOutcome {
    pub name: String,
    pub pid: Pid,
    pub planned: Duration,
    pub status: TerminationStatus,
}

/// Boot every service in `names` (or the configured defaults when empty),
/// then shut down once all of them have finished.
pub fn run(
    names: &[String],
    config: &ServicesConfig,
    log: &MilestoneLog,
) -> eyre::Result<Vec<ServiceOutcome>> {
    let names = if names.is_empty() {
        config.names.as_slice()
    } else {
        names
    };

    log.record("MainProcess", "System boot sequence initiated.");
    println!("System Starting...");

    // Durations are drawn before forking so children never share RNG state
    let (min, max) = config.window();
    let mut rng = rand::thread_rng();
    let plans: Vec<(String, Duration)> = names
        .iter()
        .map(|name| {
            let secs = rng.gen_range(min..=max);
            (name.clone(), Duration::from_secs_f64(secs))
        })
        .collect();

    let mut batch = SpawnBatch::new();
    let mut planned = Vec::with_capacity(plans.len());
    for (name, duration) in plans {
        let child_log = log.clone();
        let service = name.clone();
        let spawned = spawn_child(&name, move || system_service(&service, duration, &child_log));
        match spawned {
            Ok(handle) => {
                log.record("MainProcess", format!("Launched {}.", name));
                planned.push((name, duration));
                batch.push(handle);
            }
            Err(e) => {
                error!("Failed to launch {}: {}", name, e);
                println!("Failed to launch {}: {}", name, e);
            }
        }
    }

    log.record(
        "MainProcess",
        "All services launched. Main process is now waiting for them to complete.",
    );
    println!("All services are running concurrently...");

    let reports = batch
        .reap_in_order()
        .wrap_err("Failed to wait for services")?;

    log.record(
        "MainProcess",
        "All services have completed. System is shutting down.",
    );
    println!("System Shutdown Gracefully.");

    Ok(planned
        .into_iter()
        .zip(reports)
        .map(|((name, planned), report)| ServiceOutcome {
            name,
            pid: report.pid,
            planned,
            status: report.status,
        })
        .collect())
}

fn system_service(name: &str, duration: Duration, log: &MilestoneLog) -> i32 {
    log.record(name, format!("Service '{}' started.", name));
    thread::sleep(duration);
    log.record(
        name,
        format!(
            "Service '{}' finished in {:.2} seconds.",
            name,
            duration.as_secs_f64()
        ),
    );
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fork_guard;
    use std::fs;

    #[test]
    fn test_services_log_milestones_in_order() {
        let _guard = fork_guard();
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("process_log.txt");
        let log = MilestoneLog::create(&path).unwrap();

        let config = ServicesConfig {
            names: vec!["Alpha".to_string(), "Beta".to_string()],
            min_secs: 0.05,
            max_secs: 0.1,
        };
        let outcomes = run(&[], &config, &log).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].name, "Alpha");
        assert_eq!(outcomes[1].name, "Beta");
        assert!(outcomes.iter().all(|o| o.status.success()));
        assert!(outcomes.iter().all(|o| o.planned >= Duration::from_millis(49)
            && o.planned <= Duration::from_millis(101)));

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert!(lines.first().unwrap().ends_with("MainProcess - System boot sequence initiated."));
        assert!(lines
            .last()
            .unwrap()
            .ends_with("MainProcess - All services have completed. System is shutting down."));
        for name in ["Alpha", "Beta"] {
            assert!(content.contains(&format!("{} - Service '{}' started.", name, name)));
            assert!(content.contains(&format!("Launched {}.", name)));
            let started = lines
                .iter()
                .position(|l| l.ends_with(&format!("Service '{}' started.", name)))
                .unwrap();
            let finished = lines
                .iter()
                .position(|l| l.contains(&format!("Service '{}' finished in", name)))
                .unwrap();
            assert!(started < finished);
        }
    }
}
