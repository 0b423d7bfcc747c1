//! Scenario orchestration
//!
//! Each scenario composes the spawn, exec, wait, priority, and inspection
//! primitives into one demonstrable lifecycle:
//!
//! - `bulk`: spawn N → wait on each PID in spawn order
//! - `commands`: per command, spawn → exec in child → wait for that child
//! - `zombie`: spawn → child exits → parent withholds wait → reap
//! - `orphan`: spawn → parent leaves without waiting
//! - `priority`: spawn per niceness → CPU-bound work → wait in any order
//! - `services`: named services launched concurrently → joined in order
//! - `inspect`: snapshot of any PID

pub mod bulk;
pub mod commands;
pub mod inspect;
pub mod orphan;
pub mod priority;
pub mod services;
pub mod workload;
pub mod zombie;

use crate::{
    cli::{config::RuntimeConfig, options::Task},
    inspect::ProcInspector,
    util::milestone_log::MilestoneLog,
};
use tracing::info;

/// Runs one task with a shared configuration, log handle, and inspector
pub struct Orchestrator {
    config: RuntimeConfig,
    log: MilestoneLog,
    inspector: ProcInspector,
    json: bool,
}

impl Orchestrator {
    pub fn new(config: RuntimeConfig, log: MilestoneLog) -> Self {
        Self {
            config,
            log,
            inspector: ProcInspector::new(),
            json: false,
        }
    }

    /// Print inspection results as JSON
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    pub fn with_inspector(mut self, inspector: ProcInspector) -> Self {
        self.inspector = inspector;
        self
    }

    pub fn run(&self, task: &Task) -> eyre::Result<()> {
        info!("Running task {:?}", task);
        match task {
            Task::Create(count) => {
                bulk::run(*count, &self.config.bulk, &self.log)?;
            }
            Task::Exec(commands) => {
                commands::run(commands, &self.log)?;
            }
            Task::Zombie => {
                zombie::run(&self.config.zombie, &self.inspector, &self.log)?;
            }
            Task::Orphan => {
                orphan::run(&self.config.orphan, &self.log)?;
            }
            Task::Inspect(pid) => {
                inspect::run(&self.inspector, *pid, self.json)?;
            }
            Task::Priority => {
                priority::run(&self.config.priority, &self.log)?;
            }
            Task::Services(names) => {
                services::run(names, &self.config.services, &self.log)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_inspect_task_uses_configured_inspector() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("42");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("status"),
            "Name:\tfixture\nState:\tS (sleeping)\nPid:\t42\nPPid:\t1\n",
        )
        .unwrap();

        let orchestrator = Orchestrator::new(RuntimeConfig::default(), MilestoneLog::disabled())
            .with_inspector(ProcInspector::with_root(tmp.path()))
            .with_json(true);
        orchestrator.run(&Task::Inspect(42)).unwrap();
        // Missing under the fabricated root even if the host has PID 43
        orchestrator.run(&Task::Inspect(43)).unwrap();

        let snapshot = inspect::run(&orchestrator.inspector, 42, true)
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.status.name, "fixture");
        assert!(inspect::run(&orchestrator.inspector, 43, true)
            .unwrap()
            .is_none());
    }
}
