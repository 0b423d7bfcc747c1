use clap::{ArgGroup, Parser};
use std::path::PathBuf;

/// Process lifecycle lab: fork, exec, reap, inspect, and prioritise processes
#[derive(Parser, Debug, Default)]
#[command(name = "proc_lifecycle")]
#[command(version)]
#[command(about = "Create, replace, reap, and inspect child processes")]
#[command(after_help = "Examples:\n  \
    proc_lifecycle --create 3\n  \
    proc_lifecycle --exec \"ls -l\" \"date\" \"no_such_command\"\n  \
    proc_lifecycle --zombie --zombie-delay-secs 5\n  \
    proc_lifecycle --orphan\n  \
    proc_lifecycle --inspect 1 --json\n  \
    proc_lifecycle --priority --pin-cpu 0\n  \
    proc_lifecycle --services")]
#[command(group(ArgGroup::new("task").multiple(false)))]
pub struct Options {
    /// Create N child processes and wait for each in creation order
    #[arg(long, visible_alias = "task1", value_name = "N", group = "task")]
    pub create: Option<usize>,

    /// Execute each command string in its own child, one at a time
    #[arg(long, visible_alias = "task2", value_name = "CMD", num_args = 1.., group = "task")]
    pub exec: Option<Vec<String>>,

    /// Leave a child as a zombie for a while before reaping it
    #[arg(long, group = "task")]
    pub zombie: bool,

    /// Exit before a child does, leaving it orphaned
    #[arg(long, group = "task")]
    pub orphan: bool,

    /// Inspect a process through /proc
    #[arg(long, value_name = "PID", group = "task")]
    pub inspect: Option<i32>,

    /// Run CPU-bound children at different niceness values
    #[arg(long, group = "task")]
    pub priority: bool,

    /// Simulate a service boot sequence (optionally with custom service names)
    #[arg(long, value_name = "NAME", num_args = 0.., group = "task")]
    pub services: Option<Vec<String>>,

    #[command(flatten)]
    pub common: CommonOptions,
}

/// Options shared by every task
#[derive(clap::Args, Debug, Clone, Default)]
pub struct CommonOptions {
    /// Runtime configuration file (YAML)
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Milestone log file (truncated on each run; overrides config file)
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Do not write a milestone log file
    #[arg(long, conflicts_with = "log_file")]
    pub no_log_file: bool,

    /// Print inspection results as JSON
    #[arg(long)]
    pub json: bool,

    /// Seconds the zombie demo waits before reaping (overrides config file)
    #[arg(long, value_name = "SECS")]
    pub zombie_delay_secs: Option<u64>,

    /// Pin priority demo children to one CPU to force contention
    #[arg(long, value_name = "CPU")]
    pub pin_cpu: Option<usize>,

    /// Enable verbose output (INFO level logging).
    /// Use RUST_LOG env var for debug-level logging.
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

/// The single task selected on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    Create(usize),
    Exec(Vec<String>),
    Zombie,
    Orphan,
    Inspect(i32),
    Priority,
    Services(Vec<String>),
}

impl Options {
    /// Resolve the selected task, if any
    pub fn task(&self) -> Option<Task> {
        if let Some(n) = self.create {
            return Some(Task::Create(n));
        }
        if let Some(commands) = &self.exec {
            return Some(Task::Exec(commands.clone()));
        }
        if self.zombie {
            return Some(Task::Zombie);
        }
        if self.orphan {
            return Some(Task::Orphan);
        }
        if let Some(pid) = self.inspect {
            return Some(Task::Inspect(pid));
        }
        if self.priority {
            return Some(Task::Priority);
        }
        self.services.clone().map(Task::Services)
    }
}
