use clap::Parser;
use eyre::Context;
use proc_lifecycle::{
    cli::{
        config::load_runtime_config,
        options::{Options, Task},
    },
    orchestrator::Orchestrator,
    util::{logging::init_tracing, milestone_log::MilestoneLog},
};
use tracing::debug;

fn main() -> eyre::Result<()> {
    // Parse command-line options first (before initializing tracing)
    let opts = Options::parse();
    init_tracing(opts.common.verbose);

    let Some(task) = opts.task() else {
        println!("Please specify a task to run. Use --help for options.");
        return Ok(());
    };

    let mut config = load_runtime_config(opts.common.config.as_deref())?;
    config.apply_overrides(&opts.common);
    debug!("Runtime config: {:?}", config);

    // Inspection is read-only; it never touches the milestone log
    let log = match (&task, &config.log_file) {
        (Task::Inspect(_), _) | (_, None) => MilestoneLog::disabled(),
        (_, Some(path)) => {
            MilestoneLog::create(path).wrap_err("Failed to initialize milestone log")?
        }
    };

    // Everything below forks; no threads may be started before this point
    Orchestrator::new(config, log)
        .with_json(opts.common.json)
        .run(&task)
}
