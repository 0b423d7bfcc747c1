//! Process lifecycle management on Linux
//!
//! Creates children with fork, replaces their image with exec, reaps them
//! with wait, adjusts their scheduling niceness, and inspects any process
//! through `/proc`. The `orchestrator` module composes these into the
//! bulk-spawn, exec, zombie, orphan, priority, and service-boot scenarios.

pub mod cli;
pub mod error;
pub mod inspect;
pub mod orchestrator;
pub mod process;
pub mod util;

pub use error::{LifecycleError, Result};

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{Mutex, MutexGuard};

    static FORK_LOCK: Mutex<()> = Mutex::new(());

    /// Serialise tests that fork, so `wait_any` never collects another
    /// test's child.
    pub(crate) fn fork_guard() -> MutexGuard<'static, ()> {
        FORK_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
