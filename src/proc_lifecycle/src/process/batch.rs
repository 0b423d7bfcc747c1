//! Ordered batches of spawned children

use super::{
    handle::{ProcessHandle, Reaped},
    reaper::{self, wait_any},
};
use crate::error::{LifecycleError, Result};
use tracing::{debug, warn};

/// Children produced by one orchestration call.
///
/// Every handle pushed into a batch is eventually reaped or explicitly
/// abandoned. Dropping a batch that still holds live children blocks until
/// they are reaped, so an early return cannot leak process-table slots.
#[derive(Debug, Default)]
pub struct SpawnBatch {
    handles: Vec<ProcessHandle>,
}

impl SpawnBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly spawned child. Call before spawning the next one.
    pub fn push(&mut self, handle: ProcessHandle) {
        self.handles.push(handle);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn handles(&self) -> &[ProcessHandle] {
        &self.handles
    }

    /// Number of handles still awaiting a reap or abandonment
    pub fn pending(&self) -> usize {
        self.handles
            .iter()
            .filter(|h| !h.state().is_inert())
            .count()
    }

    /// Wait on each child in spawn order.
    ///
    /// Reports come back in spawn order regardless of which child actually
    /// terminated first.
    pub fn reap_in_order(&mut self) -> Result<Vec<Reaped>> {
        let mut reports = Vec::with_capacity(self.handles.len());
        for handle in self.handles.iter_mut().filter(|h| !h.state().is_inert()) {
            reports.push(reaper::reap(handle)?);
        }
        Ok(reports)
    }

    /// Wait on the children in whatever order they terminate.
    ///
    /// Assumes the batch holds every child of the calling process; a reaped
    /// PID that is not in the batch is reported as `NoSuchChild`.
    pub fn reap_any_order(&mut self) -> Result<Vec<Reaped>> {
        let mut reports = Vec::with_capacity(self.pending());
        while self.pending() > 0 {
            let reaped = wait_any()?;
            let handle = self
                .handles
                .iter_mut()
                .find(|h| h.pid() == reaped.pid && !h.state().is_inert())
                .ok_or(LifecycleError::NoSuchChild(reaped.pid))?;
            handle.mark_reaped(reaped.status);
            debug!("Reaped {} (PID {}): {}", handle.name(), reaped.pid, reaped.status);
            reports.push(reaped);
        }
        Ok(reports)
    }

    /// Stop tracking every live child, leaving them to whichever process
    /// becomes their parent.
    pub fn abandon_all(&mut self) {
        for handle in &mut self.handles {
            handle.abandon();
        }
    }
}

impl Drop for SpawnBatch {
    fn drop(&mut self) {
        let pending = self.pending();
        if pending == 0 {
            return;
        }
        debug!("SpawnBatch: reaping {} outstanding children", pending);
        for handle in self.handles.iter_mut().filter(|h| !h.state().is_inert()) {
            if let Err(e) = reaper::reap(handle) {
                warn!("Failed to reap {} (PID {}): {}", handle.name(), handle.pid(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{
        handle::{ChildState, TerminationStatus},
        spawner::spawn_child,
    };
    use crate::test_support::fork_guard;
    use std::{thread, time::Duration};

    #[test]
    fn test_empty_batch() {
        let mut batch = SpawnBatch::new();
        assert!(batch.is_empty());
        assert!(batch.reap_in_order().unwrap().is_empty());
        assert!(batch.reap_any_order().unwrap().is_empty());
    }

    #[test]
    fn test_reap_in_order_marks_handles() {
        let _guard = fork_guard();

        let mut batch = SpawnBatch::new();
        for code in [3, 1, 2] {
            batch.push(spawn_child("batch", move || code).unwrap());
        }
        let reports = batch.reap_in_order().unwrap();
        let codes: Vec<_> = reports.iter().filter_map(|r| r.status.code()).collect();
        assert_eq!(codes, vec![3, 1, 2]);
        assert_eq!(batch.pending(), 0);
        assert!(batch
            .handles()
            .iter()
            .all(|h| h.state() == ChildState::Reaped));
    }

    #[test]
    fn test_reap_any_order_collects_all() {
        let _guard = fork_guard();

        let mut batch = SpawnBatch::new();
        for delay in [120u64, 10, 60] {
            batch.push(
                spawn_child("batch-any", move || {
                    thread::sleep(Duration::from_millis(delay));
                    0
                })
                .unwrap(),
            );
        }
        let reports = batch.reap_any_order().unwrap();
        assert_eq!(reports.len(), 3);
        assert!(reports
            .iter()
            .all(|r| r.status == TerminationStatus::Exited(0)));
    }

    #[test]
    fn test_drop_reaps_outstanding_children() {
        let _guard = fork_guard();

        let pid = {
            let mut batch = SpawnBatch::new();
            batch.push(spawn_child("dropped", || 0).unwrap());
            batch.handles()[0].pid()
        };
        // Already reaped by the drop guard
        assert!(matches!(
            reaper::wait_for(pid),
            Err(LifecycleError::NoSuchChild(_))
        ));
    }

    #[test]
    fn test_abandon_all() {
        let mut batch = SpawnBatch::new();
        batch.push(ProcessHandle::new(
            nix::unistd::Pid::from_raw(999_999),
            nix::unistd::getpid(),
            "fake",
        ));
        batch.abandon_all();
        assert_eq!(batch.pending(), 0);
        assert_eq!(batch.handles()[0].state(), ChildState::Orphaned);
    }
}
