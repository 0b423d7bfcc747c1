//! Handle and state types for spawned children

use chrono::{DateTime, Local};
use nix::{sys::signal::Signal, sys::wait::WaitStatus, unistd::Pid};
use serde::Serialize;
use std::fmt;

/// How a child terminated, as reported by the kernel to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TerminationStatus {
    /// Normal exit with code 0-255
    Exited(i32),
    /// Killed by a signal
    Signaled { signal: i32, core_dumped: bool },
}

impl TerminationStatus {
    /// Convert a terminal `WaitStatus`. Non-terminal statuses map to `None`.
    pub fn from_wait_status(status: WaitStatus) -> Option<(Pid, Self)> {
        match status {
            WaitStatus::Exited(pid, code) => Some((pid, Self::Exited(code))),
            WaitStatus::Signaled(pid, signal, core_dumped) => Some((
                pid,
                Self::Signaled {
                    signal: signal as i32,
                    core_dumped,
                },
            )),
            _ => None,
        }
    }

    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Exited(code) => Some(*code),
            Self::Signaled { .. } => None,
        }
    }

    pub fn signal(&self) -> Option<i32> {
        match self {
            Self::Exited(_) => None,
            Self::Signaled { signal, .. } => Some(*signal),
        }
    }

    pub fn success(&self) -> bool {
        matches!(self, Self::Exited(0))
    }
}

impl fmt::Display for TerminationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "exited with code {}", code),
            Self::Signaled {
                signal,
                core_dumped,
            } => {
                let name = Signal::try_from(*signal)
                    .map(|s| s.as_str())
                    .unwrap_or("unknown signal");
                write!(f, "killed by signal {} ({})", signal, name)?;
                if *core_dumped {
                    write!(f, ", core dumped")?;
                }
                Ok(())
            }
        }
    }
}

impl From<TerminationStatus> for ChildState {
    fn from(status: TerminationStatus) -> Self {
        match status {
            TerminationStatus::Exited(code) => ChildState::ExitedNormally(code),
            TerminationStatus::Signaled { signal, .. } => ChildState::ExitedBySignal(signal),
        }
    }
}

/// Lifecycle state of a child as seen from the spawning side.
///
/// State transitions:
/// - Running → ExitedNormally | ExitedBySignal (terminated, still waitable: the
///   kernel holds a zombie slot and the cause is known from a non-reaping peek)
/// - Running → Zombie (terminated per `/proc`, cause not yet collected)
/// - any terminated state → Reaped (explicit wait by the parent)
/// - Running → Orphaned (handle abandoned; a substitute parent reaps it)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChildState {
    Running,
    ExitedNormally(i32),
    ExitedBySignal(i32),
    Zombie,
    Reaped,
    Orphaned,
}

impl ChildState {
    /// Terminated but not yet reaped
    pub fn is_waitable(&self) -> bool {
        matches!(
            self,
            Self::ExitedNormally(_) | Self::ExitedBySignal(_) | Self::Zombie
        )
    }

    /// The handle no longer refers to anything this process must reap
    pub fn is_inert(&self) -> bool {
        matches!(self, Self::Reaped | Self::Orphaned)
    }
}

/// A child created by [`spawn_child`](super::spawner::spawn_child).
///
/// The spawning side owns the handle and is responsible for reaping it or
/// explicitly abandoning it. The child itself never sees this value.
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    pid: Pid,
    parent: Pid,
    name: String,
    created_at: DateTime<Local>,
    niceness: Option<i32>,
    state: ChildState,
    termination: Option<TerminationStatus>,
}

impl ProcessHandle {
    pub(crate) fn new(pid: Pid, parent: Pid, name: impl Into<String>) -> Self {
        Self {
            pid,
            parent,
            name: name.into(),
            created_at: Local::now(),
            niceness: None,
            state: ChildState::Running,
            termination: None,
        }
    }

    /// Record the niceness the child was asked to run at
    pub fn with_niceness(mut self, niceness: i32) -> Self {
        self.niceness = Some(niceness);
        self
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// PID of the process that spawned this child
    pub fn parent(&self) -> Pid {
        self.parent
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }

    pub fn niceness(&self) -> Option<i32> {
        self.niceness
    }

    pub fn state(&self) -> ChildState {
        self.state
    }

    /// Termination status collected when the child was reaped
    pub fn termination(&self) -> Option<TerminationStatus> {
        self.termination
    }

    pub(crate) fn observe(&mut self, state: ChildState) {
        if !self.state.is_inert() {
            self.state = state;
        }
    }

    pub(crate) fn mark_reaped(&mut self, status: TerminationStatus) {
        self.termination = Some(status);
        self.state = ChildState::Reaped;
    }

    /// Give up responsibility for reaping this child.
    ///
    /// Once the current process exits, the child is re-parented to the
    /// system-level reaper, which collects it.
    pub fn abandon(&mut self) {
        if !self.state.is_inert() {
            self.state = ChildState::Orphaned;
        }
    }
}

/// Result of a successful wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reaped {
    pub pid: Pid,
    pub status: TerminationStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_termination_status_from_exit() {
        let pid = Pid::from_raw(4242);
        let (got_pid, status) =
            TerminationStatus::from_wait_status(WaitStatus::Exited(pid, 3)).unwrap();
        assert_eq!(got_pid, pid);
        assert_eq!(status, TerminationStatus::Exited(3));
        assert_eq!(status.code(), Some(3));
        assert_eq!(status.signal(), None);
        assert!(!status.success());
        assert_eq!(ChildState::from(status), ChildState::ExitedNormally(3));
    }

    #[test]
    fn test_termination_status_from_signal() {
        let pid = Pid::from_raw(4243);
        let (_, status) = TerminationStatus::from_wait_status(WaitStatus::Signaled(
            pid,
            Signal::SIGKILL,
            false,
        ))
        .unwrap();
        assert_eq!(status.signal(), Some(9));
        assert_eq!(status.code(), None);
        assert_eq!(status.to_string(), "killed by signal 9 (SIGKILL)");
        assert_eq!(ChildState::from(status), ChildState::ExitedBySignal(9));
    }

    #[test]
    fn test_non_terminal_wait_status_is_ignored() {
        let pid = Pid::from_raw(4244);
        assert!(TerminationStatus::from_wait_status(WaitStatus::StillAlive).is_none());
        assert!(TerminationStatus::from_wait_status(WaitStatus::Continued(pid)).is_none());
    }

    #[test]
    fn test_handle_state_transitions() {
        let mut handle = ProcessHandle::new(Pid::from_raw(10), Pid::from_raw(1), "child");
        assert_eq!(handle.state(), ChildState::Running);

        handle.observe(ChildState::Zombie);
        assert!(handle.state().is_waitable());

        handle.mark_reaped(TerminationStatus::Exited(0));
        assert_eq!(handle.state(), ChildState::Reaped);
        assert_eq!(handle.termination(), Some(TerminationStatus::Exited(0)));

        // Reaped handles stay inert
        handle.observe(ChildState::Running);
        handle.abandon();
        assert_eq!(handle.state(), ChildState::Reaped);
    }

    #[test]
    fn test_abandon_running_handle() {
        let mut handle =
            ProcessHandle::new(Pid::from_raw(11), Pid::from_raw(1), "child").with_niceness(10);
        handle.abandon();
        assert_eq!(handle.state(), ChildState::Orphaned);
        assert_eq!(handle.niceness(), Some(10));
    }
}
