//! Parent-side waiting and reaping
//!
//! Waiting on a terminated child collects its status and releases its
//! process-table slot. Until then the child is a zombie, visible to `/proc`.

use super::handle::{ChildState, ProcessHandle, Reaped, TerminationStatus};
use crate::error::{LifecycleError, Result};
use nix::{
    errno::Errno,
    sys::wait::{waitid, waitpid, Id, WaitPidFlag, WaitStatus},
    unistd::Pid,
};
use tracing::debug;

/// Block until the child `pid` terminates.
pub fn wait_for(pid: Pid) -> Result<Reaped> {
    loop {
        match waitpid(pid, None) {
            Ok(status) => {
                if let Some(reaped) = terminal(status) {
                    return Ok(reaped);
                }
            }
            Err(Errno::EINTR) => continue,
            Err(Errno::ECHILD) => return Err(LifecycleError::NoSuchChild(pid)),
            Err(errno) => return Err(LifecycleError::WaitFailed { errno }),
        }
    }
}

/// Block until any child terminates. Results arrive in termination order.
pub fn wait_any() -> Result<Reaped> {
    loop {
        match waitpid(None, None) {
            Ok(status) => {
                if let Some(reaped) = terminal(status) {
                    return Ok(reaped);
                }
            }
            Err(Errno::EINTR) => continue,
            Err(Errno::ECHILD) => return Err(LifecycleError::NoChildren),
            Err(errno) => return Err(LifecycleError::WaitFailed { errno }),
        }
    }
}

/// Reap `pid` if it has already terminated, without blocking.
pub fn try_wait_for(pid: Pid) -> Result<Option<Reaped>> {
    match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
        Ok(status) => Ok(terminal(status)),
        Err(Errno::ECHILD) => Err(LifecycleError::NoSuchChild(pid)),
        Err(errno) => Err(LifecycleError::WaitFailed { errno }),
    }
}

/// Reap any already-terminated child, without blocking.
pub fn try_wait_any() -> Result<Option<Reaped>> {
    match waitpid(None, Some(WaitPidFlag::WNOHANG)) {
        Ok(status) => Ok(terminal(status)),
        Err(Errno::ECHILD) => Err(LifecycleError::NoChildren),
        Err(errno) => Err(LifecycleError::WaitFailed { errno }),
    }
}

/// Observe whether `pid` has terminated without reaping it.
///
/// A terminated child stays a zombie after this call; its state is reported
/// as `ExitedNormally` or `ExitedBySignal`.
pub fn peek(pid: Pid) -> Result<ChildState> {
    let flags = WaitPidFlag::WEXITED | WaitPidFlag::WNOHANG | WaitPidFlag::WNOWAIT;
    loop {
        match waitid(Id::Pid(pid), flags) {
            Ok(WaitStatus::StillAlive) => return Ok(ChildState::Running),
            Ok(status) => {
                return Ok(TerminationStatus::from_wait_status(status)
                    .map(|(_, status)| status.into())
                    .unwrap_or(ChildState::Running))
            }
            Err(Errno::EINTR) => continue,
            Err(Errno::ECHILD) => return Err(LifecycleError::NoSuchChild(pid)),
            Err(errno) => return Err(LifecycleError::WaitFailed { errno }),
        }
    }
}

/// Block until the handle's child terminates and mark the handle reaped.
pub fn reap(handle: &mut ProcessHandle) -> Result<Reaped> {
    let reaped = wait_for(handle.pid())?;
    handle.mark_reaped(reaped.status);
    debug!("Reaped {} (PID {}): {}", handle.name(), reaped.pid, reaped.status);
    Ok(reaped)
}

/// Refresh the handle's state from a non-reaping peek.
pub fn refresh(handle: &mut ProcessHandle) -> Result<ChildState> {
    if handle.state().is_inert() {
        return Ok(handle.state());
    }
    let state = peek(handle.pid())?;
    handle.observe(state);
    Ok(state)
}

fn terminal(status: WaitStatus) -> Option<Reaped> {
    TerminationStatus::from_wait_status(status).map(|(pid, status)| Reaped { pid, status })
}
