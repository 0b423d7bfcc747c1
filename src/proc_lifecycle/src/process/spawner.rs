//! Process creation via fork
//!
//! `fork()` is modelled as a tagged result instead of a dual return: the
//! parent gets the child's PID, the child gets `Fork::Child`. Higher level
//! code uses [`spawn_child`], which dispatches the child branch to an entry
//! function and guarantees it never returns into the caller's control flow.
//!
//! # Fork safety
//!
//! Only the calling thread survives in the child. Any lock held by another
//! thread at the moment of the split stays locked forever in the child, so
//! these functions must be called while the process is single-threaded (the
//! binary never starts a thread pool).

use super::handle::ProcessHandle;
use crate::error::{LifecycleError, Result};
use nix::unistd::{fork, getpid, ForkResult, Pid};
use std::{
    ffi::CString,
    io::Write,
    panic::{self, AssertUnwindSafe},
};
use tracing::{debug, error};

/// Exit status used when a child entry panics
pub const PANIC_EXIT_STATUS: i32 = 101;

/// Which side of the split the caller is on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fork {
    Parent { child: Pid },
    Child,
}

/// Duplicate the calling process.
///
/// Both branches continue from this call site with copy-on-write memory:
/// writes after the split are invisible to the other side. The child inherits
/// open descriptors and the environment.
#[allow(unsafe_code)]
pub fn fork_process() -> Result<Fork> {
    // SAFETY: callers fork from a single-threaded context (see module docs).
    // The child branch only runs Rust code that does not depend on locks held
    // by other threads, then terminates through `_exit`.
    match unsafe { fork() } {
        Ok(ForkResult::Parent { child }) => Ok(Fork::Parent { child }),
        Ok(ForkResult::Child) => Ok(Fork::Child),
        Err(errno) => Err(LifecycleError::ResourceExhausted(errno)),
    }
}

/// Spawn a child that runs `entry` and exits with its return value.
///
/// Returns the handle on the parent side only. On the child side `entry` runs
/// to completion (a panic becomes [`PANIC_EXIT_STATUS`]), stdout is flushed,
/// and the process terminates with `_exit` so no parent-owned destructors or
/// atexit handlers run twice.
pub fn spawn_child<F>(name: &str, entry: F) -> Result<ProcessHandle>
where
    F: FnOnce() -> i32,
{
    let parent = getpid();
    match fork_process()? {
        Fork::Parent { child } => {
            debug!("Spawned {} with PID {} (parent {})", name, child, parent);
            Ok(ProcessHandle::new(child, parent, name))
        }
        Fork::Child => run_child(name, entry),
    }
}

fn run_child<F>(name: &str, entry: F) -> !
where
    F: FnOnce() -> i32,
{
    set_process_name(name);

    let code = match panic::catch_unwind(AssertUnwindSafe(entry)) {
        Ok(code) => code,
        Err(_) => {
            error!("Child {} (PID {}) panicked", name, getpid());
            PANIC_EXIT_STATUS
        }
    };

    exit_now(code)
}

/// Flush stdio and terminate the calling process immediately.
///
/// Skips atexit handlers and destructors inherited from the parent. Child
/// branches end here instead of returning.
#[allow(unsafe_code)]
pub(crate) fn exit_now(code: i32) -> ! {
    let _ = std::io::stdout().flush();
    let _ = std::io::stderr().flush();
    // SAFETY: `_exit` takes no pointers and never returns. Buffered stdio was
    // flushed above; nothing else in the child needs to run.
    unsafe { libc::_exit(code) }
}

/// Set the kernel's short name for the calling process (shown by `ps`).
///
/// The kernel truncates to 15 bytes; failures are ignored since the name is
/// cosmetic.
fn set_process_name(name: &str) {
    let truncated: String = name.chars().filter(|c| *c != '\0').take(15).collect();
    if let Ok(cname) = CString::new(truncated) {
        if let Err(e) = nix::sys::prctl::set_name(&cname) {
            debug!("Failed to set process name to {}: {}", name, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{handle::TerminationStatus, reaper::wait_for};
    use crate::test_support::fork_guard;

    #[test]
    fn test_spawn_child_exit_code() {
        let _guard = fork_guard();

        let handle = spawn_child("exit-seven", || 7).unwrap();
        assert!(handle.pid().as_raw() > 0);
        assert_eq!(handle.parent(), getpid());
        assert_ne!(handle.pid(), getpid());

        let reaped = wait_for(handle.pid()).unwrap();
        assert_eq!(reaped.pid, handle.pid());
        assert_eq!(reaped.status, TerminationStatus::Exited(7));
    }

    #[test]
    fn test_child_writes_are_invisible_to_parent() {
        let _guard = fork_guard();

        let mut counter = 1;
        let handle = spawn_child("cow-writer", || {
            counter += 41;
            if counter == 42 {
                0
            } else {
                1
            }
        })
        .unwrap();

        let reaped = wait_for(handle.pid()).unwrap();
        assert_eq!(reaped.status, TerminationStatus::Exited(0));
        assert_eq!(counter, 1);
    }

    #[test]
    fn test_raw_fork_child_exits_with_given_status() {
        let _guard = fork_guard();

        let child = match fork_process().unwrap() {
            Fork::Parent { child } => child,
            Fork::Child => exit_now(9),
        };
        let reaped = wait_for(child).unwrap();
        assert_eq!(reaped.status, TerminationStatus::Exited(9));
    }

    #[test]
    fn test_child_panic_becomes_exit_status() {
        let _guard = fork_guard();

        let handle = spawn_child("panicker", || panic!("boom")).unwrap();
        let reaped = wait_for(handle.pid()).unwrap();
        assert_eq!(reaped.status, TerminationStatus::Exited(PANIC_EXIT_STATUS));
    }
}
