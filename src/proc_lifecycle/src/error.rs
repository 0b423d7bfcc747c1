//! Error taxonomy for process lifecycle operations

use nix::{errno::Errno, unistd::Pid};
use std::io;
use thiserror::Error;

/// Errors raised by the spawn, exec, wait, priority, and inspection primitives.
///
/// Scenario code wraps these into `eyre::Report` with context; the variants
/// themselves stay specific enough for callers to decide whether a failure is
/// local (exec, inspection) or fatal to the orchestration (wait targets).
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The host could not allocate a new process (process table or memory limits)
    #[error("unable to create a new process: {0}")]
    ResourceExhausted(#[source] Errno),

    /// Program name could not be resolved on PATH
    #[error("executable '{program}' not found")]
    ExecutableNotFound { program: String },

    /// Program was found but the kernel refused to load it
    #[error("unable to execute '{program}': {errno}")]
    ExecFailed { program: String, errno: Errno },

    /// Program name or an argument contains an interior NUL byte
    #[error("invalid argument vector for '{program}'")]
    InvalidArgument { program: String },

    /// Wait target is not a live or zombie child of the caller
    #[error("PID {0} is not a child of this process")]
    NoSuchChild(Pid),

    /// `wait_any` was called with no children left to wait for
    #[error("no child processes to wait for")]
    NoChildren,

    /// Lowering niceness requires privilege the caller does not hold
    #[error("permission denied setting niceness from {current} to {requested}")]
    PermissionDenied { current: i32, requested: i32 },

    /// No live-introspection record exists for the PID
    #[error("process {0} not found")]
    ProcessNotFound(i32),

    /// Status record exists but lacks a required field
    #[error("status record of PID {pid} is missing field '{field}'")]
    MalformedStatus { pid: i32, field: &'static str },

    #[error("wait failed: {errno}")]
    WaitFailed { errno: Errno },

    #[error("scheduling priority call failed: {errno}")]
    Priority { errno: Errno },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl LifecycleError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T, E = LifecycleError> = std::result::Result<T, E>;
