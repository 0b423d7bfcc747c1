//! Point-in-time snapshots of a process from the `/proc` filesystem
//!
//! Reads race against the target's own lifecycle: the process may exit or
//! close descriptors between individual reads. Only the status record is
//! required; every other field carries its own error so a partial snapshot
//! is still returned.

use super::proc_parser::{self, FdTarget, StatusRecord};
use crate::error::{LifecycleError, Result};
use serde::Serialize;
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use tracing::debug;

/// One open descriptor and its resolved target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FdEntry {
    pub fd: u32,
    pub target: std::result::Result<FdTarget, String>,
}

/// Read-only view of another process's externally observable state
#[derive(Debug, Clone, Serialize)]
pub struct ProcSnapshot {
    pub pid: i32,
    pub status: StatusRecord,
    /// Resolved `exe` symlink
    pub exe: std::result::Result<PathBuf, String>,
    pub cmdline: std::result::Result<Vec<String>, String>,
    /// Open descriptors sorted by number; the listing itself may fail
    /// (e.g. another user's process)
    pub descriptors: std::result::Result<Vec<FdEntry>, String>,
    /// Direct children as reported by every thread's `children` file
    pub children: std::result::Result<Vec<i32>, String>,
}

impl ProcSnapshot {
    pub fn is_zombie(&self) -> bool {
        self.status.state.is_zombie()
    }
}

/// Reads process metadata from a proc-style filesystem.
#[derive(Debug, Clone)]
pub struct ProcInspector {
    root: PathBuf,
}

impl Default for ProcInspector {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcInspector {
    /// Inspector over the host's `/proc`
    pub fn new() -> Self {
        Self::with_root("/proc")
    }

    /// Inspector over a proc-style tree rooted elsewhere
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the record for `pid`
    pub fn process_dir(&self, pid: i32) -> PathBuf {
        self.root.join(pid.to_string())
    }

    /// Whether a live-introspection record exists for `pid`
    pub fn exists(&self, pid: i32) -> bool {
        self.process_dir(pid).is_dir()
    }

    /// Read the status record only
    pub fn status(&self, pid: i32) -> Result<StatusRecord> {
        let path = self.process_dir(pid).join("status");
        let content = fs::read_to_string(&path).map_err(|e| {
            if is_gone(&e) {
                LifecycleError::ProcessNotFound(pid)
            } else {
                LifecycleError::io(format!("Failed to read {}", path.display()), e)
            }
        })?;
        proc_parser::parse_status(pid, &content)
    }

    /// Take a full snapshot of `pid`.
    ///
    /// Fails with `ProcessNotFound` when no status record exists. Every other
    /// field is read independently and records its own failure.
    pub fn inspect(&self, pid: i32) -> Result<ProcSnapshot> {
        if pid <= 0 {
            return Err(LifecycleError::ProcessNotFound(pid));
        }
        let status = self.status(pid)?;
        let dir = self.process_dir(pid);

        let exe = fs::read_link(dir.join("exe")).map_err(|e| describe("exe", &e));
        let cmdline = fs::read(dir.join("cmdline"))
            .map(|bytes| proc_parser::parse_cmdline(&bytes))
            .map_err(|e| describe("cmdline", &e));
        let descriptors = self.descriptors(&dir);
        let children = self.children(&dir);

        debug!(
            "Inspected PID {} ({}, state {})",
            pid, status.name, status.state
        );

        Ok(ProcSnapshot {
            pid,
            status,
            exe,
            cmdline,
            descriptors,
            children,
        })
    }

    fn descriptors(&self, dir: &Path) -> std::result::Result<Vec<FdEntry>, String> {
        let fd_dir = dir.join("fd");
        let entries = fs::read_dir(&fd_dir).map_err(|e| describe("fd", &e))?;

        let mut fds: Vec<FdEntry> = entries
            .flatten()
            .filter_map(|entry| {
                let fd: u32 = entry.file_name().to_str()?.parse().ok()?;
                // Each descriptor may close between listing and resolving
                let target = fs::read_link(entry.path())
                    .map(|link| FdTarget::from_link(&link.to_string_lossy()))
                    .map_err(|e| e.to_string());
                Some(FdEntry { fd, target })
            })
            .collect();
        fds.sort_by_key(|entry| entry.fd);
        Ok(fds)
    }

    fn children(&self, dir: &Path) -> std::result::Result<Vec<i32>, String> {
        let tasks = fs::read_dir(dir.join("task")).map_err(|e| describe("task", &e))?;

        let mut children = Vec::new();
        for task in tasks.flatten() {
            if let Ok(content) = fs::read_to_string(task.path().join("children")) {
                children.extend(proc_parser::parse_pid_list(&content));
            }
        }
        children.sort_unstable();
        children.dedup();
        Ok(children)
    }
}

fn is_gone(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::NotFound || e.raw_os_error() == Some(libc::ESRCH)
}

fn describe(field: &str, e: &io::Error) -> String {
    format!("unable to read {}: {}", field, e)
}
