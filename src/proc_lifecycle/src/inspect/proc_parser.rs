//! Parsers for `/proc/[pid]` text records.
//!
//! Pure functions over file contents so they can be tested without a live
//! process.

use crate::error::{LifecycleError, Result};
use serde::Serialize;
use std::{fmt, path::PathBuf};

/// Scheduler state letter from the `State:` line of `/proc/[pid]/status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProcState {
    Running,
    Sleeping,
    DiskSleep,
    Zombie,
    Stopped,
    TracingStop,
    Dead,
    Idle,
    Parked,
    Unknown(char),
}

impl ProcState {
    pub fn from_letter(letter: char) -> Self {
        match letter {
            'R' => Self::Running,
            'S' => Self::Sleeping,
            'D' => Self::DiskSleep,
            'Z' => Self::Zombie,
            'T' => Self::Stopped,
            't' => Self::TracingStop,
            'X' | 'x' => Self::Dead,
            'I' => Self::Idle,
            'P' => Self::Parked,
            other => Self::Unknown(other),
        }
    }

    pub fn letter(&self) -> char {
        match self {
            Self::Running => 'R',
            Self::Sleeping => 'S',
            Self::DiskSleep => 'D',
            Self::Zombie => 'Z',
            Self::Stopped => 'T',
            Self::TracingStop => 't',
            Self::Dead => 'X',
            Self::Idle => 'I',
            Self::Parked => 'P',
            Self::Unknown(c) => *c,
        }
    }

    pub fn is_zombie(&self) -> bool {
        matches!(self, Self::Zombie)
    }
}

impl fmt::Display for ProcState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Running => "running",
            Self::Sleeping => "sleeping",
            Self::DiskSleep => "disk sleep",
            Self::Zombie => "zombie",
            Self::Stopped => "stopped",
            Self::TracingStop => "tracing stop",
            Self::Dead => "dead",
            Self::Idle => "idle",
            Self::Parked => "parked",
            Self::Unknown(_) => "unknown",
        };
        write!(f, "{} ({})", self.letter(), label)
    }
}

/// Fields of interest from `/proc/[pid]/status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusRecord {
    pub name: String,
    pub state: ProcState,
    pub pid: i32,
    pub ppid: i32,
    /// Virtual memory size; absent for zombies and kernel threads
    pub vm_size_bytes: Option<u64>,
    /// Resident set size; absent for zombies and kernel threads
    pub vm_rss_bytes: Option<u64>,
    pub threads: Option<u32>,
}

/// Parse the `key:\tvalue` lines of a status record.
///
/// `pid` is the PID the record was read for and is only used in errors.
pub fn parse_status(pid: i32, content: &str) -> Result<StatusRecord> {
    let mut name = None;
    let mut state = None;
    let mut record_pid = None;
    let mut ppid = None;
    let mut vm_size_bytes = None;
    let mut vm_rss_bytes = None;
    let mut threads = None;

    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key {
            "Name" => name = Some(value.to_string()),
            "State" => state = value.chars().next().map(ProcState::from_letter),
            "Pid" => record_pid = value.parse::<i32>().ok(),
            "PPid" => ppid = value.parse::<i32>().ok(),
            "VmSize" => vm_size_bytes = parse_kb(value),
            "VmRSS" => vm_rss_bytes = parse_kb(value),
            "Threads" => threads = value.parse::<u32>().ok(),
            _ => {}
        }
    }

    let missing = |field| LifecycleError::MalformedStatus { pid, field };
    Ok(StatusRecord {
        name: name.ok_or_else(|| missing("Name"))?,
        state: state.ok_or_else(|| missing("State"))?,
        pid: record_pid.ok_or_else(|| missing("Pid"))?,
        ppid: ppid.ok_or_else(|| missing("PPid"))?,
        vm_size_bytes,
        vm_rss_bytes,
        threads,
    })
}

/// Parse a `"123456 kB"` memory field into bytes
fn parse_kb(value: &str) -> Option<u64> {
    let mut parts = value.split_whitespace();
    let amount: u64 = parts.next()?.parse().ok()?;
    match parts.next() {
        Some("kB") | None => amount.checked_mul(1024),
        Some(_) => None,
    }
}

/// Split the NUL-separated `/proc/[pid]/cmdline` into arguments
pub fn parse_cmdline(content: &[u8]) -> Vec<String> {
    content
        .split(|b| *b == 0)
        .filter(|arg| !arg.is_empty())
        .map(|arg| String::from_utf8_lossy(arg).into_owned())
        .collect()
}

/// Parse a whitespace-separated PID list such as `/proc/[pid]/task/[tid]/children`
pub fn parse_pid_list(content: &str) -> Vec<i32> {
    content
        .split_whitespace()
        .filter_map(|s| s.parse().ok())
        .collect()
}

/// What an open descriptor points at
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FdTarget {
    File(PathBuf),
    Pipe { inode: u64 },
    Socket { inode: u64 },
    AnonInode(String),
    Other(String),
}

impl FdTarget {
    /// Classify the text of a `/proc/[pid]/fd/N` symlink
    pub fn from_link(link: &str) -> Self {
        if link.starts_with('/') {
            return Self::File(PathBuf::from(link));
        }
        if let Some(inode) = bracketed(link, "pipe:") {
            if let Ok(inode) = inode.parse() {
                return Self::Pipe { inode };
            }
        }
        if let Some(inode) = bracketed(link, "socket:") {
            if let Ok(inode) = inode.parse() {
                return Self::Socket { inode };
            }
        }
        if let Some(rest) = link.strip_prefix("anon_inode:") {
            let kind = rest.trim_start_matches('[').trim_end_matches(']');
            return Self::AnonInode(kind.to_string());
        }
        Self::Other(link.to_string())
    }
}

impl fmt::Display for FdTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Pipe { inode } => write!(f, "pipe:[{}]", inode),
            Self::Socket { inode } => write!(f, "socket:[{}]", inode),
            Self::AnonInode(kind) => write!(f, "anon_inode:[{}]", kind),
            Self::Other(link) => write!(f, "{}", link),
        }
    }
}

fn bracketed<'a>(link: &'a str, prefix: &str) -> Option<&'a str> {
    link.strip_prefix(prefix)?
        .strip_prefix('[')?
        .strip_suffix(']')
}
