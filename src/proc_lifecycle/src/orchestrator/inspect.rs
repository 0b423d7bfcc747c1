//! Print a `/proc` snapshot of an arbitrary PID

use crate::{
    error::LifecycleError,
    inspect::{ProcInspector, ProcSnapshot},
    util::logging::is_verbose,
};
use eyre::WrapErr;
use std::fmt::Write;

/// Inspect `pid` and print the snapshot as text or JSON.
///
/// A missing process is reported and returns `Ok(None)`; it is not an error
/// of the inspector.
pub fn run(inspector: &ProcInspector, pid: i32, json: bool) -> eyre::Result<Option<ProcSnapshot>> {
    let snapshot = match inspector.inspect(pid) {
        Ok(snapshot) => snapshot,
        Err(LifecycleError::ProcessNotFound(_)) => {
            println!("Error: Process with PID {} does not exist.", pid);
            return Ok(None);
        }
        Err(e) => return Err(e).wrap_err_with(|| format!("Failed to inspect PID {}", pid)),
    };

    if json {
        let output =
            serde_json::to_string_pretty(&snapshot).wrap_err("Failed to serialize snapshot")?;
        println!("{}", output);
    } else {
        print!("{}", render(inspector, &snapshot, is_verbose()));
    }
    Ok(Some(snapshot))
}

/// Human-readable report of a snapshot
pub fn render(inspector: &ProcInspector, snapshot: &ProcSnapshot, verbose: bool) -> String {
    let dir = inspector.process_dir(snapshot.pid);
    let status = &snapshot.status;
    let mut out = String::new();

    let _ = writeln!(out, "--- Inspecting /proc for PID {} ---", snapshot.pid);
    let _ = writeln!(out, "\n--- Reading {}/status ---", dir.display());
    let _ = writeln!(out, "Name:\t{}", status.name);
    let _ = writeln!(out, "State:\t{}", status.state);
    let _ = writeln!(out, "Pid:\t{}", status.pid);
    let _ = writeln!(out, "PPid:\t{}", status.ppid);
    match status.vm_size_bytes {
        Some(bytes) => {
            let _ = writeln!(out, "VmSize:\t{} kB", bytes / 1024);
        }
        None => {
            let _ = writeln!(out, "VmSize:\t(not available)");
        }
    }

    let _ = writeln!(out, "\n--- Reading {}/exe ---", dir.display());
    match &snapshot.exe {
        Ok(path) => {
            let _ = writeln!(out, "Executable Path: {}", path.display());
        }
        Err(e) => {
            let _ = writeln!(out, "Executable Path: Error - {}", e);
        }
    }

    let _ = writeln!(out, "\n--- Listing {}/fd ---", dir.display());
    match &snapshot.descriptors {
        Ok(fds) => {
            let _ = writeln!(out, "Open File Descriptors ({}):", fds.len());
            for entry in fds {
                match &entry.target {
                    Ok(target) => {
                        let _ = writeln!(out, "  FD {}: -> {}", entry.fd, target);
                    }
                    Err(e) => {
                        let _ = writeln!(out, "  FD {}: Error reading link - {}", entry.fd, e);
                    }
                }
            }
        }
        Err(e) => {
            let _ = writeln!(out, "Open File Descriptors: Error - {}", e);
        }
    }

    if verbose {
        if let Ok(args) = &snapshot.cmdline {
            let _ = writeln!(out, "\nCommand line: {}", args.join(" "));
        }
        if let Ok(children) = &snapshot.children {
            let _ = writeln!(out, "Children: {:?}", children);
        }
        if let Some(threads) = status.threads {
            let _ = writeln!(out, "Threads: {}", threads);
        }
    }
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspect::{FdEntry, FdTarget, ProcState, StatusRecord};
    use std::path::PathBuf;

    fn snapshot() -> ProcSnapshot {
        ProcSnapshot {
            pid: 7,
            status: StatusRecord {
                name: "demo".to_string(),
                state: ProcState::Sleeping,
                pid: 7,
                ppid: 1,
                vm_size_bytes: Some(8192 * 1024),
                vm_rss_bytes: None,
                threads: Some(2),
            },
            exe: Ok(PathBuf::from("/usr/bin/demo")),
            cmdline: Ok(vec!["demo".to_string()]),
            descriptors: Ok(vec![
                FdEntry {
                    fd: 0,
                    target: Ok(FdTarget::File(PathBuf::from("/dev/null"))),
                },
                FdEntry {
                    fd: 3,
                    target: Err("No such file or directory (os error 2)".to_string()),
                },
            ]),
            children: Ok(vec![]),
        }
    }

    #[test]
    fn test_render_text_report() {
        let report = render(&ProcInspector::with_root("/proc"), &snapshot(), false);
        assert!(report.contains("--- Reading /proc/7/status ---"));
        assert!(report.contains("State:\tS (sleeping)"));
        assert!(report.contains("VmSize:\t8192 kB"));
        assert!(report.contains("Executable Path: /usr/bin/demo"));
        assert!(report.contains("Open File Descriptors (2):"));
        assert!(report.contains("  FD 0: -> /dev/null"));
        assert!(report.contains("  FD 3: Error reading link - No such file"));
        assert!(!report.contains("Threads:"));
    }

    #[test]
    fn test_render_verbose_extras() {
        let report = render(&ProcInspector::new(), &snapshot(), true);
        assert!(report.contains("Command line: demo"));
        assert!(report.contains("Threads: 2"));
    }

    #[test]
    fn test_missing_pid_is_reported_not_raised() {
        let tmp = tempfile::tempdir().unwrap();
        let result = run(&ProcInspector::with_root(tmp.path()), 999, false).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_json_serialization() {
        let json = serde_json::to_value(snapshot()).unwrap();
        assert_eq!(json["status"]["name"], "demo");
        assert_eq!(json["exe"]["Ok"], "/usr/bin/demo");
        assert!(json["descriptors"]["Ok"][1]["target"]["Err"].is_string());
    }
}
