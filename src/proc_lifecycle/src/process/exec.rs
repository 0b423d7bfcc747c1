//! Program image replacement

use super::spawner::exit_now;
use crate::error::LifecycleError;
use nix::{errno::Errno, unistd::getpid};
use std::ffi::CString;
use tracing::error;

/// Exit status of a child whose image replacement failed
pub const EXEC_FAILURE_STATUS: i32 = 1;

/// Split a command string into an argument vector on whitespace.
///
/// `argv[0]` is the program name. Returns an empty vector for a blank string.
pub fn split_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(str::to_string).collect()
}

/// Replace the calling process's image with `program`, resolved through PATH.
///
/// On success this never returns: the PID is preserved but the stack, heap,
/// and code of the caller are discarded. The return value is therefore always
/// the reason the replacement failed.
pub fn replace_image<S: AsRef<str>>(program: &str, argv: &[S]) -> LifecycleError {
    let invalid = || LifecycleError::InvalidArgument {
        program: program.to_string(),
    };

    let Ok(c_program) = CString::new(program) else {
        return invalid();
    };
    let c_args: Result<Vec<CString>, _> = argv
        .iter()
        .map(|arg| CString::new(arg.as_ref()))
        .collect();
    let Ok(c_args) = c_args else {
        return invalid();
    };

    match nix::unistd::execvp(&c_program, &c_args) {
        Ok(never) => match never {},
        Err(errno) => classify_exec_error(program, errno),
    }
}

fn classify_exec_error(program: &str, errno: Errno) -> LifecycleError {
    match errno {
        Errno::ENOENT | Errno::ENOTDIR => LifecycleError::ExecutableNotFound {
            program: program.to_string(),
        },
        errno => LifecycleError::ExecFailed {
            program: program.to_string(),
            errno,
        },
    }
}

/// Run `command` in place of the current child, or terminate it.
///
/// Intended for the child branch of a spawn. If the replacement fails, the
/// failure is reported and the process exits with [`EXEC_FAILURE_STATUS`]
/// rather than falling through into the caller's code.
pub fn exec_or_exit(command: &str) -> ! {
    let argv = split_command(command);
    let err = match argv.first() {
        Some(program) => replace_image(program, &argv),
        None => LifecycleError::ExecutableNotFound {
            program: command.to_string(),
        },
    };

    match &err {
        LifecycleError::ExecutableNotFound { .. } => {
            println!("Error: Command not found '{}'", command);
        }
        other => println!("Error: {}", other),
    }
    error!("PID {} failed to execute '{}': {}", getpid(), command, err);

    exit_now(EXEC_FAILURE_STATUS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{handle::TerminationStatus, reaper::wait_for, spawner::spawn_child};
    use crate::test_support::fork_guard;

    #[test]
    fn test_split_command() {
        assert_eq!(split_command("ls -l  /tmp"), vec!["ls", "-l", "/tmp"]);
        assert!(split_command("   ").is_empty());
    }

    #[test]
    fn test_replace_image_rejects_nul_bytes() {
        let err = replace_image("bad\0name", &["bad\0name"]);
        assert!(matches!(err, LifecycleError::InvalidArgument { .. }));
    }

    #[test]
    fn test_classify_missing_program() {
        let err = classify_exec_error("nope", Errno::ENOENT);
        assert!(matches!(
            err,
            LifecycleError::ExecutableNotFound { ref program } if program == "nope"
        ));
        let err = classify_exec_error("/etc/passwd", Errno::EACCES);
        assert!(matches!(err, LifecycleError::ExecFailed { .. }));
    }

    #[test]
    fn test_exec_success_in_child() {
        let _guard = fork_guard();

        let handle = spawn_child("exec-true", || exec_or_exit("true")).unwrap();
        let reaped = wait_for(handle.pid()).unwrap();
        assert_eq!(reaped.status, TerminationStatus::Exited(0));
    }

    #[test]
    fn test_exec_missing_program_exits_with_failure_status() {
        let _guard = fork_guard();

        let handle = spawn_child("exec-missing", || {
            exec_or_exit("definitely_not_a_real_command_8c1f")
        })
        .unwrap();
        let reaped = wait_for(handle.pid()).unwrap();
        assert_eq!(reaped.status, TerminationStatus::Exited(EXEC_FAILURE_STATUS));
    }
}
