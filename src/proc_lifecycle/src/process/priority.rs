//! Scheduling niceness and CPU affinity

use crate::error::{LifecycleError, Result};
use nix::{
    errno::Errno,
    sched::{sched_setaffinity, CpuSet},
    sys::resource::{getrlimit, Resource},
    unistd::Pid,
};
use tracing::{debug, warn};

/// Highest scheduling priority
pub const NICE_MIN: i32 = -20;
/// Lowest scheduling priority
pub const NICE_MAX: i32 = 19;

/// Niceness observed before and after an adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NicenessChange {
    pub before: i32,
    pub after: i32,
}

/// Niceness of the calling process
pub fn get_niceness() -> Result<i32> {
    niceness_of(Pid::from_raw(0))
}

/// Niceness of `pid` (0 means the calling process)
#[allow(unsafe_code)]
pub fn niceness_of(pid: Pid) -> Result<i32> {
    // getpriority can legitimately return -1, so errno is the only failure signal
    Errno::clear();
    // SAFETY: plain syscall wrapper with no pointer arguments
    let value = unsafe { libc::getpriority(libc::PRIO_PROCESS, pid.as_raw() as libc::id_t) };
    if value == -1 {
        match Errno::last() {
            Errno::UnknownErrno => {}
            Errno::ESRCH => return Err(LifecycleError::ProcessNotFound(pid.as_raw())),
            errno => return Err(LifecycleError::Priority { errno }),
        }
    }
    Ok(value)
}

#[allow(unsafe_code)]
fn set_niceness_of(pid: Pid, value: i32) -> std::result::Result<(), Errno> {
    // SAFETY: plain syscall wrapper with no pointer arguments
    let rc = unsafe { libc::setpriority(libc::PRIO_PROCESS, pid.as_raw() as libc::id_t, value) };
    Errno::result(rc).map(drop)
}

/// Add `delta` to the calling process's niceness, clamped to
/// `NICE_MIN..=NICE_MAX`.
///
/// Lowering niceness (raising priority) without privilege fails with
/// `PermissionDenied`; raising it always succeeds.
pub fn set_niceness(delta: i32) -> Result<NicenessChange> {
    let before = get_niceness()?;
    let requested = before.saturating_add(delta).clamp(NICE_MIN, NICE_MAX);
    if requested == before {
        return Ok(NicenessChange {
            before,
            after: before,
        });
    }

    set_niceness_of(Pid::from_raw(0), requested)
        .map_err(|errno| classify_priority_error(errno, before, requested))?;

    let after = get_niceness()?;
    debug!("Niceness changed from {} to {}", before, after);
    Ok(NicenessChange { before, after })
}

fn classify_priority_error(errno: Errno, current: i32, requested: i32) -> LifecycleError {
    match errno {
        Errno::EPERM | Errno::EACCES => LifecycleError::PermissionDenied { current, requested },
        errno => LifecycleError::Priority { errno },
    }
}

/// Lowest niceness an unprivileged process may reach under an `RLIMIT_NICE`
/// soft limit of `soft` (the kernel allows `20 - soft`).
fn nice_floor(soft: u64) -> i32 {
    if soft >= (NICE_MAX - NICE_MIN + 1) as u64 {
        return NICE_MIN;
    }
    (20 - soft as i32).clamp(NICE_MIN, NICE_MAX)
}

fn unprivileged_floor() -> i32 {
    match getrlimit(Resource::RLIMIT_NICE) {
        Ok((soft, _)) => nice_floor(soft),
        Err(e) => {
            debug!("Failed to read RLIMIT_NICE: {}", e);
            NICE_MAX
        }
    }
}

/// Like [`set_niceness`], but a denied lowering is clamped instead of failing.
///
/// When the requested value is below what the caller may reach, the niceness
/// is lowered as far as `RLIMIT_NICE` permits. If even that is not below the
/// current value, the niceness stays where it was.
pub fn adjust_niceness(delta: i32) -> Result<NicenessChange> {
    let (current, requested) = match set_niceness(delta) {
        Err(LifecycleError::PermissionDenied { current, requested }) => (current, requested),
        other => return other,
    };

    let floor = unprivileged_floor().max(requested);
    if floor < current && set_niceness_of(Pid::from_raw(0), floor).is_ok() {
        let after = get_niceness()?;
        warn!(
            "Not permitted to lower niceness from {} to {}; clamped to {}",
            current, requested, after
        );
        return Ok(NicenessChange {
            before: current,
            after,
        });
    }

    warn!(
        "Not permitted to lower niceness from {} to {}; keeping {}",
        current, requested, current
    );
    Ok(NicenessChange {
        before: current,
        after: current,
    })
}

/// Restrict the calling process to a single CPU so concurrently running
/// processes compete for it.
pub fn pin_to_cpu(cpu: usize) -> Result<()> {
    let mut set = CpuSet::new();
    set.set(cpu)
        .map_err(|errno| LifecycleError::Priority { errno })?;
    sched_setaffinity(Pid::from_raw(0), &set).map_err(|errno| LifecycleError::Priority { errno })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{handle::TerminationStatus, reaper::wait_for, spawner::spawn_child};
    use crate::test_support::fork_guard;
    use nix::unistd::geteuid;

    #[test]
    fn test_get_niceness_in_range() {
        let nice = get_niceness().unwrap();
        assert!((NICE_MIN..=NICE_MAX).contains(&nice));
    }

    #[test]
    fn test_niceness_of_missing_process() {
        // PIDs are capped well below i32::MAX
        let err = niceness_of(Pid::from_raw(i32::MAX)).unwrap_err();
        assert!(matches!(err, LifecycleError::ProcessNotFound(_)));
    }

    #[test]
    fn test_raise_niceness_in_child() {
        let _guard = fork_guard();

        // Adjust inside a child so the test process keeps its priority
        let handle = spawn_child("nice-up", || match set_niceness(5) {
            Ok(change) if change.after == (change.before + 5).min(NICE_MAX) => 0,
            _ => 1,
        })
        .unwrap();
        assert_eq!(
            wait_for(handle.pid()).unwrap().status,
            TerminationStatus::Exited(0)
        );
    }

    #[test]
    fn test_denied_lowering_maps_to_permission_denied() {
        let err = classify_priority_error(Errno::EPERM, 19, 0);
        assert!(matches!(
            err,
            LifecycleError::PermissionDenied {
                current: 19,
                requested: 0
            }
        ));
        let err = classify_priority_error(Errno::EACCES, 10, -5);
        assert!(matches!(err, LifecycleError::PermissionDenied { .. }));
        let err = classify_priority_error(Errno::EINVAL, 0, 0);
        assert!(matches!(
            err,
            LifecycleError::Priority {
                errno: Errno::EINVAL
            }
        ));
    }

    #[test]
    fn test_nice_floor_from_rlimit() {
        assert_eq!(nice_floor(0), NICE_MAX);
        assert_eq!(nice_floor(1), NICE_MAX);
        assert_eq!(nice_floor(20), 0);
        assert_eq!(nice_floor(40), NICE_MIN);
        assert_eq!(nice_floor(libc::RLIM_INFINITY), NICE_MIN);
    }

    #[test]
    fn test_clamped_and_tolerant_lowering_in_child() {
        let _guard = fork_guard();

        let handle = spawn_child("nice-clamp", || {
            // Past the top of the range clamps to NICE_MAX
            let Ok(change) = set_niceness(100) else {
                return 1;
            };
            if change.after != NICE_MAX {
                return 2;
            }
            let Ok(change) = adjust_niceness(-100) else {
                return 3;
            };
            if change.before != NICE_MAX || change.after > NICE_MAX {
                return 4;
            }
            // Root may hold CAP_SYS_NICE; otherwise RLIMIT_NICE bounds the result
            if !geteuid().is_root() && change.after != unprivileged_floor() {
                return 5;
            }
            0
        })
        .unwrap();
        assert_eq!(
            wait_for(handle.pid()).unwrap().status,
            TerminationStatus::Exited(0)
        );
    }
}
