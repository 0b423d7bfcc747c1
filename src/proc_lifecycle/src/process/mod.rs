//! Process management primitives: spawn, exec, wait, priority

pub mod batch;
pub mod exec;
pub mod handle;
pub mod priority;
pub mod reaper;
pub mod spawner;

// Re-export commonly used items
pub use batch::SpawnBatch;
pub use exec::{exec_or_exit, replace_image, EXEC_FAILURE_STATUS};
pub use handle::{ChildState, ProcessHandle, Reaped, TerminationStatus};
pub use reaper::{wait_any, wait_for};
pub use spawner::{fork_process, spawn_child, Fork};
