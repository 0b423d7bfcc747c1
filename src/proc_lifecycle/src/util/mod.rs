//! Logging and formatting helpers

pub mod logging;
pub mod milestone_log;
pub mod timestamp;
