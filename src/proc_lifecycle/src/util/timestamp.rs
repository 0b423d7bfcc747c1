//! Timestamp formatting utilities

use chrono::{DateTime, Local};

/// Format a time as a milestone log timestamp
///
/// Format: YYYY-MM-DD HH:MM:SS,mmm
pub fn format_log_timestamp(time: DateTime<Local>) -> String {
    time.format("%Y-%m-%d %H:%M:%S,%3f").to_string()
}

/// Format the current time as a milestone log timestamp
pub fn now_log_timestamp() -> String {
    format_log_timestamp(Local::now())
}
