//! Command-line surface and runtime configuration

pub mod config;
pub mod options;
