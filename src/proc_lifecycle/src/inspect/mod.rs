//! Live process introspection through `/proc`

pub mod proc_parser;
pub mod snapshot;

pub use proc_parser::{FdTarget, ProcState, StatusRecord};
pub use snapshot::{FdEntry, ProcInspector, ProcSnapshot};
