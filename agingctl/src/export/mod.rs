//! Session report export
//!
//! Writes what happened during a simulated module session as JSON.

pub mod report;

pub use report::{ReportEvent, SessionReport};
