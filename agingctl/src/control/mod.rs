//! # Control Operation
//!
//! Validates a requested aging level, writes it through the resolved
//! `fg_sram_write` with the captured device handle, and reports a textual
//! status.
//!
//! ## Result Classification
//!
//! | Condition            | Stored level | Status text                               | Code |
//! |----------------------|--------------|-------------------------------------------|------|
//! | level > 5            | unchanged    | none, nothing written                     | -1   |
//! | accessor `rc < 0`    | unchanged    | `error, rc=<rc>`                          | 1    |
//! | accessor `rc >= 0`   | requested    | `success, set batt_aging_level to <v>`    | 0    |
//!
//! Before a handle is captured the write goes out with a null device; the
//! host answers that with a negative code like any other failed write.
//! Accessor failures never disable the control path, the caller may simply
//! retry.

pub mod operation;
pub mod status;

pub use operation::{ControlContext, ControlOutcome};
pub use status::StatusMessage;
