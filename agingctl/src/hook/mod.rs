//! # Interception Points
//!
//! An interception point runs a callback synchronously before a target
//! function's original body, with access to the call's positional
//! arguments. Instead of patching code at the target address, hookable
//! calls are routed through an [`InterceptionTable`] keyed by function
//! identity (the resolved [`FunctionAddress`](agingctl_common::FunctionAddress)).
//!
//! ## Guarantees
//!
//! - **Observe, never short-circuit**: the original body always runs after
//!   the callback returns
//! - **Disarm anywhere**: `disarm` takes the table lock only briefly and is
//!   never called with it held, so a callback may disarm its own target
//! - **Idempotent disarm**: disarming an unarmed target is a no-op, and
//!   [`InterceptionTable::disarm_if`] leaves a hook armed by another owner alone
//! - **One winner**: [`HookFrame::disarm`] reports `true` to exactly one
//!   frame per arming, which is what makes one-shot callbacks at-most-once
//!   under concurrent or re-entrant calls
//!
//! ## Lifecycle
//!
//! ```text
//!   disarmed ──arm()──▶ armed ──disarm() / frame.disarm()──▶ disarmed
//!                         │
//!                         └── invoke(): callback, then original body
//! ```

pub mod table;

pub use table::{HookFn, HookFrame, InterceptionTable};
