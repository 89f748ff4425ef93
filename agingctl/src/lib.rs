//! # agingctl - Fuel-Gauge Capture and Aging-Level Control
//!
//! agingctl captures a reference to the fuel-gauge device object the first
//! time the host calls its SRAM read accessor, then uses that reference to
//! write the battery aging level through the SRAM write accessor. The device
//! object cannot be looked up directly; it only ever appears as the first
//! argument of `fg_sram_read`.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            Host                                 │
//! │   fg_sram_read(fg, ...)            fg_sram_write(fg, ...)       │
//! └──────────┬──────────────────────────────────▲───────────────────┘
//!            │ legitimate call                  │ SramAccessor
//!            ▼                                  │
//! ┌──────────────────────┐   first call   ┌─────┴────────────────┐
//! │  InterceptionTable   │──────────────▶ │  capture callback    │
//! │  (hook::table)       │   disarm, then │  (module)            │
//! └──────────▲───────────┘   capture arg0 └─────┬────────────────┘
//!            │ arm                              │ apply_stored()
//! ┌──────────┴───────────┐                ┌─────▼────────────────┐
//! │  Symbol resolution   │                │  Control operation   │
//! │  (symbols)           │                │  (control)           │
//! └──────────────────────┘                └─────▲────────────────┘
//!                                               │ control command
//!                                         external caller
//! ```
//!
//! ## Module Structure
//!
//! - [`symbols`]: name → address resolution (in-memory, kallsyms, ELF)
//! - [`hook`]: the interception table and the frames callbacks receive
//! - [`control`]: validated aging-level writes and bounded status messages
//! - [`module`]: the lifecycle driver tying the above together
//! - [`accessor`]: the call gate for the resolved write accessor
//! - [`provision`]: companion service-script provisioning
//! - [`sim`]: an in-memory fuel gauge playing the host side
//! - [`export`]: JSON session reports
//! - [`cli`], [`preflight`]: command-line surface and environment checks
//! - [`domain`]: core types (`AgingLevel`, `Lifecycle`) and errors
//!
//! ## Ordering Guarantees
//!
//! - Both accessors resolve before anything is armed; a missing symbol
//!   aborts start-up
//! - The capture callback disarms itself before reading its arguments, so
//!   at most one call ever captures, concurrent or re-entrant calls included
//! - The original read body always runs after the callback
//! - Teardown removes the module's own callback, never one armed by a later
//!   load, and may be repeated

// Expose modules for testing
pub mod accessor;
pub mod cli;
pub mod control;
pub mod domain;
pub mod export;
pub mod hook;
pub mod module;
pub mod preflight;
pub mod provision;
pub mod sim;
pub mod symbols;

pub use module::{AgingModule, HostEnv, ModuleOptions};
