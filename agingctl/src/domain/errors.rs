//! Structured error types for agingctl
//!
//! Using thiserror for automatic Display implementation and error chaining.

use agingctl_common::FunctionAddress;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModuleError {
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("Failed to install hook: {0}")]
    HookInstallFailed(#[from] HookError),

    #[error("Aging level {0} out of range (0-5)")]
    OutOfRange(u8),

    #[error("Failed to provision {path}: {source}")]
    ProvisioningFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum HookError {
    #[error("invalid target address {0}")]
    InvalidTarget(FunctionAddress),

    #[error("argument count {0} not supported")]
    InvalidArgCount(usize),

    #[error("{0} already armed with a different callback")]
    AlreadyArmed(FunctionAddress),
}
