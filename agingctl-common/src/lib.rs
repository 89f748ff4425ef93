//! # Shared Data Structures (Host ↔ Module)
//!
//! Plain-data types and constants shared between the module core and anything
//! that plays the host side (the simulated fuel gauge, tests, tooling). All
//! types are `Copy` and carry no behavior beyond accessors so they can cross
//! the call boundary by value.
//!
//! ## Key Types
//!
//! - [`FunctionAddress`] - Entry address of a resolved accessor
//! - [`DeviceHandle`] - Opaque fuel-gauge device token captured from a call
//! - [`CallArgs`] - Positional arguments of an intercepted call

#![no_std]

use core::fmt;

// ============================================================================
// Accessor Symbols
// ============================================================================

/// Read-handle accessor. Its first argument is the fuel-gauge device.
///
/// Signature on the host side:
/// `int fg_sram_read(struct fg_dev *fg, u16 address, u8 offset, u8 *val, int len, int flags)`
pub const SRAM_READ_SYMBOL: &str = "fg_sram_read";

/// Write-value accessor, same signature as [`SRAM_READ_SYMBOL`].
pub const SRAM_WRITE_SYMBOL: &str = "fg_sram_write";

/// Number of arguments the read accessor takes (and the hook observes)
pub const SRAM_READ_ARG_COUNT: usize = 6;

// ============================================================================
// Aging-Level Register
// ============================================================================

/// SRAM word holding the battery aging level
pub const AGING_LEVEL_WORD: u16 = 291;

/// Byte offset of the aging level inside [`AGING_LEVEL_WORD`]
pub const AGING_LEVEL_OFFSET: u8 = 0;

/// Default access flag (`FG_IMA_DEFAULT`)
pub const FG_IMA_DEFAULT: i32 = 0;

/// Highest aging level the register accepts
pub const MAX_AGING_LEVEL: u8 = 5;

// ============================================================================
// Limits
// ============================================================================

/// Size of a status message handed back to a control caller, terminator included
pub const STATUS_MSG_LEN: usize = 64;

/// Maximum positional arguments an interception point can observe
pub const MAX_HOOK_ARGS: usize = 12;

// ============================================================================
// Shared Data Structures
// ============================================================================

/// Entry address of a function in the host's address space
///
/// Address `0` is never a valid target; symbol tables read without
/// privileges report every address as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "user", derive(serde::Serialize, serde::Deserialize))]
pub struct FunctionAddress(pub u64);

impl FunctionAddress {
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for FunctionAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

/// Opaque reference to a fuel-gauge device object
///
/// Meaningless to the module beyond being passed back into the write
/// accessor. [`DeviceHandle::NULL`] stands for "not captured yet".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "user", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceHandle(pub u64);

impl DeviceHandle {
    pub const NULL: Self = Self(0);

    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("(null)")
        } else {
            write!(f, "0x{:016x}", self.0)
        }
    }
}

/// Positional arguments of an intercepted call
///
/// Arguments are register-sized words; pointers and small integers alike
/// are widened to `u64`. At most [`MAX_HOOK_ARGS`] are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallArgs {
    values: [u64; MAX_HOOK_ARGS],
    len: usize,
}

impl CallArgs {
    /// Build from a slice, keeping at most [`MAX_HOOK_ARGS`] values
    #[must_use]
    pub fn new(args: &[u64]) -> Self {
        let len = args.len().min(MAX_HOOK_ARGS);
        let mut values = [0u64; MAX_HOOK_ARGS];
        values[..len].copy_from_slice(&args[..len]);
        Self { values, len }
    }

    /// Argument at `index`, or `None` past the end
    #[must_use]
    pub fn get(&self, index: usize) -> Option<u64> {
        self.as_slice().get(index).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u64] {
        &self.values[..self.len]
    }

    /// Copy limited to the first `count` arguments
    #[must_use]
    pub fn truncated(&self, count: usize) -> Self {
        Self::new(&self.as_slice()[..count.min(self.len)])
    }
}
