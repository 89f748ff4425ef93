//! # Symbol Resolution
//!
//! The module never links against the fuel-gauge driver. Both accessors are
//! located by name at start-up, the way a kernel module would call
//! `kallsyms_lookup_name`, and the resulting addresses are used as identities
//! for the interception table and the write call gate.
//!
//! ## Resolution Policy
//!
//! - Every accessor is resolved before anything that depends on it starts
//! - A missing symbol is fatal: it means an incompatible host, not a
//!   transient condition, so there are no retries
//! - Address `0` counts as missing. An unprivileged read of `/proc/kallsyms`
//!   lists every symbol at zero, and arming a hook on that would be unsafe
//!
//! ## Backends
//!
//! - **`resolver`**: the [`SymbolResolver`] trait, the fail-closed
//!   [`resolve`] helper, and an in-memory [`SymbolTable`]
//! - **`kallsyms`**: parser for the `/proc/kallsyms` text format
//! - **`elf`**: symbol table of an ELF image (vmlinux, a module object, or
//!   any executable) read with the `object` crate

pub mod elf;
pub mod kallsyms;
pub mod resolver;

pub use elf::ElfSymbols;
pub use kallsyms::Kallsyms;
pub use resolver::{resolve, SymbolResolver, SymbolTable};
