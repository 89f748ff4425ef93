//! `/proc/kallsyms` parsing
//!
//! Each line reads `<hex address> <type> <name>` with an optional trailing
//! `[module]` column. Only text symbols (`t`, `T`) are kept, since the
//! resolver only ever looks for defined functions. Static functions may share a
//! name across modules; the first listing wins, matching what
//! `kallsyms_lookup_name` returns.

use std::fs;
use std::path::Path;

use agingctl_common::FunctionAddress;
use anyhow::{Context, Result};
use log::{debug, info};

use super::resolver::{SymbolResolver, SymbolTable};

/// Default location of the running kernel's symbol table
pub const KALLSYMS_PATH: &str = "/proc/kallsyms";

/// Parsed kallsyms text symbols
#[derive(Debug, Default)]
pub struct Kallsyms {
    table: SymbolTable,
    restricted: bool,
}

impl Kallsyms {
    /// Read and parse a kallsyms file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let syms = Self::parse(&text);
        info!(
            "Loaded {} text symbols from {}",
            syms.table.len(),
            path.display()
        );
        Ok(syms)
    }

    /// Parse kallsyms text. Malformed lines are skipped.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut table = SymbolTable::new();
        let mut any_nonzero = false;

        for line in text.lines() {
            let mut parts = line.split_whitespace();
            let (Some(addr), Some(kind), Some(name)) = (parts.next(), parts.next(), parts.next())
            else {
                if !line.trim().is_empty() {
                    debug!("Skipping malformed kallsyms line: {line:?}");
                }
                continue;
            };

            if !matches!(kind, "t" | "T") {
                continue;
            }

            let Ok(addr) = u64::from_str_radix(addr, 16) else {
                debug!("Skipping kallsyms line with bad address: {line:?}");
                continue;
            };

            any_nonzero |= addr != 0;
            table.insert(name, FunctionAddress(addr));
        }

        Self {
            restricted: !table.is_empty() && !any_nonzero,
            table,
        }
    }

    /// True when every address read as zero (`kptr_restrict` in effect)
    #[must_use]
    pub fn is_restricted(&self) -> bool {
        self.restricted
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl SymbolResolver for Kallsyms {
    fn lookup(&self, name: &str) -> Option<FunctionAddress> {
        self.table.lookup(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::resolve;

    const SAMPLE: &str = "\
ffffffc010080000 T _text
ffffffc010a1b2c0 t fg_sram_read\t[qpnp_fg_gen4]
ffffffc010a1b5e0 t fg_sram_write\t[qpnp_fg_gen4]
ffffffc011200000 D jiffies
ffffffc010a1c000 t fg_sram_write\t[other_fg]
garbage
ffffffc010a1d000 W weak_fn
";

    #[test]
    fn test_parse_text_symbols() {
        let syms = Kallsyms::parse(SAMPLE);
        assert_eq!(
            syms.lookup("fg_sram_read"),
            Some(FunctionAddress(0xffff_ffc0_10a1_b2c0))
        );
        assert_eq!(
            syms.lookup("_text"),
            Some(FunctionAddress(0xffff_ffc0_1008_0000))
        );
        assert!(!syms.is_restricted());
    }

    #[test]
    fn test_non_text_symbols_ignored() {
        let syms = Kallsyms::parse(SAMPLE);
        assert_eq!(syms.lookup("jiffies"), None);
        assert_eq!(syms.lookup("weak_fn"), None);
    }

    #[test]
    fn test_first_listing_wins() {
        let syms = Kallsyms::parse(SAMPLE);
        assert_eq!(
            syms.lookup("fg_sram_write"),
            Some(FunctionAddress(0xffff_ffc0_10a1_b5e0))
        );
    }

    #[test]
    fn test_restricted_table_detected() {
        let syms =
            Kallsyms::parse("0000000000000000 t fg_sram_read\n0000000000000000 t fg_sram_write\n");
        assert!(syms.is_restricted());
        assert!(resolve(&syms, "fg_sram_read").is_err());
    }

    #[test]
    fn test_empty_input() {
        let syms = Kallsyms::parse("");
        assert!(syms.is_empty());
        assert!(!syms.is_restricted());
    }
}
