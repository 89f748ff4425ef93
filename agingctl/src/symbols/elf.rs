//! Symbol lookup in ELF images
//!
//! Useful against an unstripped `vmlinux` or driver object when the running
//! kernel's kallsyms is not available, and in tests against our own binary.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use agingctl_common::FunctionAddress;
use anyhow::{Context, Result};
use log::{info, warn};
use object::{Object, ObjectSymbol, SymbolKind};

use super::resolver::SymbolResolver;

/// Defined text symbols of one ELF file
pub struct ElfSymbols {
    symbols: HashMap<String, FunctionAddress>,
}

impl ElfSymbols {
    /// Read the static and dynamic symbol tables of an ELF file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data =
            fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let file = object::File::parse(&*data).context("Failed to parse object file")?;

        let mut symbols = HashMap::new();
        for sym in file.symbols().chain(file.dynamic_symbols()) {
            if sym.kind() != SymbolKind::Text || !sym.is_definition() {
                continue;
            }
            let Ok(name) = sym.name() else {
                continue;
            };
            symbols
                .entry(name.to_string())
                .or_insert(FunctionAddress(sym.address()));
        }

        if symbols.is_empty() {
            warn!("{} has no function symbols (stripped?)", path.display());
        } else {
            info!(
                "Loaded {} function symbols from {}",
                symbols.len(),
                path.display()
            );
        }
        Ok(Self { symbols })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl SymbolResolver for ElfSymbols {
    fn lookup(&self, name: &str) -> Option<FunctionAddress> {
        self.symbols.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_file() {
        let result = ElfSymbols::load("/nonexistent/vmlinux");
        assert!(result.is_err());
        assert!(result.err().unwrap().to_string().contains("Failed to read"));
    }

    #[test]
    fn test_load_non_elf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not-elf");
        fs::write(&path, b"definitely not an object file").unwrap();
        assert!(ElfSymbols::load(&path).is_err());
    }
}
