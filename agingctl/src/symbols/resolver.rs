//! Name → address lookup

use std::collections::HashMap;
use std::sync::Arc;

use agingctl_common::FunctionAddress;
use log::{debug, error};

use crate::domain::ModuleError;

/// Anything that can map a symbol name to an entry address
pub trait SymbolResolver: Send + Sync {
    /// Raw lookup. May return a zero address; [`resolve`] filters that out.
    fn lookup(&self, name: &str) -> Option<FunctionAddress>;
}

impl<T: SymbolResolver + ?Sized> SymbolResolver for Arc<T> {
    fn lookup(&self, name: &str) -> Option<FunctionAddress> {
        (**self).lookup(name)
    }
}

/// Resolve `name` or fail with [`ModuleError::SymbolNotFound`]
///
/// # Errors
/// Returns an error if the symbol is absent or resolves to address zero
pub fn resolve(resolver: &dyn SymbolResolver, name: &str) -> Result<FunctionAddress, ModuleError> {
    match resolver.lookup(name) {
        Some(addr) if !addr.is_null() => {
            debug!("Resolved {name} at {addr}");
            Ok(addr)
        }
        Some(_) => {
            error!("Symbol {name} resolved to a zero address (restricted symbol table?)");
            Err(ModuleError::SymbolNotFound(name.to_string()))
        }
        None => {
            error!("Symbol {name} not found");
            Err(ModuleError::SymbolNotFound(name.to_string()))
        }
    }
}

/// In-memory symbol table
#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
    symbols: HashMap<String, FunctionAddress>,
}

impl SymbolTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a symbol. An existing entry with the same name is kept.
    pub fn insert(&mut self, name: impl Into<String>, addr: FunctionAddress) {
        self.symbols.entry(name.into()).or_insert(addr);
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

impl SymbolResolver for SymbolTable {
    fn lookup(&self, name: &str) -> Option<FunctionAddress> {
        self.symbols.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> SymbolTable {
        let mut t = SymbolTable::new();
        t.insert("fg_sram_read", FunctionAddress(0xffff_ffc0_1080_1000));
        t.insert("fg_sram_write", FunctionAddress(0xffff_ffc0_1080_2000));
        t.insert("zeroed", FunctionAddress(0));
        t
    }

    #[test]
    fn test_resolve_found() {
        let t = table();
        assert_eq!(
            resolve(&t, "fg_sram_write").unwrap(),
            FunctionAddress(0xffff_ffc0_1080_2000)
        );
    }

    #[test]
    fn test_resolve_missing() {
        let err = resolve(&table(), "fg_sram_erase").unwrap_err();
        assert!(matches!(err, ModuleError::SymbolNotFound(ref n) if n == "fg_sram_erase"));
    }

    #[test]
    fn test_resolve_zero_address_is_missing() {
        assert!(matches!(
            resolve(&table(), "zeroed"),
            Err(ModuleError::SymbolNotFound(_))
        ));
    }

    #[test]
    fn test_first_insert_wins() {
        let mut t = SymbolTable::new();
        t.insert("dup", FunctionAddress(1));
        t.insert("dup", FunctionAddress(2));
        assert_eq!(t.lookup("dup"), Some(FunctionAddress(1)));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_resolver_through_arc() {
        let shared: Arc<dyn SymbolResolver> = Arc::new(table());
        assert!(resolve(&shared, "fg_sram_read").is_ok());
    }
}
