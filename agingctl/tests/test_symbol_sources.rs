use std::io::Write;

use agingctl::symbols::{resolve, ElfSymbols, Kallsyms, SymbolResolver};

#[test]
fn test_elf_symbols_from_own_binary() {
    let binary_path = env!("CARGO_BIN_EXE_agingctl");

    println!("Loading symbols from: {}", binary_path);

    let syms = ElfSymbols::load(binary_path).expect("Failed to load ELF symbols");
    assert!(!syms.is_empty(), "binary should carry function symbols");

    let main = syms.lookup("main");
    assert!(main.is_some(), "`main` should be a defined text symbol");
    assert!(resolve(&syms, "main").is_ok());
    assert!(resolve(&syms, "fg_sram_read").is_err());
}

#[test]
fn test_kallsyms_file_round_trip() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "ffffffc010a1b2c0 t fg_sram_read\t[qpnp_fg_gen4]").unwrap();
    writeln!(file, "ffffffc010a1b5e0 t fg_sram_write\t[qpnp_fg_gen4]").unwrap();
    file.flush().unwrap();

    let syms = Kallsyms::load(file.path()).expect("Failed to load kallsyms");
    assert_eq!(syms.len(), 2);
    assert_eq!(
        resolve(&syms, "fg_sram_write").unwrap().0,
        0xffff_ffc0_10a1_b5e0
    );
}

#[test]
fn test_missing_kallsyms_file() {
    let result = Kallsyms::load("/nonexistent/kallsyms");
    assert!(result.is_err());
}
