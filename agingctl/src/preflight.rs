//! Pre-flight checks for agingctl
//!
//! Validates that a symbol source is usable before resolving against it.
//! Provides clear, actionable error messages when requirements aren't met.

#![allow(unsafe_code)] // geteuid() requires unsafe

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

/// `kptr_restrict` sysctl controlling kallsyms address visibility
const KPTR_RESTRICT_PATH: &str = "/proc/sys/kernel/kptr_restrict";

/// Run all pre-flight checks for a kallsyms source
///
/// # Errors
/// Returns an error if the file is missing or unreadable
pub fn run_preflight_checks(kallsyms: &Path, quiet: bool) -> Result<()> {
    check_symbol_source(kallsyms)?;
    check_privileges(quiet);
    check_kptr_restrict(quiet);
    Ok(())
}

/// Check that the symbol source exists and can be read
///
/// # Errors
/// Returns an error if the file is missing or unreadable
pub fn check_symbol_source(path: &Path) -> Result<()> {
    if !path.exists() {
        bail!(
            "Symbol source not found: {}\n\n\
             Pass --kallsyms <FILE> or --elf <FILE>",
            path.display()
        );
    }
    fs::File::open(path).with_context(|| {
        format!(
            "Cannot read {}\n\n\
             This usually means:\n\
             - Permission denied (run with sudo)\n\
             - /proc is not mounted",
            path.display()
        )
    })?;
    Ok(())
}

/// Warn when not root: kallsyms then reports every address as zero
fn check_privileges(quiet: bool) {
    if unsafe { libc::geteuid() } != 0 && !quiet {
        eprintln!("warning: not running as root, kallsyms addresses will read as zero");
    }
}

/// Warn when `kptr_restrict` hides addresses even from root
fn check_kptr_restrict(quiet: bool) {
    let Ok(value) = fs::read_to_string(KPTR_RESTRICT_PATH) else {
        return;
    };
    if value.trim() == "2" && !quiet {
        eprintln!("warning: kernel.kptr_restrict=2, kallsyms addresses are hidden from everyone");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_source_not_found() {
        let result = check_symbol_source(Path::new("/nonexistent/kallsyms"));
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Symbol source not found"));
    }

    #[test]
    fn test_symbol_source_readable() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        assert!(check_symbol_source(tmp.path()).is_ok());
    }

    #[test]
    fn test_kptr_restrict_check_does_not_panic() {
        // Depends on the host; just ensure it runs
        check_kptr_restrict(true);
    }
}
