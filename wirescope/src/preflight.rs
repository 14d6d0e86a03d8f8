//! Pre-flight checks for wirescope
//!
//! Validates a target binary and the running kernel before probe attachment
//! decisions are made. Provides clear, actionable error messages when
//! requirements aren't met.

use anyhow::{bail, Context, Result};
use log::{debug, warn};
use std::io;
use std::path::Path;

use crate::domain::ElfError;
use crate::symbolization::{kernel_version, ElfReader, KernelVersion};

/// Minimum kernel version for the ring buffer and BTF features the probes use
pub const MIN_KERNEL_VERSION: KernelVersion = KernelVersion { major: 5, minor: 8, patch: 0 };

/// Run all pre-flight checks for a probe target
pub fn run_preflight_checks(target_path: &Path) -> Result<()> {
    check_kernel_version()?;
    check_binary_exists(target_path)?;
    check_symbol_tables(target_path);
    Ok(())
}

/// Running kernel version: VDSO note first, `/proc/version` as a fallback
pub fn detect_kernel_version() -> Result<KernelVersion> {
    match kernel_version() {
        Ok(version) => return Ok(version),
        Err(e) => debug!("VDSO kernel version unavailable ({e}), reading /proc/version"),
    }

    let version_str = std::fs::read_to_string("/proc/version")
        .context("Failed to read kernel version from /proc/version")?;
    // "Linux version 6.1.0-arch1-1 (...) ..."
    let release = version_str.split_whitespace().nth(2).unwrap_or("unknown");
    KernelVersion::parse_release(release)
        .with_context(|| format!("Unrecognized kernel release: {release}"))
}

/// Check if the kernel version is sufficient for the probes
pub fn check_kernel_version() -> Result<KernelVersion> {
    let version = detect_kernel_version()?;
    if version < MIN_KERNEL_VERSION {
        bail!(
            "Kernel version {version} is too old.\n\n\
             wirescope requires Linux {}.{} or newer.",
            MIN_KERNEL_VERSION.major,
            MIN_KERNEL_VERSION.minor,
        );
    }
    Ok(version)
}

/// Check if the target binary exists and is a regular file
pub fn check_binary_exists(target_path: &Path) -> Result<()> {
    if !target_path.exists() {
        let source = io::Error::from(io::ErrorKind::NotFound);
        return Err(ElfError::Open { path: target_path.to_path_buf(), source }).with_context(|| {
            format!(
                "Binary not found: {}\n\n\
                 Make sure the path is correct and the binary exists.",
                target_path.display()
            )
        });
    }
    if !target_path.is_file() {
        bail!(
            "Not a file: {}\n\n\
             The target must be an executable or shared library, not a directory.",
            target_path.display()
        );
    }
    Ok(())
}

/// Warn when the binary carries no symbol table at all
///
/// Returns whether `.symtab` or `.dynsym` is present. Unreadable binaries
/// are left for the resolver to report.
pub fn check_symbol_tables(target_path: &Path) -> bool {
    let mut reader = ElfReader::new(target_path);
    let has_table = [".symtab", ".dynsym"].iter().any(|name| reader.section_offset(name).is_ok());
    if !has_table {
        warn!(
            "{} has no .symtab or .dynsym, symbol lookups will find nothing",
            target_path.display()
        );
    }
    has_table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorKind;

    #[test]
    fn test_kernel_version_detection() {
        // Don't assert success since the sandbox may hide both sources
        if let Ok(version) = detect_kernel_version() {
            assert!(version.major > 0);
        }
    }

    #[test]
    fn test_binary_not_found() {
        let result = check_binary_exists(Path::new("/nonexistent/path/to/binary"));
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Binary not found"));
        assert_eq!(ErrorKind::of(&err), Some(ErrorKind::NotFound));
    }

    #[test]
    fn test_directory_is_not_a_binary() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = check_binary_exists(dir.path()).unwrap_err().to_string();
        assert!(err.contains("Not a file"));
    }

    #[test]
    fn test_symbol_tables_of_text_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("readme");
        std::fs::write(&path, "not elf").unwrap();
        assert!(!check_symbol_tables(&path));
    }
}
