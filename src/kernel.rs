//! Kernel image location.
//!
//! The installer accepts either a kernel file (`.bin`, `.elf`, `.img`) or the
//! directory holding one. A flattened image is always what ends up on the
//! card, so an `.elf` argument only succeeds when its `.bin` or `.img` sibling
//! has already been dumped.

use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Filename substituted when the kernel argument is a directory.
pub const DEFAULT_KERNEL_FILENAME: &str = "kernel8.img";

/// Flattened forms, in order of preference.
const FLAT_EXTENSIONS: &[&str] = &["bin", "img"];

#[derive(Debug, Error)]
pub enum KernelError {
    #[error("{} doesn't exist", .0.display())]
    NotFound(PathBuf),
    #[error("unsupported kernel extension '{}'; expected .bin, .elf or .img", .0.display())]
    UnsupportedExtension(PathBuf),
    #[error("no .bin or .img beside '{}'; please dump the binary from the elf first", .0.display())]
    MissingFlatImage(PathBuf),
}

/// The three forms a kernel build produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelFormat {
    /// Raw binary dumped from the linked form.
    Bin,
    /// Linked ELF, as produced by the linker.
    Elf,
    /// Flattened image, usually shipped prebuilt.
    Img,
}

impl KernelFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("bin") => Some(Self::Bin),
            Some("elf") => Some(Self::Elf),
            Some("img") => Some(Self::Img),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Bin => "bin",
            Self::Elf => "elf",
            Self::Img => "img",
        }
    }
}

/// Resolve a user-supplied kernel argument to an existing `.bin` or `.img`.
///
/// `.bin` wins over `.img` when both exist beside the resolved path.
pub fn locate_kernel(arg: &Path) -> Result<PathBuf> {
    let mut path = absolutize(arg)?;
    if path.is_dir() {
        path = default_kernel_in(&path);
    }

    if !path.exists() {
        return Err(KernelError::NotFound(path).into());
    }

    if KernelFormat::from_path(&path).is_none() {
        return Err(KernelError::UnsupportedExtension(path).into());
    }

    for ext in FLAT_EXTENSIONS {
        let candidate = path.with_extension(ext);
        if candidate.exists() {
            log::debug!("kernel resolved to {}", candidate.display());
            return Ok(candidate);
        }
    }

    Err(KernelError::MissingFlatImage(path).into())
}

/// Path of the linked form sitting beside `kernel`.
pub fn linked_form(kernel: &Path) -> PathBuf {
    kernel.with_extension(KernelFormat::Elf.extension())
}

/// `kernel8.img` inside `dir`, or whichever other form of it exists.
fn default_kernel_in(dir: &Path) -> PathBuf {
    let default = dir.join(DEFAULT_KERNEL_FILENAME);
    if default.exists() {
        return default;
    }
    [KernelFormat::Bin, KernelFormat::Elf]
        .into_iter()
        .map(|format| default.with_extension(format.extension()))
        .find(|candidate| candidate.exists())
        .unwrap_or(default)
}

fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = env::current_dir().context("resolving current directory")?;
    Ok(cwd.join(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn kernel_error(err: &anyhow::Error) -> &KernelError {
        err.downcast_ref::<KernelError>()
            .expect("error should be a KernelError")
    }

    #[test]
    fn test_directory_uses_default_filename() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("kernel8.img"), b"img").unwrap();

        let kernel = locate_kernel(temp.path()).unwrap();
        assert_eq!(kernel, temp.path().join("kernel8.img"));
    }

    #[test]
    fn test_bin_preferred_over_img() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("kernel.elf"), b"elf").unwrap();
        fs::write(temp.path().join("kernel.img"), b"img").unwrap();
        fs::write(temp.path().join("kernel.bin"), b"bin").unwrap();

        for arg in ["kernel.elf", "kernel.img", "kernel.bin"] {
            let kernel = locate_kernel(&temp.path().join(arg)).unwrap();
            assert_eq!(kernel, temp.path().join("kernel.bin"), "argument {arg}");
        }
    }

    #[test]
    fn test_elf_falls_back_to_img() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("kernel.elf"), b"elf").unwrap();
        fs::write(temp.path().join("kernel.img"), b"img").unwrap();

        let kernel = locate_kernel(&temp.path().join("kernel.elf")).unwrap();
        assert_eq!(kernel, temp.path().join("kernel.img"));
    }

    #[test]
    fn test_missing_path_is_not_found() {
        let temp = TempDir::new().unwrap();
        let err = locate_kernel(&temp.path().join("kernel.bin")).unwrap_err();
        assert!(matches!(kernel_error(&err), KernelError::NotFound(_)));
    }

    #[test]
    fn test_empty_directory_is_not_found() {
        let temp = TempDir::new().unwrap();
        let err = locate_kernel(temp.path()).unwrap_err();
        match kernel_error(&err) {
            KernelError::NotFound(path) => assert!(path.ends_with("kernel8.img")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unsupported_extension_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("kernel.txt");
        fs::write(&path, b"text").unwrap();

        let err = locate_kernel(&path).unwrap_err();
        assert!(matches!(
            kernel_error(&err),
            KernelError::UnsupportedExtension(_)
        ));
    }

    #[test]
    fn test_elf_without_dump_fails() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("kernel8.elf"), b"elf").unwrap();

        let err = locate_kernel(&temp.path().join("kernel8.elf")).unwrap_err();
        assert!(matches!(
            kernel_error(&err),
            KernelError::MissingFlatImage(_)
        ));
        assert!(err.to_string().contains("dump the binary"));
    }

    #[test]
    fn test_directory_with_only_elf_needs_dump() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("kernel8.elf"), b"elf").unwrap();

        let err = locate_kernel(temp.path()).unwrap_err();
        assert!(matches!(
            kernel_error(&err),
            KernelError::MissingFlatImage(_)
        ));
    }

    #[test]
    fn test_directory_with_elf_and_bin() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("kernel8.elf"), b"elf").unwrap();
        fs::write(temp.path().join("kernel8.bin"), b"bin").unwrap();

        let kernel = locate_kernel(temp.path()).unwrap();
        assert_eq!(kernel, temp.path().join("kernel8.bin"));
    }

    #[test]
    fn test_linked_form_swaps_extension() {
        assert_eq!(
            linked_form(Path::new("/build/kernel.bin")),
            PathBuf::from("/build/kernel.elf")
        );
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            KernelFormat::from_path(Path::new("a/kernel8.img")),
            Some(KernelFormat::Img)
        );
        assert_eq!(KernelFormat::from_path(Path::new("a/kernel")), None);
    }
}
