//! Boot configuration (`config.txt`) preparation.
//!
//! The generator is an external script owned by the kernel tree. It is run
//! with the linked kernel and must leave `config.txt` beside it.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use thiserror::Error;

use crate::kernel::{linked_form, KernelFormat};

pub const BOOT_CONFIG_FILENAME: &str = "config.txt";

#[derive(Debug, Error)]
pub enum BootConfigError {
    #[error("config generator '{}' failed with {status}", generator.display())]
    GeneratorFailed {
        generator: PathBuf,
        status: ExitStatus,
    },
}

impl BootConfigError {
    /// Exit code to hand back to the shell, if the generator produced one.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::GeneratorFailed { status, .. } => status.code(),
        }
    }
}

/// Return the `config.txt` to stage for `kernel`, generating it when needed.
///
/// A prebuilt `.img` that already ships with a `config.txt` is used as-is;
/// every other kernel gets a freshly generated one.
pub fn prepare_boot_config(kernel: &Path, generator: &Path) -> Result<PathBuf> {
    let kernel_dir = kernel.parent().ok_or_else(|| {
        anyhow::anyhow!("kernel path has no parent directory: {}", kernel.display())
    })?;
    let config = kernel_dir.join(BOOT_CONFIG_FILENAME);

    if KernelFormat::from_path(kernel) == Some(KernelFormat::Img) && config.exists() {
        log::debug!("reusing prepackaged {}", config.display());
        return Ok(config);
    }

    let elf = linked_form(kernel);
    println!("[config] generating {} from {}", config.display(), elf.display());
    let status = Command::new(generator)
        .arg(&elf)
        .status()
        .with_context(|| format!("running config generator '{}'", generator.display()))?;

    if !status.success() {
        return Err(BootConfigError::GeneratorFailed {
            generator: generator.to_path_buf(),
            status,
        }
        .into());
    }

    if !config.is_file() {
        bail!(
            "config generator '{}' finished but {} is still missing",
            generator.display(),
            config.display()
        );
    }

    Ok(config)
}
