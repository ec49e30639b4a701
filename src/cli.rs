//! Command line parsing for `install-kernel`.
//!
//! `install-kernel <kernel> [sdcard-dir]`, or `-h`/`--help`.

use anyhow::{bail, Result};
use std::path::PathBuf;

use crate::boot_config::BootConfigError;
use crate::install::InstallRequest;

#[derive(Debug, PartialEq, Eq)]
pub enum Invocation {
    Help,
    Install(InstallRequest),
}

pub fn usage() -> &'static str {
    "Usage:\n  install-kernel <kernel.{bin|elf|img}|kernel-dir> [sdcard-dir]\n\n\
     If the sdcard directory is omitted, the one used last time is selected;\n\
     on first use you are asked for it."
}

/// Parse the arguments following the program name.
pub fn parse_args(args: &[String]) -> Result<Invocation> {
    if args.iter().any(|arg| arg == "-h" || arg == "--help") {
        return Ok(Invocation::Help);
    }

    match args {
        [kernel] if !kernel.starts_with('-') => Ok(Invocation::Install(InstallRequest {
            kernel: PathBuf::from(kernel),
            target: None,
        })),
        [kernel, target] if !kernel.starts_with('-') && !target.starts_with('-') => {
            Ok(Invocation::Install(InstallRequest {
                kernel: PathBuf::from(kernel),
                target: Some(PathBuf::from(target)),
            }))
        }
        _ => bail!(usage()),
    }
}

/// Process exit code for a failed install.
///
/// A failing config generator hands back its own code; everything else is 1.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<BootConfigError>()
        .and_then(BootConfigError::exit_code)
        .unwrap_or(1)
}
