//! Everything that ends up on the card, as (source, card-relative path) pairs.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::boot_config::BOOT_CONFIG_FILENAME;
use crate::kernel::DEFAULT_KERNEL_FILENAME;

/// Card subdirectory holding user programs.
pub const PROGRAMS_DIR: &str = "programs";

/// A file to stage: absolute source, destination relative to the card root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub source: PathBuf,
    pub dest: PathBuf,
}

impl Asset {
    pub fn new(source: impl Into<PathBuf>, dest: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            dest: dest.into(),
        }
    }
}

/// Board firmware, staged flat at the card root.
pub fn firmware_assets(firmware_dir: &Path) -> Result<Vec<Asset>> {
    list_entries(firmware_dir, Path::new(""))
}

/// User programs, staged under `programs/`.
pub fn program_assets(programs_dir: &Path) -> Result<Vec<Asset>> {
    list_entries(programs_dir, Path::new(PROGRAMS_DIR))
}

/// Full staging order: firmware, kernel, boot config, user programs.
pub fn staging_plan(
    firmware_dir: &Path,
    kernel: &Path,
    boot_config: &Path,
    programs_dir: &Path,
) -> Result<Vec<Asset>> {
    let mut plan = firmware_assets(firmware_dir)?;
    plan.push(Asset::new(kernel, DEFAULT_KERNEL_FILENAME));
    plan.push(Asset::new(boot_config, BOOT_CONFIG_FILENAME));
    plan.extend(program_assets(programs_dir)?);
    Ok(plan)
}

/// Every direct entry of `dir`, sorted by name. Subdirectories are listed like
/// files; the sync step decides what to do with them.
fn list_entries(dir: &Path, dest_prefix: &Path) -> Result<Vec<Asset>> {
    if !dir.is_dir() {
        log::warn!("asset directory {} not found, skipping", dir.display());
        return Ok(Vec::new());
    }

    let mut assets = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.with_context(|| format!("reading asset directory '{}'", dir.display()))?;
        let source = entry.path().to_path_buf();
        assets.push(Asset::new(source, dest_prefix.join(entry.file_name())));
    }
    Ok(assets)
}
