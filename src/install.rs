//! The install pipeline, run top to bottom exactly once per invocation.
//!
//! ```text
//! locate kernel ─► resolve target ─► wipe card ─► prepare config.txt
//!                                                        │
//!            eject ◄─ sync each asset (firmware, kernel, config, programs)
//! ```

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::assets::{staging_plan, Asset};
use crate::boot_config::prepare_boot_config;
use crate::config::InstallConfig;
use crate::kernel::locate_kernel;
use crate::sync::{sync_asset, SyncOutcome};
use crate::target::{Prompt, TargetResolver, TargetStore};
use crate::volume;
use crate::wipe::{wipe_card, WipeReport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    /// Kernel file or the directory holding `kernel8.img`.
    pub kernel: PathBuf,
    /// Explicit card directory; falls back to the remembered one.
    pub target: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct StagedAsset {
    pub asset: Asset,
    pub outcome: SyncOutcome,
}

#[derive(Debug)]
pub struct InstallReport {
    pub kernel: PathBuf,
    pub target: PathBuf,
    pub wipe: WipeReport,
    pub staged: Vec<StagedAsset>,
}

impl InstallReport {
    pub fn updated(&self) -> usize {
        self.count(SyncOutcome::Updated)
    }

    pub fn up_to_date(&self) -> usize {
        self.count(SyncOutcome::UpToDate)
    }

    fn count(&self, outcome: SyncOutcome) -> usize {
        self.staged.iter().filter(|s| s.outcome == outcome).count()
    }
}

/// Stage the kernel, its boot config, firmware and user programs onto the card.
///
/// Fails before touching the card if the kernel cannot be resolved. The
/// eject at the end is fire-and-forget.
pub fn install(
    request: &InstallRequest,
    config: &InstallConfig,
    store: &dyn TargetStore,
    prompt: &mut dyn Prompt,
) -> Result<InstallReport> {
    let kernel = locate_kernel(&request.kernel)?;
    println!("[install] kernel {}", kernel.display());

    let target = TargetResolver::new(&config.volumes_root, config.poll_interval)
        .resolve(request.target.as_deref(), store, prompt)
        .context("resolving sdcard directory")?;

    let wipe = wipe_card(&target)?;
    let boot_config = prepare_boot_config(&kernel, &config.config_generator)?;

    let plan = staging_plan(
        &config.firmware_dir,
        &kernel,
        &boot_config,
        &config.programs_dir,
    )?;
    let staged = sync_plan(&plan, &target)?;

    volume::eject(&config.eject_command, &target);

    Ok(InstallReport {
        kernel,
        target,
        wipe,
        staged,
    })
}

/// Sync every asset in order, stopping at the first I/O failure.
pub fn sync_plan(plan: &[Asset], card_root: &Path) -> Result<Vec<StagedAsset>> {
    plan.iter()
        .map(|asset| {
            let outcome = sync_asset(asset, card_root).with_context(|| {
                format!(
                    "staging {} as {}",
                    asset.source.display(),
                    asset.dest.display()
                )
            })?;
            Ok(StagedAsset {
                asset: asset.clone(),
                outcome,
            })
        })
        .collect()
}
