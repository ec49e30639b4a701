//! Copy-if-different staging of a single asset.
//!
//! Sources and destinations are compared by MD5. A differing destination is
//! kept as `<name>~` before being replaced, so the previous deployment of any
//! file can be recovered by hand. Only one backup slot exists per file.

use anyhow::{bail, Context, Result};
use md5::{Digest, Md5};
use std::fmt;
use std::fs::{self, File, FileTimes};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use crate::assets::Asset;

/// Appended to a destination path to name its backup.
pub const BACKUP_SUFFIX: &str = "~";

/// 128-bit content digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checksum([u8; 16]);

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Destination replaced with the source.
    Updated,
    /// Destination already matched; nothing touched.
    UpToDate,
}

/// Digest of `path`, or `None` if it does not exist.
pub fn checksum_file(path: &Path) -> Result<Option<Checksum>> {
    if !path.exists() {
        return Ok(None);
    }

    let f = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut r = BufReader::new(f);
    let mut hasher = Md5::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = r
            .read(&mut buf)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    let mut digest = [0u8; 16];
    digest.copy_from_slice(&hasher.finalize());
    Ok(Some(Checksum(digest)))
}

pub fn backup_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// Stage `asset` under `card_root`, replacing the destination only if its
/// content differs from the source.
pub fn sync_asset(asset: &Asset, card_root: &Path) -> Result<SyncOutcome> {
    if !asset.source.is_file() {
        bail!(
            "asset source is not a regular file: {}",
            asset.source.display()
        );
    }
    if !card_root.is_dir() {
        bail!("card root is not a directory: {}", card_root.display());
    }

    let dest = card_root.join(&asset.dest);
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let dest_sum = checksum_file(&dest)?;
    let source_sum = checksum_file(&asset.source)?;
    log::debug!(
        "{}: source {} dest {}",
        asset.dest.display(),
        source_sum.map(|s| s.to_string()).unwrap_or_default(),
        dest_sum.map(|s| s.to_string()).unwrap_or_default()
    );

    if dest_sum == source_sum {
        println!("[sync] {} is up-to-date", dest.display());
        return Ok(SyncOutcome::UpToDate);
    }

    if dest_sum.is_some() {
        back_up(&dest)?;
    }
    println!("[sync] {} is updated", dest.display());
    copy_preserving_times(&asset.source, &dest)?;
    Ok(SyncOutcome::Updated)
}

/// Move `dest` into its backup slot, dropping whatever backup was there.
fn back_up(dest: &Path) -> Result<()> {
    let backup = backup_path(dest);
    if backup.symlink_metadata().is_ok() {
        fs::remove_file(&backup)
            .with_context(|| format!("Failed to remove old backup {}", backup.display()))?;
    }
    match fs::rename(dest, &backup) {
        Ok(()) => Ok(()),
        Err(_) => {
            fs::copy(dest, &backup).with_context(|| {
                format!("Failed to copy {} to {}", dest.display(), backup.display())
            })?;
            fs::remove_file(dest)
                .with_context(|| format!("Failed to remove {}", dest.display()))?;
            Ok(())
        }
    }
}

/// Copy contents and permissions, then carry over access and modification times.
///
/// The copy may already be read-only here; setting times only needs ownership,
/// so the destination is reopened without write access.
fn copy_preserving_times(src: &Path, dst: &Path) -> Result<()> {
    fs::copy(src, dst)
        .with_context(|| format!("Failed to copy {} to {}", src.display(), dst.display()))?;

    let meta = fs::metadata(src).with_context(|| format!("Failed to stat {}", src.display()))?;
    let times = FileTimes::new()
        .set_accessed(meta.accessed()?)
        .set_modified(meta.modified()?);
    File::open(dst)
        .and_then(|f| f.set_times(times))
        .with_context(|| format!("Failed to set timestamps on {}", dst.display()))?;
    Ok(())
}
