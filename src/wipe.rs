//! Emptying the card before a deployment.

use anyhow::{bail, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// What a wipe did. Failed entries were logged and skipped.
#[derive(Debug, Default)]
pub struct WipeReport {
    pub removed: usize,
    pub failed: Vec<PathBuf>,
}

/// Remove every entry directly inside `card_root`.
///
/// Files and symlinks are unlinked, directories removed recursively. A failure
/// on one entry is logged and does not stop the others; only a missing
/// `card_root` is an error.
pub fn wipe_card(card_root: &Path) -> Result<WipeReport> {
    wipe_with(card_root, remove_entry)
}

fn remove_entry(path: &Path, is_dir: bool) -> io::Result<()> {
    if is_dir {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

fn wipe_with<F>(card_root: &Path, mut remove: F) -> Result<WipeReport>
where
    F: FnMut(&Path, bool) -> io::Result<()>,
{
    if !card_root.is_dir() {
        bail!("card directory '{}' is not a directory", card_root.display());
    }

    let mut report = WipeReport::default();
    for entry in WalkDir::new(card_root).min_depth(1).max_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Failed to read entry under {}: {}", card_root.display(), e);
                if let Some(path) = e.path() {
                    report.failed.push(path.to_path_buf());
                }
                continue;
            }
        };

        let path = entry.path();
        match remove(path, entry.file_type().is_dir()) {
            Ok(()) => report.removed += 1,
            Err(e) => {
                log::warn!("Failed to delete {}: {}", path.display(), e);
                report.failed.push(path.to_path_buf());
            }
        }
    }

    log::debug!(
        "wiped {}: {} removed, {} failed",
        card_root.display(),
        report.removed,
        report.failed.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_wipe_removes_files_dirs_and_links() {
        let temp = TempDir::new().unwrap();
        let card = temp.path().join("card");
        fs::create_dir_all(card.join("programs/nested")).unwrap();
        fs::create_dir_all(card.join("overlays")).unwrap();
        fs::write(card.join("kernel8.img"), b"kernel").unwrap();
        fs::write(card.join("config.txt~"), b"old").unwrap();
        fs::write(card.join("programs/nested/fib"), b"fib").unwrap();
        std::os::unix::fs::symlink("kernel8.img", card.join("link")).unwrap();

        let report = wipe_card(&card).unwrap();

        assert_eq!(report.removed, 5);
        assert!(report.failed.is_empty());
        assert_eq!(fs::read_dir(&card).unwrap().count(), 0);
    }

    #[test]
    fn test_wipe_does_not_follow_symlinked_directories() {
        let temp = TempDir::new().unwrap();
        let card = temp.path().join("card");
        let outside = temp.path().join("outside");
        fs::create_dir_all(&card).unwrap();
        fs::create_dir_all(&outside).unwrap();
        fs::write(outside.join("keep"), b"keep").unwrap();
        std::os::unix::fs::symlink(&outside, card.join("outside")).unwrap();

        wipe_card(&card).unwrap();

        assert_eq!(fs::read_dir(&card).unwrap().count(), 0);
        assert!(outside.join("keep").exists());
    }

    #[test]
    fn test_wipe_continues_past_failed_entry() {
        let temp = TempDir::new().unwrap();
        let card = temp.path().join("card");
        fs::create_dir_all(card.join("programs")).unwrap();
        fs::write(card.join("bootcode.bin"), b"boot").unwrap();
        fs::write(card.join("locked.img"), b"locked").unwrap();
        fs::write(card.join("start.elf"), b"start").unwrap();

        let report = wipe_with(&card, |path, is_dir| {
            if path.ends_with("locked.img") {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "locked"));
            }
            remove_entry(path, is_dir)
        })
        .unwrap();

        assert_eq!(report.removed, 3);
        assert_eq!(report.failed, [card.join("locked.img")]);
        let left: Vec<_> = fs::read_dir(&card)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(left, ["locked.img"]);
    }

    #[test]
    fn test_wipe_empty_card() {
        let temp = TempDir::new().unwrap();
        let report = wipe_card(temp.path()).unwrap();
        assert_eq!(report.removed, 0);
    }

    #[test]
    fn test_wipe_missing_card_is_an_error() {
        let temp = TempDir::new().unwrap();
        assert!(wipe_card(&temp.path().join("absent")).is_err());
    }
}
