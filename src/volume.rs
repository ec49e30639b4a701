//! Volume manager collaborators: listing mount points and ejecting the card.
//!
//! Both are best effort. Their exit status never fails an install.

use std::path::Path;
use std::process::{Command, ExitStatus};

/// Show what is mounted under `volumes_root` so the operator can pick a target.
pub fn list_volumes(command: &[String], volumes_root: &Path) {
    let Some((program, args)) = command.split_first() else {
        return;
    };
    if let Err(e) = Command::new(program).args(args).arg(volumes_root).status() {
        log::warn!("could not list volumes with '{}': {}", program, e);
    }
}

/// Ask the volume manager to eject `target`.
///
/// Returns the command's exit status when it could be spawned at all; callers
/// are not expected to act on it.
pub fn eject(command: &[String], target: &Path) -> Option<ExitStatus> {
    let Some((program, args)) = command.split_first() else {
        log::warn!("no eject command configured; leaving {} mounted", target.display());
        return None;
    };

    if which::which(program).is_err() {
        log::warn!("eject program '{}' not found in PATH", program);
    }

    println!("[install] unmounting {}", target.display());
    match Command::new(program).args(args).arg(target).status() {
        Ok(status) => {
            if !status.success() {
                log::debug!("'{}' exited with {}", program, status);
            }
            Some(status)
        }
        Err(e) => {
            log::warn!("could not run '{}' for {}: {}", program, target.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    #[test]
    fn test_eject_appends_target() {
        let temp = TempDir::new().unwrap();
        let log = temp.path().join("ejected");
        let script = temp.path().join("eject.sh");
        fs::write(
            &script,
            format!("#!/bin/sh\necho \"$@\" > '{}'\n", log.display()),
        )
        .unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let command = vec![script.display().to_string(), "unmount".to_string()];
        let status = eject(&command, Path::new("/Volumes/BOOT")).unwrap();

        assert!(status.success());
        assert_eq!(
            fs::read_to_string(&log).unwrap().trim(),
            "unmount /Volumes/BOOT"
        );
    }

    #[test]
    fn test_eject_failure_is_not_an_error() {
        let command = vec!["false".to_string()];
        let status = eject(&command, Path::new("/Volumes/BOOT")).unwrap();
        assert!(!status.success());
    }

    #[test]
    fn test_eject_missing_program_is_tolerated() {
        let command = vec!["definitely_not_a_real_command_12345".to_string()];
        assert!(eject(&command, Path::new("/Volumes/BOOT")).is_none());
    }

    #[test]
    fn test_eject_without_command() {
        assert!(eject(&[], Path::new("/Volumes/BOOT")).is_none());
    }
}
