//! Installer configuration.
//!
//! Defaults mirror the project layout the installer ships in:
//!
//! ```text
//! <project>/
//!     bin/gen-rpi3-config.py   boot config generator
//!     ext/firmware/            board firmware, copied flat to the card root
//!     user/cache/              user programs, copied under programs/
//!     install-kernel.toml      optional overrides
//! ```
//!
//! Project root resolution order:
//! 1. `SDCARD_INSTALLER_ROOT` env var
//! 2. Nearest ancestor of the current directory containing `ext/firmware`
//! 3. The current directory

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Optional per-project override file, read from the project root.
pub const CONFIG_FILENAME: &str = "install-kernel.toml";

const ROOT_ENV: &str = "SDCARD_INSTALLER_ROOT";
const CACHE_ENV: &str = "SDCARD_INSTALLER_CACHE";
const CACHE_FILENAME: &str = ".sdcard-installer-target.txt";
const FIRMWARE_SUBDIR: &str = "ext/firmware";
const PROGRAMS_SUBDIR: &str = "user/cache";
const GENERATOR_SUBPATH: &str = "bin/gen-rpi3-config.py";
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Clone)]
pub struct InstallConfig {
    /// Board firmware, staged flat at the card root.
    pub firmware_dir: PathBuf,
    /// Compiled user programs, staged under `programs/`.
    pub programs_dir: PathBuf,
    /// Writes `config.txt` beside the kernel when run with the `.elf` path.
    pub config_generator: PathBuf,
    /// Remembers the last target directory between runs.
    pub cache_file: PathBuf,
    /// Where removable volumes get mounted.
    pub volumes_root: PathBuf,
    /// Program (plus args) listing `volumes_root` before the operator is asked.
    pub list_volumes_command: Vec<String>,
    /// Program (plus args) ejecting the target; the target path is appended.
    pub eject_command: Vec<String>,
    pub poll_interval: Duration,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct InstallToml {
    #[serde(default)]
    install: InstallSectionToml,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct InstallSectionToml {
    firmware_dir: Option<String>,
    programs_dir: Option<String>,
    config_generator: Option<String>,
    cache_file: Option<String>,
    volumes_root: Option<String>,
    list_volumes_command: Option<Vec<String>>,
    eject_command: Option<Vec<String>>,
    poll_interval_ms: Option<u64>,
}

impl InstallConfig {
    /// Built-in defaults for a project rooted at `project_root`.
    pub fn for_project(project_root: &Path) -> Self {
        Self {
            firmware_dir: project_root.join(FIRMWARE_SUBDIR),
            programs_dir: project_root.join(PROGRAMS_SUBDIR),
            config_generator: project_root.join(GENERATOR_SUBPATH),
            cache_file: env::temp_dir().join(CACHE_FILENAME),
            volumes_root: PathBuf::from(default_volumes_root()),
            list_volumes_command: vec!["ls".to_string()],
            eject_command: default_eject_command(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }

    /// Resolve the project root, then apply `install-kernel.toml` and env overrides.
    pub fn load() -> Result<Self> {
        let project_root = locate_project_root()?;
        let mut config = Self::load_from(&project_root)?;
        if let Ok(cache) = env::var(CACHE_ENV) {
            config.cache_file = PathBuf::from(cache);
        }
        Ok(config)
    }

    /// Defaults for `project_root` with its override file applied, if present.
    pub fn load_from(project_root: &Path) -> Result<Self> {
        let mut config = Self::for_project(project_root);
        let config_path = project_root.join(CONFIG_FILENAME);
        if !config_path.is_file() {
            return Ok(config);
        }

        let raw = fs::read_to_string(&config_path)
            .with_context(|| format!("reading installer config '{}'", config_path.display()))?;
        let parsed: InstallToml = toml::from_str(&raw)
            .with_context(|| format!("parsing installer config '{}'", config_path.display()))?;
        log::debug!("applying overrides from {}", config_path.display());
        config.apply(project_root, parsed.install);
        Ok(config)
    }

    fn apply(&mut self, project_root: &Path, section: InstallSectionToml) {
        let resolve = |raw: String| resolve_project_path(project_root, &raw);

        if let Some(dir) = section.firmware_dir {
            self.firmware_dir = resolve(dir);
        }
        if let Some(dir) = section.programs_dir {
            self.programs_dir = resolve(dir);
        }
        if let Some(generator) = section.config_generator {
            self.config_generator = resolve(generator);
        }
        if let Some(cache) = section.cache_file {
            self.cache_file = resolve(cache);
        }
        if let Some(root) = section.volumes_root {
            self.volumes_root = PathBuf::from(root);
        }
        if let Some(command) = section.list_volumes_command {
            self.list_volumes_command = command;
        }
        if let Some(command) = section.eject_command {
            self.eject_command = command;
        }
        if let Some(ms) = section.poll_interval_ms {
            self.poll_interval = Duration::from_millis(ms);
        }
    }
}

pub fn locate_project_root() -> Result<PathBuf> {
    if let Ok(root) = env::var(ROOT_ENV) {
        return Ok(PathBuf::from(root));
    }

    let cwd = env::current_dir().context("resolving current directory")?;
    for ancestor in cwd.ancestors() {
        if ancestor.join(FIRMWARE_SUBDIR).is_dir() {
            return Ok(ancestor.to_path_buf());
        }
    }
    log::debug!(
        "no ancestor of '{}' contains {}; using it as project root",
        cwd.display(),
        FIRMWARE_SUBDIR
    );
    Ok(cwd)
}

fn resolve_project_path(project_root: &Path, path: &str) -> PathBuf {
    let candidate = Path::new(path);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        project_root.join(candidate)
    }
}

fn default_volumes_root() -> &'static str {
    if cfg!(target_os = "macos") {
        "/Volumes"
    } else {
        "/media"
    }
}

fn default_eject_command() -> Vec<String> {
    if cfg!(target_os = "macos") {
        vec!["diskutil".to_string(), "unmount".to_string()]
    } else {
        vec!["umount".to_string()]
    }
}
