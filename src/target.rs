//! Destination volume resolution.
//!
//! Resolution order:
//! 1. Explicit target argument
//! 2. Target remembered from the previous run ([`TargetStore`])
//! 3. Operator prompt, after listing the volumes root ([`Prompt`])
//!
//! Whatever wins, the installer then blocks until the path is a mounted
//! directory and remembers it for next time.

use anyhow::{bail, Context, Result};
#[cfg(test)]
use std::cell::RefCell;
use std::ffi::OsStr;
use std::fs;
use std::io::{self, BufRead, Write};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

/// Persisted record of the last target directory.
pub trait TargetStore {
    fn load(&self) -> Result<Option<PathBuf>>;
    fn save(&self, target: &Path) -> Result<()>;
}

/// One-line text file holding the last target path.
#[derive(Debug, Clone)]
pub struct FileTargetStore {
    path: PathBuf,
}

impl FileTargetStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TargetStore for FileTargetStore {
    fn load(&self) -> Result<Option<PathBuf>> {
        if !self.path.is_file() {
            return Ok(None);
        }
        let raw = fs::read(&self.path)
            .with_context(|| format!("reading cached target '{}'", self.path.display()))?;
        let trimmed = trim_ascii_whitespace(&raw);
        if trimmed.is_empty() {
            return Ok(None);
        }
        Ok(Some(PathBuf::from(OsStr::from_bytes(trimmed))))
    }

    fn save(&self, target: &Path) -> Result<()> {
        fs::write(&self.path, target.as_os_str().as_bytes())
            .with_context(|| format!("writing cached target '{}'", self.path.display()))
    }
}

fn trim_ascii_whitespace(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &bytes[start..end]
}

/// In-process store so tests never touch the real cache file.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct MemoryTargetStore {
    value: RefCell<Option<PathBuf>>,
}

#[cfg(test)]
impl MemoryTargetStore {
    pub(crate) fn with_target(target: impl Into<PathBuf>) -> Self {
        Self {
            value: RefCell::new(Some(target.into())),
        }
    }

    pub(crate) fn current(&self) -> Option<PathBuf> {
        self.value.borrow().clone()
    }
}

#[cfg(test)]
impl TargetStore for MemoryTargetStore {
    fn load(&self) -> Result<Option<PathBuf>> {
        Ok(self.current())
    }

    fn save(&self, target: &Path) -> Result<()> {
        *self.value.borrow_mut() = Some(target.to_path_buf());
        Ok(())
    }
}

/// Asks the operator for a target when nothing else names one.
pub trait Prompt {
    /// Return the operator's answer, relative to `volumes_root` or absolute.
    fn ask_target(&mut self, volumes_root: &Path) -> Result<String>;
}

/// Lists the volumes root, then reads one line from stdin.
#[derive(Debug, Clone)]
pub struct TerminalPrompt {
    list_volumes_command: Vec<String>,
}

impl TerminalPrompt {
    pub fn new(list_volumes_command: Vec<String>) -> Self {
        Self {
            list_volumes_command,
        }
    }
}

impl Prompt for TerminalPrompt {
    fn ask_target(&mut self, volumes_root: &Path) -> Result<String> {
        crate::volume::list_volumes(&self.list_volumes_command, volumes_root);
        println!("[target] please provide an installation directory");
        print!("(input) > ");
        io::stdout().flush().context("flushing prompt")?;

        let mut line = String::new();
        io::stdin()
            .lock()
            .read_line(&mut line)
            .context("reading installation directory from stdin")?;
        Ok(line)
    }
}

#[derive(Debug, Clone)]
pub struct TargetResolver {
    volumes_root: PathBuf,
    poll_interval: Duration,
}

impl TargetResolver {
    pub fn new(volumes_root: impl Into<PathBuf>, poll_interval: Duration) -> Self {
        Self {
            volumes_root: volumes_root.into(),
            poll_interval,
        }
    }

    /// Pick the target, wait for it to be mounted, then remember it.
    ///
    /// Blocks with no timeout while the candidate is not a directory.
    pub fn resolve(
        &self,
        explicit: Option<&Path>,
        store: &dyn TargetStore,
        prompt: &mut dyn Prompt,
    ) -> Result<PathBuf> {
        let target = match explicit {
            Some(path) => path.to_path_buf(),
            None => match store.load()? {
                Some(cached) => {
                    log::debug!("using cached target {}", cached.display());
                    cached
                }
                None => self.ask(prompt)?,
            },
        };

        wait_for_directory(&target, self.poll_interval);
        store.save(&target)?;
        Ok(target)
    }

    fn ask(&self, prompt: &mut dyn Prompt) -> Result<PathBuf> {
        let answer = prompt.ask_target(&self.volumes_root)?;
        let answer = answer.trim();
        if answer.is_empty() {
            bail!("no installation directory given");
        }
        Ok(self.volumes_root.join(answer))
    }
}

/// Block until `path` is a directory, printing one dot per poll.
pub fn wait_for_directory(path: &Path, interval: Duration) {
    poll_until_directory(path, interval, None);
}

/// Poll until `path` is a directory or `max_polls` runs out.
///
/// Returns whether the directory showed up.
pub fn poll_until_directory(path: &Path, interval: Duration, max_polls: Option<usize>) -> bool {
    if path.is_dir() {
        return true;
    }

    println!(
        "[target] please insert your sdcard (mounting point: {})",
        path.display()
    );
    print!("    waiting");
    let _ = io::stdout().flush();

    let mut polls = 0usize;
    while !path.is_dir() {
        if max_polls.is_some_and(|max| polls >= max) {
            println!();
            return false;
        }
        print!(".");
        let _ = io::stdout().flush();
        thread::sleep(interval);
        polls += 1;
    }
    println!();
    true
}
