//! Stage a bare-metal kernel onto a Raspberry Pi boot SD card.
//!
//! After a kernel build, the installer copies everything the board needs to
//! boot onto the mounted card and ejects it:
//!
//! - **Kernel** - the flattened `.bin`/`.img`, staged as `kernel8.img`
//! - **Boot config** - `config.txt`, generated from the linked `.elf` unless a
//!   prebuilt image ships its own
//! - **Firmware** - every file under `ext/firmware`, at the card root
//! - **User programs** - every file under `user/cache`, under `programs/`
//!
//! # Architecture
//!
//! ```text
//! install-kernel (bin)
//!     │
//!     ├── cli         argument parsing, usage, exit codes
//!     ├── config      InstallConfig (defaults + install-kernel.toml)
//!     └── install     the pipeline
//!             │
//!             ├── kernel       locate .bin/.img
//!             ├── target       pick + wait for the card, remember it
//!             ├── wipe         empty the card
//!             ├── boot_config  run the config.txt generator
//!             ├── assets       staging plan
//!             ├── sync         MD5 copy-if-different with `~` backups
//!             └── volume       list volumes, eject
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use sdcard_installer::{install, FileTargetStore, InstallConfig, InstallRequest, TerminalPrompt};
//!
//! let config = InstallConfig::load()?;
//! let store = FileTargetStore::new(&config.cache_file);
//! let mut prompt = TerminalPrompt::new(config.list_volumes_command.clone());
//! let request = InstallRequest { kernel: "kern/build".into(), target: None };
//! let report = install(&request, &config, &store, &mut prompt)?;
//! println!("{} updated", report.updated());
//! ```

pub mod assets;
pub mod boot_config;
pub mod cli;
pub mod config;
pub mod install;
pub mod kernel;
pub mod sync;
pub mod target;
pub mod volume;
pub mod wipe;

pub use assets::Asset;
pub use config::InstallConfig;
pub use install::{install, InstallReport, InstallRequest};
pub use sync::SyncOutcome;
pub use target::{FileTargetStore, Prompt, TargetStore, TerminalPrompt};
