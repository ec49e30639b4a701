use anyhow::Result;
use env_logger::Env;

use sdcard_installer::cli::{exit_code, parse_args, usage, Invocation};
use sdcard_installer::{install, FileTargetStore, InstallConfig, TerminalPrompt};

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(err) = run(&args) {
        eprintln!("error: {err:#}");
        std::process::exit(exit_code(&err));
    }
}

fn run(args: &[String]) -> Result<()> {
    let request = match parse_args(args)? {
        Invocation::Help => {
            println!("{}", usage());
            return Ok(());
        }
        Invocation::Install(request) => request,
    };

    let config = InstallConfig::load()?;
    let store = FileTargetStore::new(&config.cache_file);
    let mut prompt = TerminalPrompt::new(config.list_volumes_command.clone());

    let report = install(&request, &config, &store, &mut prompt)?;
    println!(
        "[install] {}: {} updated, {} up-to-date",
        report.target.display(),
        report.updated(),
        report.up_to_date()
    );
    Ok(())
}
