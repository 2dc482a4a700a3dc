use anyhow::{Context, Result};
use clap::Parser;

use platform_compat::{CompatContext, LockSettings};

mod cli;
mod commands;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = cli::Args::parse();

    commands::utils::init_logging(args.verbose);

    let settings = LockSettings {
        dir: args.lock_dir.clone(),
        uid: None,
    };
    let ctx = CompatContext::with_settings(&settings)
        .context("Failed to initialize platform bindings")?;

    commands::run_command(args.command, &ctx)
}
