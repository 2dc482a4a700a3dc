pub mod identity;
pub mod info;
pub mod logging;
pub mod utils;

use anyhow::Result;
use platform_compat::CompatContext;

use crate::cli::Commands;

/// Dispatch a parsed subcommand
pub fn run_command(command: Commands, ctx: &CompatContext) -> Result<()> {
    match command {
        Commands::Info { json } => info::run_info(ctx, json),
        Commands::Whoami => identity::run_whoami(ctx),
        Commands::Owner { path } => identity::run_owner(ctx, &path),
        Commands::User { name } => identity::run_user(ctx, &name),
        Commands::Group { name } => identity::run_group(ctx, &name),
        Commands::LockPath => logging::run_lock_path(ctx),
        Commands::Log { file, message } => logging::run_log(ctx, &file, &message),
        Commands::Syslog { message, ident } => logging::run_syslog(ctx, &ident, &message),
    }
}
