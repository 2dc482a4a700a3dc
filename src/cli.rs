use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Platform compatibility shim
///
/// Inspects the OS facilities bound on this host and exercises the
/// username, file owner and log-lock helpers.
#[derive(Parser, Debug)]
#[command(name = "platform-compat")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory for the shared log lock (defaults to the system temp dir)
    #[arg(long, global = true)]
    pub lock_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the platform class and which facilities are available
    Info {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the login name of the current user
    Whoami,
    /// Print the login name owning a file
    Owner {
        path: PathBuf,
    },
    /// Look up a user by login name or uid
    User {
        name: String,
    },
    /// Look up a group by name or gid
    Group {
        name: String,
    },
    /// Print the path of the shared log lock
    LockPath,
    /// Append a line to a log file while holding the shared log lock
    Log {
        file: PathBuf,
        message: String,
    },
    /// Send a message to the system logger
    Syslog {
        message: String,

        /// Identity prefixed to the message
        #[arg(long, default_value = "platform-compat")]
        ident: String,
    },
}
