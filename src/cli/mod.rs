pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "reeldigest")]
#[command(about = "Letterboxd activity digests for a Telegram chat", long_about = None)]
pub struct Cli {
    /// Path to config.toml (default: ~/.config/reeldigest/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Maximum simultaneous requests, overriding fetch.max_connections
    #[arg(long, global = true)]
    pub connections: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Poll forever, reading >add, >remove, >age and ping from stdin
    Run {
        /// Entry age and polling period (e.g., "1h", "30m", "60")
        #[arg(short, long)]
        age: Option<String>,

        /// Print digests instead of sending them
        #[arg(long)]
        dry_run: bool,
    },
    /// Run a single cycle and exit
    Once {
        /// Entry age (e.g., "1h", "30m", "60")
        #[arg(short, long)]
        age: Option<String>,

        /// Print the digest instead of sending it
        #[arg(long)]
        dry_run: bool,
    },
    /// Manage tracked users
    Users {
        #[command(subcommand)]
        action: UsersAction,
    },
}

#[derive(Subcommand)]
pub enum UsersAction {
    /// List tracked users
    List,
    /// Start tracking a user
    Add {
        /// Letterboxd username
        name: String,
    },
    /// Stop tracking a user
    Remove {
        /// Letterboxd username
        name: String,
    },
}
