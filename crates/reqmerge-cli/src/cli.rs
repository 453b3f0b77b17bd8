use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use reqmerge_core::ResolutionChoice;

#[derive(Parser)]
#[command(name = "reqmerge")]
#[command(about = "Three-way merge and conflict resolution for request collections")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the CLI config file
    #[arg(long, global = true, value_name = "PATH", env = "REQMERGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding the remote collections
    #[arg(long, global = true, value_name = "DIR", env = "REQMERGE_REMOTE_DIR")]
    pub remote_dir: Option<PathBuf>,

    /// Workspace id on the remote
    #[arg(long, global = true, value_name = "ID", env = "REQMERGE_WORKSPACE")]
    pub workspace: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Merge LOCAL and REMOTE against their common ancestor BASE
    Merge {
        /// Common ancestor collection file
        base: PathBuf,
        /// Local collection file
        local: PathBuf,
        /// Remote collection file
        remote: PathBuf,
        /// Print the full merge result as JSON
        #[arg(long)]
        json: bool,
        /// Write the merged collection (or the JSON result with --json) to a file
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Apply conflict resolutions to a saved merge result
    Resolve {
        /// Merge result JSON, as printed by `merge --json`
        result: PathBuf,
        /// JSON array of `{ "conflictId", "choice" }` objects
        resolutions: PathBuf,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Fetch a collection from the remote into a local file
    Pull {
        /// Collection id on the remote
        collection: String,
        /// Local collection file to write
        #[arg(long, value_name = "PATH")]
        local: PathBuf,
    },
    /// Save a local collection to the remote, merging on version conflicts
    Push {
        /// Collection id on the remote
        collection: String,
        /// Local collection file
        #[arg(long, value_name = "PATH")]
        local: PathBuf,
        /// Resolve every conflict the same way instead of prompting
        #[arg(long, value_enum)]
        prefer: Option<Preference>,
    },
    /// Create a new remote collection from a local file
    Publish {
        /// Collection id to create on the remote
        collection: String,
        /// Local collection file
        #[arg(long, value_name = "PATH")]
        local: PathBuf,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Manage the CLI config file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum Preference {
    Local,
    Remote,
    Both,
}

impl From<Preference> for ResolutionChoice {
    fn from(preference: Preference) -> Self {
        match preference {
            Preference::Local => Self::KeepLocal,
            Preference::Remote => Self::KeepRemote,
            Preference::Both => Self::KeepBoth,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Create or update the config file
    Init {
        /// Maximum save calls per push, the first one included
        #[arg(long, value_name = "N")]
        max_save_attempts: Option<u32>,
        /// Name suffix for remote copies kept next to local ones
        #[arg(long, value_name = "TEXT")]
        duplicate_suffix: Option<String>,
    },
    /// Print the effective configuration
    Show,
}
