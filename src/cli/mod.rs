//! Command-line interface for git-origins
//!
//! This module defines the CLI structure using clap derive macros.
//! Each subcommand is implemented in its own submodule.

use clap::{Parser, Subcommand};

use crate::error::Result;

mod blacklist;
mod origin;
mod range;
mod sync;

/// git-origins - cherry-pick provenance tracking
///
/// Records which commits a commit was derived from in a mergeable
/// ledger inside the repository, and uses it to filter branch
/// comparisons down to genuinely new commits.
#[derive(Parser, Debug)]
#[command(name = "git-origins")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the repository (defaults to current directory)
    #[arg(long, global = true, env = "GIT_ORIGINS_REPO")]
    pub repo: Option<std::path::PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record an origin commit on a subject commit
    Add {
        /// Commit-ish the subject was derived from
        origin: String,

        /// Subject commit-ish (defaults to HEAD)
        subject: Option<String>,
    },

    /// Show the origins recorded for a commit
    Show {
        /// Subject commit-ish (defaults to HEAD)
        subject: Option<String>,
    },

    /// List all commits with recorded origins
    Ls,

    /// Remove the origin entry for a commit
    Rm {
        /// Subject commit-ish
        subject: String,
    },

    /// Global suppression list management
    #[command(subcommand)]
    Blacklist(BlacklistCommands),

    /// Compare two branches, suppressing commits known on both sides
    Range {
        /// Left (upstream) endpoint
        left: String,

        /// Right (local) endpoint
        right: String,

        /// Restrict the comparison to commits touching one path
        #[arg(long)]
        path: Option<std::path::PathBuf>,

        /// Also report suppressed commits instead of omitting them
        #[arg(long)]
        all: bool,
    },

    /// Publish the ledger ref to a remote
    Push {
        /// Remote name (defaults to the configured remote)
        remote: Option<String>,
    },

    /// Fetch the remote ledger and merge it into the local one
    Pull {
        /// Remote name (defaults to the configured remote)
        remote: Option<String>,

        /// Don't open an editor on conflicts; leave files for manual
        /// resolution
        #[arg(long)]
        no_edit: bool,
    },
}

/// Blacklist subcommands
#[derive(Subcommand, Debug)]
pub enum BlacklistCommands {
    /// Add commits to the suppression list
    Add {
        /// Commit-ish values to suppress
        #[arg(required = true)]
        commits: Vec<String>,
    },

    /// Show the suppression list
    Show,
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Add { origin, subject } => origin::run_add(origin::AddOptions {
                origin,
                subject,
                repo: self.repo,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Show { subject } => origin::run_show(origin::ShowOptions {
                subject,
                repo: self.repo,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Ls => origin::run_ls(origin::LsOptions {
                repo: self.repo,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Rm { subject } => origin::run_rm(origin::RmOptions {
                subject,
                repo: self.repo,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Blacklist(cmd) => match cmd {
                BlacklistCommands::Add { commits } => {
                    blacklist::run_add(blacklist::AddOptions {
                        commits,
                        repo: self.repo,
                        json: self.json,
                        quiet: self.quiet,
                    })
                }
                BlacklistCommands::Show => blacklist::run_show(blacklist::ShowOptions {
                    repo: self.repo,
                    json: self.json,
                    quiet: self.quiet,
                }),
            },
            Commands::Range {
                left,
                right,
                path,
                all,
            } => range::run(range::RangeOptions {
                left,
                right,
                path,
                all,
                repo: self.repo,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Push { remote } => sync::run_push(sync::PushOptions {
                remote,
                repo: self.repo,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Pull { remote, no_edit } => sync::run_pull(sync::PullOptions {
                remote,
                no_edit,
                repo: self.repo,
                json: self.json,
                quiet: self.quiet,
            }),
        }
    }
}
