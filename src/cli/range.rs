//! cherry-range subcommand implementation

use std::path::PathBuf;

use crate::cherry::{self, RangeReport};
use crate::config::Config;
use crate::error::Result;
use crate::git;
use crate::ledger::OriginLedger;

/// Options for the range command
pub struct RangeOptions {
    pub left: String,
    pub right: String,
    pub path: Option<PathBuf>,
    pub all: bool,
    pub repo: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

/// Run the range command
pub fn run(options: RangeOptions) -> Result<()> {
    let repo = git::discover_repo(options.repo.as_deref())?;
    let config = match repo.workdir() {
        Some(workdir) => Config::load_from_repo(workdir),
        None => Config::default(),
    };
    let ledger = OriginLedger::new(&repo, config.ledger_ref);

    let report = cherry::resolve_range(
        &repo,
        &ledger,
        &options.left,
        &options.right,
        options.path.as_deref(),
    )?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !options.quiet {
        print_range_report(&report, options.all);
    }

    Ok(())
}

fn print_range_report(report: &RangeReport, all: bool) {
    let novel = report.novel().count();
    let suppressed = report.commits.len() - novel;
    println!(
        "git-origins range: {}...{} ({} novel, {} suppressed)",
        git::short(report.left),
        git::short(report.right),
        novel,
        suppressed
    );

    if report.commits.is_empty() {
        println!();
        println!("Branches contain the same commits.");
        return;
    }

    println!();
    for commit in &report.commits {
        if commit.suppressed {
            if all {
                println!("{} {} (suppressed)", commit.side.tag(), commit.id);
            }
        } else {
            println!("{} {}", commit.side.tag(), commit.id);
        }
    }
}
