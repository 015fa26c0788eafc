//! blacklist subcommand implementations
//!
//! Manages the reserved suppression entry: add, show

use std::path::PathBuf;

use crate::config::Config;
use crate::error::Result;
use crate::git;
use crate::ledger::OriginLedger;
use crate::output::{emit_success, HumanOutput, OutputOptions};

/// Options for the blacklist add command
pub struct AddOptions {
    pub commits: Vec<String>,
    pub repo: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

/// Options for the blacklist show command
pub struct ShowOptions {
    pub repo: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

#[derive(serde::Serialize)]
struct AddReport {
    added: Vec<String>,
    already_listed: Vec<String>,
}

#[derive(serde::Serialize)]
struct ShowReport {
    commits: Vec<String>,
}

/// Run the blacklist add command
pub fn run_add(options: AddOptions) -> Result<()> {
    let repo = git::discover_repo(options.repo.as_deref())?;
    let config = match repo.workdir() {
        Some(workdir) => Config::load_from_repo(workdir),
        None => Config::default(),
    };
    let ledger = OriginLedger::new(&repo, config.ledger_ref);

    let mut added = Vec::new();
    let mut already_listed = Vec::new();

    for spec in &options.commits {
        let oid = git::resolve_commit(&repo, spec)?;
        if ledger.add_blacklisted(oid)?.wrote() {
            added.push(oid.to_string());
        } else {
            already_listed.push(oid.to_string());
        }
    }

    let report = AddReport {
        added: added.clone(),
        already_listed: already_listed.clone(),
    };

    let header = if added.is_empty() {
        "git-origins blacklist add: no changes".to_string()
    } else {
        format!("git-origins blacklist add: {} commit(s)", added.len())
    };

    let mut human = HumanOutput::new(header);
    human.push_summary("added", added.len().to_string());
    human.push_summary("already_listed", already_listed.len().to_string());
    for id in &added {
        human.push_detail(format!("blacklisted: {id}"));
    }
    for id in &already_listed {
        human.push_warning(format!("already blacklisted: {id}"));
    }
    human.push_next_step("git-origins blacklist show");

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "blacklist add",
        &report,
        Some(&human),
    )
}

/// Run the blacklist show command
pub fn run_show(options: ShowOptions) -> Result<()> {
    let repo = git::discover_repo(options.repo.as_deref())?;
    let config = match repo.workdir() {
        Some(workdir) => Config::load_from_repo(workdir),
        None => Config::default(),
    };
    let ledger = OriginLedger::new(&repo, config.ledger_ref);

    let commits = ledger.blacklist()?;

    let report = ShowReport {
        commits: commits.iter().map(|oid| oid.to_string()).collect(),
    };

    let header = format!("git-origins blacklist: {} commit(s)", commits.len());
    let mut human = HumanOutput::new(header);
    for id in &commits {
        human.push_detail(id.to_string());
    }

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "blacklist show",
        &report,
        Some(&human),
    )
}
