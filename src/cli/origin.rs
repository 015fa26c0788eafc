//! origin entry subcommand implementations
//!
//! Provides the entry-level commands: add, show, ls, rm

use std::path::{Path, PathBuf};

use git2::Repository;

use crate::config::Config;
use crate::error::Result;
use crate::git;
use crate::ledger::OriginLedger;
use crate::output::{emit_success, HumanOutput, OutputOptions};

/// Options for the add command
pub struct AddOptions {
    pub origin: String,
    pub subject: Option<String>,
    pub repo: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

/// Options for the show command
pub struct ShowOptions {
    pub subject: Option<String>,
    pub repo: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

/// Options for the ls command
pub struct LsOptions {
    pub repo: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

/// Options for the rm command
pub struct RmOptions {
    pub subject: String,
    pub repo: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

#[derive(serde::Serialize)]
struct AddReport {
    subject: String,
    origin: String,
    written: bool,
}

#[derive(serde::Serialize)]
struct ShowReport {
    subject: String,
    recorded: bool,
    origins: Vec<String>,
}

#[derive(serde::Serialize)]
struct LsReport {
    subjects: Vec<String>,
}

#[derive(serde::Serialize)]
struct RmReport {
    subject: String,
    removed: bool,
}

fn open_with_config(repo_arg: Option<&Path>) -> Result<(Repository, Config)> {
    let repo = git::discover_repo(repo_arg)?;
    let config = match repo.workdir() {
        Some(workdir) => Config::load_from_repo(workdir),
        None => Config::default(),
    };
    Ok((repo, config))
}

/// Run the add command
pub fn run_add(options: AddOptions) -> Result<()> {
    let (repo, config) = open_with_config(options.repo.as_deref())?;
    let ledger = OriginLedger::new(&repo, config.ledger_ref);

    let subject_spec = options.subject.as_deref().unwrap_or("HEAD");
    let subject = git::resolve_commit(&repo, subject_spec)?;
    let origin = git::resolve_commit(&repo, &options.origin)?;

    let outcome = ledger.add_origin(subject, origin)?;
    let written = outcome.wrote();

    let report = AddReport {
        subject: subject.to_string(),
        origin: origin.to_string(),
        written,
    };

    let header = if written {
        format!(
            "git-origins add: {} <- {}",
            git::short(subject),
            git::short(origin)
        )
    } else {
        format!(
            "git-origins add: {} already set on {}",
            git::short(origin),
            git::short(subject)
        )
    };

    let mut human = HumanOutput::new(header);
    human.push_summary("subject", subject.to_string());
    human.push_summary("origin", origin.to_string());
    human.push_summary("written", written.to_string());
    human.push_next_step(format!("git-origins show {subject_spec}"));

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "add",
        &report,
        Some(&human),
    )
}

/// Run the show command
pub fn run_show(options: ShowOptions) -> Result<()> {
    let (repo, config) = open_with_config(options.repo.as_deref())?;
    let ledger = OriginLedger::new(&repo, config.ledger_ref);

    let subject_spec = options.subject.as_deref().unwrap_or("HEAD");
    let subject = git::resolve_commit(&repo, subject_spec)?;

    let origins = ledger.get(subject)?;
    let recorded = origins.is_some();
    let origins = origins.unwrap_or_default();

    let report = ShowReport {
        subject: subject.to_string(),
        recorded,
        origins: origins.iter().map(|oid| oid.to_string()).collect(),
    };

    let header = if recorded {
        format!(
            "git-origins show: {} has {} origin{}",
            git::short(subject),
            origins.len(),
            if origins.len() == 1 { "" } else { "s" }
        )
    } else {
        format!("git-origins show: no origins for {}", git::short(subject))
    };

    let mut human = HumanOutput::new(header);
    human.push_summary("subject", subject.to_string());
    for origin in &origins {
        human.push_detail(origin.to_string());
    }

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "show",
        &report,
        Some(&human),
    )
}

/// Run the ls command
pub fn run_ls(options: LsOptions) -> Result<()> {
    let (repo, config) = open_with_config(options.repo.as_deref())?;
    let ledger = OriginLedger::new(&repo, config.ledger_ref);

    let subjects = ledger.subjects()?;

    let report = LsReport {
        subjects: subjects.iter().map(|oid| oid.to_string()).collect(),
    };

    let header = format!("git-origins ls: {} subject(s)", subjects.len());
    let mut human = HumanOutput::new(header);
    for subject in &subjects {
        human.push_detail(subject.to_string());
    }
    if subjects.is_empty() {
        human.push_next_step("git-origins add <origin> [<subject>]");
    }

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "ls",
        &report,
        Some(&human),
    )
}

/// Run the rm command
pub fn run_rm(options: RmOptions) -> Result<()> {
    let (repo, config) = open_with_config(options.repo.as_deref())?;
    let ledger = OriginLedger::new(&repo, config.ledger_ref);

    let subject = git::resolve_commit(&repo, &options.subject)?;
    let removed = ledger.delete(subject)?.wrote();

    let report = RmReport {
        subject: subject.to_string(),
        removed,
    };

    let header = if removed {
        format!("git-origins rm: removed entry for {}", git::short(subject))
    } else {
        format!("git-origins rm: no entry for {}", git::short(subject))
    };

    let mut human = HumanOutput::new(header);
    human.push_summary("subject", subject.to_string());
    human.push_summary("removed", removed.to_string());

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "rm",
        &report,
        Some(&human),
    )
}
