//! push/pull subcommand implementations
//!
//! Pull owns the interactive conflict-resolution flow: conflicts are
//! materialized under `.git/origins/merge_wd`, opened in the user's
//! editor when one is configured, and the merge completes from the
//! edited files.

use std::path::{Path, PathBuf};
use std::process::Command;

use git2::Repository;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::git;
use crate::merge::{ConflictEntry, Resolutions};
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::storage::Storage;
use crate::sync::{self, PullOutcome};

/// Options for the push command
pub struct PushOptions {
    pub remote: Option<String>,
    pub repo: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

/// Options for the pull command
pub struct PullOptions {
    pub remote: Option<String>,
    pub no_edit: bool,
    pub repo: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

#[derive(serde::Serialize)]
struct PushReport {
    remote: String,
    refname: String,
}

#[derive(serde::Serialize)]
struct PullReport {
    remote: String,
    refname: String,
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    snapshot: Option<String>,
}

fn open_with_config(repo_arg: Option<&Path>) -> Result<(Repository, Config)> {
    let repo = git::discover_repo(repo_arg)?;
    let config = match repo.workdir() {
        Some(workdir) => Config::load_from_repo(workdir),
        None => Config::default(),
    };
    Ok((repo, config))
}

/// Run the push command
pub fn run_push(options: PushOptions) -> Result<()> {
    let (repo, config) = open_with_config(options.repo.as_deref())?;
    let remote = options.remote.unwrap_or(config.remote);

    sync::push(&repo, &config.ledger_ref, &remote)?;

    let report = PushReport {
        remote: remote.clone(),
        refname: config.ledger_ref.clone(),
    };

    let mut human = HumanOutput::new(format!("git-origins push: published to {remote}"));
    human.push_summary("remote", remote);
    human.push_summary("ref", config.ledger_ref);

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "push",
        &report,
        Some(&human),
    )
}

/// Run the pull command
pub fn run_pull(options: PullOptions) -> Result<()> {
    let (repo, config) = open_with_config(options.repo.as_deref())?;
    let remote = options.remote.clone().unwrap_or_else(|| config.remote.clone());
    let refname = config.ledger_ref.clone();
    let storage = Storage::new(repo.path().to_path_buf());

    let outcome = sync::pull(&repo, &refname, &remote, &Resolutions::new())?;

    let outcome = match outcome {
        PullOutcome::Conflicted(conflicts) => {
            resolve_interactively(&repo, &storage, &refname, &remote, conflicts, options.no_edit)?
        }
        other => other,
    };

    let (label, snapshot) = match &outcome {
        PullOutcome::NothingToPull => ("nothing_to_pull", None),
        PullOutcome::Adopted(oid) => ("adopted", Some(*oid)),
        PullOutcome::UpToDate => ("up_to_date", None),
        PullOutcome::FastForwarded(oid) => ("fast_forwarded", Some(*oid)),
        PullOutcome::Merged(oid) => ("merged", Some(*oid)),
        PullOutcome::Conflicted(conflicts) => {
            return Err(Error::MergeConflict(
                conflicts.iter().map(|c| c.name.clone()).collect(),
            ));
        }
    };

    let report = PullReport {
        remote: remote.clone(),
        refname: refname.clone(),
        outcome: label,
        snapshot: snapshot.map(|oid| oid.to_string()),
    };

    let header = match &outcome {
        PullOutcome::NothingToPull => format!("git-origins pull: {remote} has no ledger"),
        PullOutcome::Adopted(oid) => {
            format!("git-origins pull: adopted remote ledger at {}", git::short(*oid))
        }
        PullOutcome::UpToDate => "git-origins pull: already up to date".to_string(),
        PullOutcome::FastForwarded(oid) => {
            format!("git-origins pull: fast-forwarded to {}", git::short(*oid))
        }
        PullOutcome::Merged(oid) => {
            format!("git-origins pull: merged as {}", git::short(*oid))
        }
        PullOutcome::Conflicted(_) => unreachable!("conflicts handled above"),
    };

    let mut human = HumanOutput::new(header);
    human.push_summary("remote", remote);
    human.push_summary("ref", refname);

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "pull",
        &report,
        Some(&human),
    )
}

/// Materialize conflicts, let the operator edit them, and complete the
/// merge from the edited files. Without an editor (or with --no-edit)
/// the files are left in place and the conflict is surfaced as-is.
fn resolve_interactively(
    repo: &Repository,
    storage: &Storage,
    refname: &str,
    remote: &str,
    conflicts: Vec<ConflictEntry>,
    no_edit: bool,
) -> Result<PullOutcome> {
    let files = sync::materialize_conflicts(repo, storage, &conflicts)?;
    let names: Vec<String> = conflicts.iter().map(|c| c.name.clone()).collect();

    let editor = editor_command();
    let editor = match (no_edit, editor) {
        (false, Some(editor)) => editor,
        _ => return Err(Error::MergeConflict(names)),
    };

    for file in &files {
        open_in_editor(&editor, file)?;
    }

    let resolutions = sync::read_resolutions(storage, &conflicts)?;
    let outcome = sync::pull(repo, refname, remote, &resolutions)?;
    if !matches!(outcome, PullOutcome::Conflicted(_)) {
        storage.clear_merge_state()?;
    }
    Ok(outcome)
}

fn editor_command() -> Option<String> {
    for key in ["VISUAL", "EDITOR"] {
        if let Ok(value) = std::env::var(key) {
            let value = value.trim().to_string();
            if !value.is_empty() {
                return Some(value);
            }
        }
    }
    None
}

fn open_in_editor(editor: &str, file: &Path) -> Result<()> {
    let mut parts = editor.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| Error::OperationFailed("empty editor command".to_string()))?;

    let status = Command::new(program).args(parts).arg(file).status()?;
    if !status.success() {
        return Err(Error::OperationFailed(format!(
            "editor exited with {status} for {}",
            file.display()
        )));
    }
    Ok(())
}
