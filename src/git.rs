//! Git repository discovery, object-store access, and common queries.
//!
//! This module wraps the libgit2 operations used across git-origins,
//! including:
//! - Repository discovery and commit-ish resolution
//! - Ref reads and updates for the ledger ref
//! - Merge-base and one-sided history walks
//! - `git` subprocess invocation for transport commands
//!
//! Everything the rest of the crate knows about the object store goes
//! through here; no other module talks to libgit2 refs or revwalks
//! directly.

use std::path::{Path, PathBuf};
use std::process::Command;

use git2::{DiffOptions, ErrorCode, Oid, Repository, Sort};

use crate::error::{Error, Result};

/// Discover a git repository from a starting path.
pub fn discover_repo(start: Option<&Path>) -> Result<Repository> {
    let start_path = match start {
        Some(path) => path.to_path_buf(),
        None => std::env::current_dir()?,
    };

    Repository::discover(&start_path).map_err(|err| {
        if err.code() == ErrorCode::NotFound {
            Error::RepoNotFound(start_path)
        } else {
            Error::Git(err)
        }
    })
}

/// Return the repository workdir (root of the working tree).
pub fn workdir(repo: &Repository) -> Result<PathBuf> {
    repo.workdir()
        .map(|path| path.to_path_buf())
        .ok_or_else(|| Error::OperationFailed("repository has no working directory".to_string()))
}

/// Resolve a commit-ish (ref name, abbreviated or full id) to a commit OID.
pub fn resolve_commit(repo: &Repository, spec: &str) -> Result<Oid> {
    let obj = repo
        .revparse_single(spec)
        .map_err(|_| Error::Resolution(spec.to_string()))?;
    let commit = obj
        .peel_to_commit()
        .map_err(|_| Error::Resolution(spec.to_string()))?;
    Ok(commit.id())
}

/// Check whether an id resolves to a commit that still exists.
pub fn commit_exists(repo: &Repository, oid: Oid) -> bool {
    repo.find_commit(oid).is_ok()
}

/// Read the tip of a ref, or None if the ref does not exist yet.
pub fn ref_tip(repo: &Repository, refname: &str) -> Result<Option<Oid>> {
    match repo.refname_to_id(refname) {
        Ok(oid) => Ok(Some(oid)),
        Err(err) if err.code() == ErrorCode::NotFound => Ok(None),
        Err(err) => Err(Error::Git(err)),
    }
}

/// Move (or create) a ref to point at a commit. Last-writer-wins; there
/// is no compare-and-swap across the read and this update.
pub fn update_ref(repo: &Repository, refname: &str, target: Oid, log_message: &str) -> Result<()> {
    repo.reference(refname, target, true, log_message)?;
    Ok(())
}

/// Find the merge base of two commits.
pub fn merge_base(repo: &Repository, a: Oid, b: Oid) -> Result<Oid> {
    repo.merge_base(a, b).map_err(|err| {
        if err.code() == ErrorCode::NotFound {
            Error::OperationFailed(format!("no merge base between {} and {}", short(a), short(b)))
        } else {
            Error::Git(err)
        }
    })
}

/// Check whether `ancestor` is an ancestor of (or equal to) `descendant`.
pub fn is_ancestor(repo: &Repository, ancestor: Oid, descendant: Oid) -> Result<bool> {
    if ancestor == descendant {
        return Ok(true);
    }
    repo.graph_descendant_of(descendant, ancestor)
        .map_err(Error::Git)
}

/// List commits reachable from `tip` but not from `other`.
///
/// Returns commits in topological/time order (newest first).
pub fn commits_only_in(repo: &Repository, tip: Oid, other: Oid) -> Result<Vec<Oid>> {
    let mut revwalk = repo.revwalk()?;
    revwalk.push(tip)?;
    revwalk.hide(other)?;
    revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;

    let mut commits = Vec::new();
    for oid in revwalk {
        commits.push(oid?);
    }
    Ok(commits)
}

/// Check whether a commit changed `path` relative to its first parent.
pub fn commit_touches_path(repo: &Repository, oid: Oid, path: &Path) -> Result<bool> {
    let commit = repo.find_commit(oid)?;
    let tree = commit.tree()?;
    let parent_tree = match commit.parent(0) {
        Ok(parent) => Some(parent.tree()?),
        Err(_) => None,
    };

    let mut options = DiffOptions::new();
    options.pathspec(path);
    let diff = repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), Some(&mut options))?;
    Ok(diff.deltas().len() > 0)
}

/// Blob id of `path` in a commit's tree, or None if absent there.
pub fn blob_at_path(repo: &Repository, oid: Oid, path: &Path) -> Result<Option<Oid>> {
    let commit = repo.find_commit(oid)?;
    let tree = commit.tree()?;
    match tree.get_path(path) {
        Ok(entry) => Ok(Some(entry.id())),
        Err(err) if err.code() == ErrorCode::NotFound => Ok(None),
        Err(err) => Err(Error::Git(err)),
    }
}

/// Abbreviated hex form of an id for messages and display.
pub fn short(oid: Oid) -> String {
    oid.to_string()[..8].to_string()
}

/// Run a `git` subcommand against the repository, surfacing the failing
/// command line and its stderr on non-zero exit. Transport commands
/// (fetch/push) go through here; object and ref access stays on libgit2.
///
/// The environment passed to the child is explicit: `GIT_DIR` is pinned
/// to this repository so the invocation never depends on ambient process
/// state or the caller's working directory.
pub fn run_git(repo: &Repository, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .env("GIT_DIR", repo.path())
        .current_dir(repo.path())
        .output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(Error::Subprocess {
            command: format!("git {}", args.join(" ")),
            stderr,
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
