//! Ledger exchange with remotes.
//!
//! Pushing publishes the ledger ref as-is. Pulling fetches the remote
//! ledger into a remote-tracking ref (registering a persistent fetch
//! refspec on first use), then adopts it outright when no local ledger
//! exists yet, or hands the pair to the merge engine. Transport runs
//! through the `git` binary; a failing fetch or push leaves every ref
//! exactly as it was.

use std::path::PathBuf;

use git2::{Oid, Repository};

use crate::error::{Error, Result};
use crate::git;
use crate::merge::{self, ConflictEntry, MergeOutcome, Resolutions};
use crate::stage::StagingIndex;
use crate::storage::Storage;

/// Remote-tracking ref that mirrors `remote`'s ledger.
pub fn tracking_ref(remote: &str) -> String {
    format!("refs/notes/remotes/{remote}/origins")
}

/// Publish the ledger ref to a remote.
pub fn push(repo: &Repository, refname: &str, remote: &str) -> Result<()> {
    let refspec = format!("{refname}:{refname}");
    git::run_git(repo, &["push", remote, &refspec])?;
    Ok(())
}

/// Register the fetch mapping for the ledger ref on `remote`, once.
/// Returns whether the refspec was newly added. The refspec is forced
/// so replicated rewinds still update the tracking side.
pub fn ensure_fetch_refspec(repo: &Repository, remote: &str, refname: &str) -> Result<bool> {
    let spec = format!("+{}:{}", refname, tracking_ref(remote));

    let configured = repo
        .find_remote(remote)
        .map_err(|_| Error::InvalidArgument(format!("no such remote: {remote}")))?;
    let existing = configured.fetch_refspecs()?;
    let already = existing.iter().flatten().any(|candidate| candidate == spec);
    if already {
        return Ok(false);
    }

    repo.remote_add_fetch(remote, &spec)?;
    Ok(true)
}

/// How a pull concluded.
#[derive(Debug)]
pub enum PullOutcome {
    /// The remote has no ledger yet.
    NothingToPull,
    /// No local ledger existed; the fetched snapshot was adopted.
    Adopted(Oid),
    /// Local ledger already contained the remote history.
    UpToDate,
    /// Local ref fast-forwarded to the remote snapshot.
    FastForwarded(Oid),
    /// Histories diverged and merged cleanly.
    Merged(Oid),
    /// The merge driver could not reconcile these entries; no ref was
    /// moved.
    Conflicted(Vec<ConflictEntry>),
}

/// Fetch the remote ledger and reconcile it with the local one.
///
/// `resolutions` carries manually resolved entries from a previous
/// conflicted attempt; pass an empty map on the first try.
pub fn pull(
    repo: &Repository,
    refname: &str,
    remote: &str,
    resolutions: &Resolutions,
) -> Result<PullOutcome> {
    ensure_fetch_refspec(repo, remote, refname)?;
    git::run_git(repo, &["fetch", remote])?;

    let tracking = tracking_ref(remote);
    let remote_tip = match git::ref_tip(repo, &tracking)? {
        Some(oid) => oid,
        None => return Ok(PullOutcome::NothingToPull),
    };

    let local_tip = match git::ref_tip(repo, refname)? {
        Some(oid) => oid,
        None => {
            git::update_ref(repo, refname, remote_tip, "origins: adopt remote ledger")?;
            return Ok(PullOutcome::Adopted(remote_tip));
        }
    };

    match merge::merge_ledgers(repo, refname, local_tip, remote_tip, resolutions)? {
        MergeOutcome::UpToDate => Ok(PullOutcome::UpToDate),
        MergeOutcome::FastForwarded(oid) => Ok(PullOutcome::FastForwarded(oid)),
        MergeOutcome::Merged(oid) => Ok(PullOutcome::Merged(oid)),
        MergeOutcome::Conflicted(conflicts) => Ok(PullOutcome::Conflicted(conflicts)),
    }
}

/// Materialize conflict entries into the merge working directory for
/// manual editing, via the on-disk staging index variant. Returns the
/// files written, one per conflicted entry.
pub fn materialize_conflicts(
    repo: &Repository,
    storage: &Storage,
    conflicts: &[ConflictEntry],
) -> Result<Vec<PathBuf>> {
    storage.clear_merge_state()?;
    storage.init()?;

    let mut stage = StagingIndex::at_path(&storage.index_file())?;
    stage.load_tree(None)?;
    for conflict in conflicts {
        stage.upsert(repo, &conflict.name, &conflict.marker_file())?;
    }
    stage.checkout_to(repo, &storage.merge_workdir())
}

/// Read back manually resolved entries from the merge working
/// directory. Files still containing conflict markers, or not parsing
/// as id lists, fail with a merge-conflict error naming the entries.
/// An emptied file removes the entry from the merged snapshot.
pub fn read_resolutions(storage: &Storage, conflicts: &[ConflictEntry]) -> Result<Resolutions> {
    let wd = storage.merge_workdir();
    let mut resolutions = Resolutions::new();
    let mut unresolved = Vec::new();

    for conflict in conflicts {
        let path = wd.join(&conflict.name);
        let contents = std::fs::read_to_string(&path)?;
        if merge::has_conflict_markers(&contents) {
            unresolved.push(conflict.name.clone());
            continue;
        }
        match crate::ledger::parse_id_list(&contents) {
            Some(ids) => {
                resolutions.insert(conflict.name.clone(), ids);
            }
            None => unresolved.push(conflict.name.clone()),
        }
    }

    if !unresolved.is_empty() {
        return Err(Error::MergeConflict(unresolved));
    }
    Ok(resolutions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracking_ref_per_remote() {
        assert_eq!(tracking_ref("origin"), "refs/notes/remotes/origin/origins");
        assert_eq!(
            tracking_ref("upstream"),
            "refs/notes/remotes/upstream/origins"
        );
    }
}
