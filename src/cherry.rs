//! Cherry-range resolution.
//!
//! Compares two branch tips, enumerates the commits unique to each side
//! relative to their merge base, and classifies every commit as novel
//! or suppressed using the origin ledger: blacklisted commits are
//! always suppressed, and a commit whose recorded origins all appear in
//! the compared range is suppressed together with those origins.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use git2::{Oid, Repository};
use serde::Serialize;

use crate::error::Result;
use crate::git;
use crate::ledger::OriginLedger;

/// Which side of the comparison a commit is unique to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Reachable only from the left endpoint (upstream-only).
    Left,
    /// Reachable only from the right endpoint (local-only).
    Right,
}

impl Side {
    /// Direction tag used in range output: `-` upstream, `>` local.
    pub fn tag(self) -> char {
        match self {
            Side::Left => '-',
            Side::Right => '>',
        }
    }
}

/// One commit in the symmetric difference, with its classification.
#[derive(Debug, Clone, Serialize)]
pub struct RangeCommit {
    #[serde(serialize_with = "serialize_oid")]
    pub id: Oid,
    pub side: Side,
    pub suppressed: bool,
}

fn serialize_oid<S: serde::Serializer>(oid: &Oid, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&oid.to_string())
}

/// Full result of a cherry-range query.
#[derive(Debug, Serialize)]
pub struct RangeReport {
    #[serde(serialize_with = "serialize_oid")]
    pub left: Oid,
    #[serde(serialize_with = "serialize_oid")]
    pub right: Oid,
    pub commits: Vec<RangeCommit>,
}

impl RangeReport {
    pub fn novel(&self) -> impl Iterator<Item = &RangeCommit> {
        self.commits.iter().filter(|commit| !commit.suppressed)
    }
}

/// Compare two commit-ish endpoints and classify the symmetric
/// difference of their histories against the origin ledger.
///
/// With `path`, the comparison is restricted to commits touching that
/// path, and the upstream walk stops at the anchor point (the first
/// upstream commit whose content for the path equals the earliest known
/// local content).
pub fn resolve_range(
    repo: &Repository,
    ledger: &OriginLedger,
    left_spec: &str,
    right_spec: &str,
    path: Option<&Path>,
) -> Result<RangeReport> {
    let left = git::resolve_commit(repo, left_spec)?;
    let right = git::resolve_commit(repo, right_spec)?;

    let mut left_only = git::commits_only_in(repo, left, right)?;
    let mut right_only = git::commits_only_in(repo, right, left)?;

    if let Some(path) = path {
        right_only = touching(repo, &right_only, path)?;
        left_only = touching(repo, &left_only, path)?;

        let base = git::merge_base(repo, left, right)?;
        let anchor = local_content_anchor(repo, &right_only, base, path)?;
        if let Some(anchor) = anchor {
            left_only = truncate_at_anchor(repo, &left_only, anchor, path)?;
        }
    }

    let mut commits: Vec<(Oid, Side)> = Vec::with_capacity(left_only.len() + right_only.len());
    commits.extend(left_only.iter().map(|oid| (*oid, Side::Left)));
    commits.extend(right_only.iter().map(|oid| (*oid, Side::Right)));

    // One batched ledger round trip for the whole difference set.
    let ids: Vec<Oid> = commits.iter().map(|(oid, _)| *oid).collect();
    let batch = ledger.batch_get(&ids)?;
    let mut entries = HashMap::new();
    for (id, entry) in ids.iter().zip(batch) {
        if let Some(origins) = entry {
            entries.insert(*id, origins);
        }
    }

    let blacklist: HashSet<Oid> = ledger.blacklist()?.into_iter().collect();
    let suppressed = classify(&commits, &entries, &blacklist);

    let commits = commits
        .into_iter()
        .map(|(id, side)| RangeCommit {
            id,
            side,
            suppressed: suppressed.contains(&id),
        })
        .collect();

    Ok(RangeReport {
        left,
        right,
        commits,
    })
}

/// Compute the suppressed subset of a difference set.
///
/// A commit is suppressed when it is blacklisted, or when it has a
/// non-empty origin entry whose ids all appear in the set; in the
/// latter case its origins in the set are suppressed with it.
pub fn classify(
    commits: &[(Oid, Side)],
    entries: &HashMap<Oid, Vec<Oid>>,
    blacklist: &HashSet<Oid>,
) -> HashSet<Oid> {
    let members: HashSet<Oid> = commits.iter().map(|(oid, _)| *oid).collect();
    let mut suppressed = HashSet::new();

    for (oid, _) in commits {
        if blacklist.contains(oid) {
            suppressed.insert(*oid);
            continue;
        }
        if let Some(origins) = entries.get(oid) {
            if !origins.is_empty() && origins.iter().all(|origin| members.contains(origin)) {
                suppressed.insert(*oid);
                for origin in origins {
                    suppressed.insert(*origin);
                }
            }
        }
    }

    suppressed
}

fn touching(repo: &Repository, commits: &[Oid], path: &Path) -> Result<Vec<Oid>> {
    let mut out = Vec::new();
    for oid in commits {
        if git::commit_touches_path(repo, *oid, path)? {
            out.push(*oid);
        }
    }
    Ok(out)
}

/// The earliest known local content for `path`: the blob at the oldest
/// local-only commit touching it, falling back to the merge base.
fn local_content_anchor(
    repo: &Repository,
    right_only: &[Oid],
    base: Oid,
    path: &Path,
) -> Result<Option<Oid>> {
    // right_only is newest-first; the anchor is the oldest.
    if let Some(oldest) = right_only.last() {
        if let Some(blob) = git::blob_at_path(repo, *oldest, path)? {
            return Ok(Some(blob));
        }
    }
    git::blob_at_path(repo, base, path)
}

/// Keep upstream commits newer than the anchor point; the commit whose
/// content matches the anchor, and everything older, is dropped.
fn truncate_at_anchor(
    repo: &Repository,
    left_only: &[Oid],
    anchor: Oid,
    path: &Path,
) -> Result<Vec<Oid>> {
    let mut out = Vec::new();
    for oid in left_only {
        if git::blob_at_path(repo, *oid, path)? == Some(anchor) {
            break;
        }
        out.push(*oid);
    }
    Ok(out)
}
