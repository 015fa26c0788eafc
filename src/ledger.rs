//! The origin ledger: a versioned commit-id -> origin-list store.
//!
//! The ledger is kept inside the repository itself as a linear history
//! of snapshot commits under a notes-style ref (`refs/notes/origins` by
//! default). Each snapshot's tree holds one blob per subject commit,
//! named by the subject's full hex id, whose content is the
//! newline-joined list of origin ids. The reserved entry name
//! `blacklist` holds globally suppressed ids and is excluded from
//! subject iteration.
//!
//! Writes are optimistic: the ref is read at the start of the
//! operation, the new snapshot is committed with that tip as its sole
//! parent, and the ref is then moved last-writer-wins. Two local
//! writers racing can lose an update; only replicated divergence is
//! repaired, by the merge engine.

use git2::{Oid, Repository, Tree};

use crate::error::Result;
use crate::git;
use crate::stage::StagingIndex;

/// Reserved entry name for the global suppression list.
pub const BLACKLIST_ENTRY: &str = "blacklist";

/// Outcome of a ledger write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// A new snapshot was committed and the ref advanced.
    Written,
    /// The operation changed nothing; no snapshot was created.
    Unchanged,
}

impl WriteOutcome {
    pub fn wrote(self) -> bool {
        matches!(self, WriteOutcome::Written)
    }
}

pub struct OriginLedger<'repo> {
    repo: &'repo Repository,
    refname: String,
}

impl<'repo> OriginLedger<'repo> {
    pub fn new(repo: &'repo Repository, refname: impl Into<String>) -> Self {
        Self {
            repo,
            refname: refname.into(),
        }
    }

    pub fn refname(&self) -> &str {
        &self.refname
    }

    /// Current snapshot commit, or None while the ledger is unborn.
    pub fn tip(&self) -> Result<Option<Oid>> {
        git::ref_tip(self.repo, &self.refname)
    }

    fn snapshot_tree(&self) -> Result<Option<Tree<'repo>>> {
        match self.tip()? {
            Some(oid) => {
                let commit = self.repo.find_commit(oid)?;
                Ok(Some(commit.tree()?))
            }
            None => Ok(None),
        }
    }

    fn read_entry(&self, tree: Option<&Tree>, name: &str) -> Result<Option<String>> {
        let tree = match tree {
            Some(tree) => tree,
            None => return Ok(None),
        };
        let entry = match tree.get_name(name) {
            Some(entry) => entry,
            None => return Ok(None),
        };
        let blob = self.repo.find_blob(entry.id())?;
        Ok(Some(String::from_utf8_lossy(blob.content()).into_owned()))
    }

    /// Origins currently recorded for `subject`, or None if absent.
    ///
    /// Each returned id is re-validated against the object store; ids
    /// that no longer resolve to a commit are silently dropped, so the
    /// ledger tolerates history rewrites upstream.
    pub fn get(&self, subject: Oid) -> Result<Option<Vec<Oid>>> {
        let tree = self.snapshot_tree()?;
        let contents = match self.read_entry(tree.as_ref(), &subject.to_string())? {
            Some(contents) => contents,
            None => return Ok(None),
        };

        let origins = contents
            .lines()
            .filter_map(|line| Oid::from_str(line.trim()).ok())
            .filter(|oid| git::commit_exists(self.repo, *oid))
            .collect();
        Ok(Some(origins))
    }

    /// Replace `subject`'s entry with `origins` (deduplicated,
    /// order-preserving). An empty list removes the entry. No snapshot
    /// is created when the resulting tree is identical to the current
    /// one.
    pub fn set(&self, subject: Oid, origins: &[Oid]) -> Result<WriteOutcome> {
        let origins = dedup_preserving_order(origins);
        let name = subject.to_string();
        let message = set_message(subject, &origins);
        self.write_snapshot(&message, |stage, repo| {
            if origins.is_empty() {
                stage.remove(&name)
            } else {
                stage.upsert(repo, &name, &format_id_list(&origins))
            }
        })
    }

    /// Remove `subject`'s entry entirely. No-op if absent.
    pub fn delete(&self, subject: Oid) -> Result<WriteOutcome> {
        let name = subject.to_string();
        let message = format!("origins: delete {}", git::short(subject));
        self.write_snapshot(&message, |stage, _repo| stage.remove(&name))
    }

    /// Append `origin` to `subject`'s entry unless already present.
    /// Returns whether a write occurred.
    pub fn add_origin(&self, subject: Oid, origin: Oid) -> Result<WriteOutcome> {
        let mut origins = self.get(subject)?.unwrap_or_default();
        if origins.contains(&origin) {
            return Ok(WriteOutcome::Unchanged);
        }
        origins.push(origin);
        self.set(subject, &origins)
    }

    /// All subject ids present in the current snapshot, in the tree's
    /// listing order. The blacklist entry is not a subject.
    pub fn subjects(&self) -> Result<Vec<Oid>> {
        let tree = match self.snapshot_tree()? {
            Some(tree) => tree,
            None => return Ok(Vec::new()),
        };

        let mut subjects = Vec::new();
        for entry in tree.iter() {
            let name = match entry.name() {
                Some(name) => name,
                None => continue,
            };
            if name == BLACKLIST_ENTRY {
                continue;
            }
            if let Ok(oid) = Oid::from_str(name) {
                subjects.push(oid);
            }
        }
        Ok(subjects)
    }

    /// Globally suppressed ids from the reserved blacklist entry.
    pub fn blacklist(&self) -> Result<Vec<Oid>> {
        let tree = self.snapshot_tree()?;
        let contents = match self.read_entry(tree.as_ref(), BLACKLIST_ENTRY)? {
            Some(contents) => contents,
            None => return Ok(Vec::new()),
        };
        Ok(contents
            .lines()
            .filter_map(|line| Oid::from_str(line.trim()).ok())
            .collect())
    }

    /// Add an id to the blacklist, with the usual dedup contract.
    pub fn add_blacklisted(&self, id: Oid) -> Result<WriteOutcome> {
        let mut ids = self.blacklist()?;
        if ids.contains(&id) {
            return Ok(WriteOutcome::Unchanged);
        }
        ids.push(id);
        let message = format!("origins: blacklist {}", git::short(id));
        self.write_snapshot(&message, |stage, repo| {
            stage.upsert(repo, BLACKLIST_ENTRY, &format_id_list(&ids))
        })
    }

    /// Look up entries for many subjects against a single snapshot
    /// resolution. The result maps 1:1 onto `ids`; subjects with no
    /// entry yield None. Origins are parsed but not individually
    /// re-validated here, since callers compare them against known
    /// commit sets rather than dereferencing them.
    pub fn batch_get(&self, ids: &[Oid]) -> Result<Vec<Option<Vec<Oid>>>> {
        let tree = self.snapshot_tree()?;

        let mut results = Vec::with_capacity(ids.len());
        for id in ids {
            let entry = self.read_entry(tree.as_ref(), &id.to_string())?;
            results.push(entry.map(|contents| {
                contents
                    .lines()
                    .filter_map(|line| Oid::from_str(line.trim()).ok())
                    .collect()
            }));
        }
        Ok(results)
    }

    /// Shared write path: stage the current tree, apply one mutation,
    /// and commit the result as the next snapshot. The new snapshot's
    /// sole parent is the tip read at the start of this write; the ref
    /// update is last-writer-wins.
    fn write_snapshot<F>(&self, message: &str, mutate: F) -> Result<WriteOutcome>
    where
        F: FnOnce(&mut StagingIndex, &Repository) -> Result<()>,
    {
        let tip = self.tip()?;
        let current_tree = self.snapshot_tree()?;

        let mut stage = StagingIndex::ephemeral()?;
        stage.load_tree(current_tree.as_ref())?;
        mutate(&mut stage, self.repo)?;

        let tree_id = stage.write_tree(self.repo)?;
        if current_tree.as_ref().map(|tree| tree.id()) == Some(tree_id) {
            return Ok(WriteOutcome::Unchanged);
        }
        if current_tree.is_none() && self.repo.find_tree(tree_id)?.len() == 0 {
            // Unborn ledger and the mutation staged nothing.
            return Ok(WriteOutcome::Unchanged);
        }

        let tree = self.repo.find_tree(tree_id)?;
        let signature = self.repo.signature()?;
        let parent = match tip {
            Some(oid) => Some(self.repo.find_commit(oid)?),
            None => None,
        };
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        let snapshot = self
            .repo
            .commit(None, &signature, &signature, message, &tree, &parents)?;
        git::update_ref(self.repo, &self.refname, snapshot, message)?;

        tracing::debug!(refname = %self.refname, snapshot = %snapshot, "ledger snapshot written");
        Ok(WriteOutcome::Written)
    }
}

/// Parse a strict newline-joined id list. Returns None when any
/// non-empty line is not a full hex commit id; the merge driver treats
/// that as an unresolvable entry.
pub fn parse_id_list(contents: &str) -> Option<Vec<Oid>> {
    let mut ids = Vec::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        ids.push(Oid::from_str(line).ok()?);
    }
    Some(ids)
}

/// Newline-join an id list with a trailing newline.
pub fn format_id_list(ids: &[Oid]) -> String {
    let mut out = String::with_capacity(ids.len() * 41);
    for id in ids {
        out.push_str(&id.to_string());
        out.push('\n');
    }
    out
}

/// Drop duplicate ids, keeping first-insertion order.
pub fn dedup_preserving_order(ids: &[Oid]) -> Vec<Oid> {
    let mut seen = std::collections::HashSet::new();
    ids.iter()
        .filter(|id| seen.insert(**id))
        .copied()
        .collect()
}

fn set_message(subject: Oid, origins: &[Oid]) -> String {
    let mut message = format!(
        "origins: set {} ({} origin{})\n",
        git::short(subject),
        origins.len(),
        if origins.len() == 1 { "" } else { "s" }
    );
    if !origins.is_empty() {
        message.push('\n');
        message.push_str(&format_id_list(origins));
    }
    message
}
