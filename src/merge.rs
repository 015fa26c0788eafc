//! Three-way merge of diverged ledger histories.
//!
//! Reconciles two ledger snapshots that diverged from a common ancestor
//! into one snapshot, entry by entry. Entries changed on one side take
//! that side, like any tree-level three-way merge; entries changed on
//! both sides go through a value-level driver specialized for id lists.
//! Entries the driver cannot decide are surfaced as conflicts and the
//! merge is not committed.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use git2::{Oid, Repository, Tree};

use crate::error::{Error, Result};
use crate::git;
use crate::ledger::{format_id_list, parse_id_list};
use crate::stage::StagingIndex;

/// Standard git conflict marker for the local side
pub const CONFLICT_MARKER_OURS: &str = "<<<<<<<";

/// Standard git conflict marker separator
pub const CONFLICT_MARKER_SEP: &str = "=======";

/// Standard git conflict marker for the remote side
pub const CONFLICT_MARKER_THEIRS: &str = ">>>>>>>";

/// How a merge concluded.
#[derive(Debug)]
pub enum MergeOutcome {
    /// The local snapshot already contains the remote history.
    UpToDate,
    /// The local ref was fast-forwarded to the remote snapshot.
    FastForwarded(Oid),
    /// A merge snapshot with two parents was committed.
    Merged(Oid),
    /// Unresolvable entries; nothing was committed, the local ref is
    /// untouched. Each entry carries the three sides for resolution.
    Conflicted(Vec<ConflictEntry>),
}

/// One ledger entry the automatic driver could not reconcile.
#[derive(Debug, Clone)]
pub struct ConflictEntry {
    /// Entry name (subject hex id or the blacklist name).
    pub name: String,
    pub ancestor: Option<String>,
    pub local: Option<String>,
    pub remote: Option<String>,
}

impl ConflictEntry {
    /// Render the entry as a conflict-marker file for manual editing.
    pub fn marker_file(&self) -> String {
        let mut out = String::new();
        out.push_str(CONFLICT_MARKER_OURS);
        out.push_str(" local\n");
        if let Some(local) = &self.local {
            out.push_str(local);
            if !local.ends_with('\n') && !local.is_empty() {
                out.push('\n');
            }
        }
        out.push_str(CONFLICT_MARKER_SEP);
        out.push('\n');
        if let Some(remote) = &self.remote {
            out.push_str(remote);
            if !remote.ends_with('\n') && !remote.is_empty() {
                out.push('\n');
            }
        }
        out.push_str(CONFLICT_MARKER_THEIRS);
        out.push_str(" remote\n");
        out
    }
}

/// Check if content still contains git conflict markers.
pub fn has_conflict_markers(content: &str) -> bool {
    content.contains(CONFLICT_MARKER_OURS)
        && content.contains(CONFLICT_MARKER_SEP)
        && content.contains(CONFLICT_MARKER_THEIRS)
}

/// Manual resolutions keyed by entry name; an empty list removes the
/// entry from the merged snapshot.
pub type Resolutions = BTreeMap<String, Vec<Oid>>;

/// Merge the remote ledger snapshot into the local one.
///
/// On a clean merge the new snapshot is committed with two parents
/// (local, remote) and `refname` is advanced. Conflicts leave the ref
/// untouched; the caller resolves them and re-runs with `resolutions`.
pub fn merge_ledgers(
    repo: &Repository,
    refname: &str,
    local: Oid,
    remote: Oid,
    resolutions: &Resolutions,
) -> Result<MergeOutcome> {
    if git::is_ancestor(repo, remote, local)? {
        return Ok(MergeOutcome::UpToDate);
    }
    if git::is_ancestor(repo, local, remote)? {
        git::update_ref(repo, refname, remote, "origins: fast-forward to remote")?;
        return Ok(MergeOutcome::FastForwarded(remote));
    }

    let ancestor = git::merge_base(repo, local, remote)?;
    let ancestor_tree = repo.find_commit(ancestor)?.tree()?;
    let local_tree = repo.find_commit(local)?.tree()?;
    let remote_tree = repo.find_commit(remote)?.tree()?;

    let mut names = BTreeSet::new();
    collect_entry_names(&ancestor_tree, &mut names);
    collect_entry_names(&local_tree, &mut names);
    collect_entry_names(&remote_tree, &mut names);

    let mut merged: BTreeMap<String, String> = BTreeMap::new();
    let mut conflicts = Vec::new();

    for name in names {
        let a = entry_contents(repo, &ancestor_tree, &name)?;
        let l = entry_contents(repo, &local_tree, &name)?;
        let r = entry_contents(repo, &remote_tree, &name)?;

        if let Some(resolution) = resolutions.get(&name) {
            if !resolution.is_empty() {
                merged.insert(name, format_id_list(resolution));
            }
            continue;
        }

        match merge_entry_contents(&name, a, l, r) {
            EntryResolution::Keep(contents) => {
                merged.insert(name, contents);
            }
            EntryResolution::Drop => {}
            EntryResolution::Conflict(conflict) => conflicts.push(conflict),
        }
    }

    if !conflicts.is_empty() {
        return Ok(MergeOutcome::Conflicted(conflicts));
    }

    let mut stage = StagingIndex::ephemeral()?;
    stage.load_tree(None)?;
    for (name, contents) in &merged {
        stage.upsert(repo, name, contents)?;
    }
    let tree_id = stage.write_tree(repo)?;
    let tree = repo.find_tree(tree_id)?;

    let signature = repo.signature()?;
    let local_commit = repo.find_commit(local)?;
    let remote_commit = repo.find_commit(remote)?;
    let message = format!(
        "origins: merge {} into {}",
        git::short(remote),
        git::short(local)
    );
    let snapshot = repo.commit(
        None,
        &signature,
        &signature,
        &message,
        &tree,
        &[&local_commit, &remote_commit],
    )?;
    git::update_ref(repo, refname, snapshot, &message)?;

    tracing::debug!(%snapshot, "ledger merge committed");
    Ok(MergeOutcome::Merged(snapshot))
}

/// Value-level driver for an entry both sides changed: ordered union of
/// the two sides (local order first, then remote additions), minus ids
/// the ancestor had that both sides dropped. A removal made by only one
/// side while the other re-added the same id is not honored; the
/// addition wins.
pub fn merge_entry(ancestor: &[Oid], local: &[Oid], remote: &[Oid]) -> Vec<Oid> {
    let removed: HashSet<Oid> = ancestor
        .iter()
        .filter(|id| !local.contains(id) && !remote.contains(id))
        .copied()
        .collect();

    let mut out = Vec::new();
    for id in local.iter().chain(remote.iter()) {
        if removed.contains(id) || out.contains(id) {
            continue;
        }
        out.push(*id);
    }
    out
}

enum EntryData {
    Text(String),
    /// Tree entry that is not a blob; never equal to anything and
    /// never parseable, so it can only merge by conflict.
    Opaque,
}

enum EntryResolution {
    Keep(String),
    Drop,
    Conflict(ConflictEntry),
}

fn merge_entry_contents(
    name: &str,
    ancestor: Option<EntryData>,
    local: Option<EntryData>,
    remote: Option<EntryData>,
) -> EntryResolution {
    let a = side_text(&ancestor);
    let l = side_text(&local);
    let r = side_text(&remote);

    let opaque = matches!(ancestor, Some(EntryData::Opaque))
        || matches!(local, Some(EntryData::Opaque))
        || matches!(remote, Some(EntryData::Opaque));
    if opaque {
        return EntryResolution::Conflict(conflict(name, a, l, r));
    }

    if l == r {
        return keep_or_drop(l);
    }
    if l == a {
        return keep_or_drop(r);
    }
    if r == a {
        return keep_or_drop(l);
    }

    // Both sides changed the entry: parse and apply the id-list driver.
    let parsed_a = a.as_deref().map(parse_id_list).unwrap_or(Some(Vec::new()));
    let parsed_l = l.as_deref().map(parse_id_list).unwrap_or(Some(Vec::new()));
    let parsed_r = r.as_deref().map(parse_id_list).unwrap_or(Some(Vec::new()));

    match (parsed_a, parsed_l, parsed_r) {
        (Some(pa), Some(pl), Some(pr)) => {
            let result = merge_entry(&pa, &pl, &pr);
            if result.is_empty() {
                EntryResolution::Drop
            } else {
                EntryResolution::Keep(format_id_list(&result))
            }
        }
        _ => EntryResolution::Conflict(conflict(name, a, l, r)),
    }
}

fn keep_or_drop(side: Option<String>) -> EntryResolution {
    match side {
        Some(contents) => EntryResolution::Keep(contents),
        None => EntryResolution::Drop,
    }
}

fn conflict(
    name: &str,
    ancestor: Option<String>,
    local: Option<String>,
    remote: Option<String>,
) -> ConflictEntry {
    ConflictEntry {
        name: name.to_string(),
        ancestor,
        local,
        remote,
    }
}

fn side_text(side: &Option<EntryData>) -> Option<String> {
    match side {
        Some(EntryData::Text(text)) => Some(text.clone()),
        Some(EntryData::Opaque) | None => None,
    }
}

fn collect_entry_names(tree: &Tree, names: &mut BTreeSet<String>) {
    for entry in tree.iter() {
        if let Some(name) = entry.name() {
            names.insert(name.to_string());
        }
    }
}

fn entry_contents(repo: &Repository, tree: &Tree, name: &str) -> Result<Option<EntryData>> {
    let entry = match tree.get_name(name) {
        Some(entry) => entry,
        None => return Ok(None),
    };
    if entry.kind() != Some(git2::ObjectType::Blob) {
        return Ok(Some(EntryData::Opaque));
    }
    let blob = repo.find_blob(entry.id()).map_err(Error::Git)?;
    Ok(Some(EntryData::Text(
        String::from_utf8_lossy(blob.content()).into_owned(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oid(ch: char) -> Oid {
        Oid::from_str(&ch.to_string().repeat(40)).unwrap()
    }

    #[test]
    fn union_keeps_both_additions() {
        let (a, b, c) = (oid('a'), oid('b'), oid('c'));
        assert_eq!(merge_entry(&[a], &[a, b], &[a, c]), vec![a, b, c]);
    }

    #[test]
    fn agreed_removal_is_honored() {
        let (a, b) = (oid('a'), oid('b'));
        assert_eq!(merge_entry(&[a, b], &[a], &[a]), vec![a]);
    }

    #[test]
    fn one_sided_removal_loses_to_retention() {
        let (a, b, c) = (oid('a'), oid('b'), oid('c'));
        // Local dropped b, remote kept it and added c: the addition wins.
        assert_eq!(merge_entry(&[a, b], &[a], &[a, b, c]), vec![a, b, c]);
    }

    #[test]
    fn deletion_against_additions_keeps_additions() {
        let (a, b, c) = (oid('a'), oid('b'), oid('c'));
        assert_eq!(merge_entry(&[a, b], &[], &[a, b, c]), vec![a, b, c]);
    }

    #[test]
    fn local_order_comes_first() {
        let (a, b, c, d) = (oid('a'), oid('b'), oid('c'), oid('d'));
        assert_eq!(merge_entry(&[], &[c, a], &[d, b]), vec![c, a, d, b]);
    }

    #[test]
    fn marker_file_shape() {
        let entry = ConflictEntry {
            name: "blacklist".to_string(),
            ancestor: None,
            local: Some("garbage\n".to_string()),
            remote: Some("other\n".to_string()),
        };
        let text = entry.marker_file();
        assert!(text.starts_with("<<<<<<< local\n"));
        assert!(text.contains("\n=======\n"));
        assert!(text.ends_with(">>>>>>> remote\n"));
        assert!(has_conflict_markers(&text));
    }
}
