//! Staging index for building ledger snapshots.
//!
//! A staging index is the ephemeral, writer-owned structure that holds
//! the next ledger tree before it is committed. It comes in two
//! variants, selected at construction and never branched on afterwards:
//!
//! - [`StagingIndex::ephemeral`]: purely in-memory, the default for
//!   ordinary ledger writes;
//! - [`StagingIndex::at_path`]: backed by an on-disk index file, used
//!   when a working materialization is needed (manual merge resolution).
//!
//! A staging index is created per write operation and discarded after
//! it; a rejected or failing one is never published to the ledger ref.

use std::path::{Path, PathBuf};

use git2::{Index, IndexEntry, IndexTime, Oid, Repository, Tree};

use crate::error::{Error, Result};

pub struct StagingIndex {
    index: Index,
}

impl StagingIndex {
    /// In-memory staging index (default-location variant).
    pub fn ephemeral() -> Result<Self> {
        let index = Index::new()?;
        Ok(Self { index })
    }

    /// Staging index backed by a file at an explicit location.
    pub fn at_path(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let index = Index::open(path)?;
        Ok(Self { index })
    }

    /// Replace the staged contents with the entries of a tree. Passing
    /// `None` starts from an empty tree (unborn ledger).
    pub fn load_tree(&mut self, tree: Option<&Tree>) -> Result<()> {
        self.index.clear()?;
        if let Some(tree) = tree {
            self.index.read_tree(tree)?;
        }
        Ok(())
    }

    /// Stage `contents` under `name`, writing the blob into the object
    /// store. Replaces any previous entry of the same name.
    pub fn upsert(&mut self, repo: &Repository, name: &str, contents: &str) -> Result<()> {
        let blob_id = repo.blob(contents.as_bytes())?;
        let entry = IndexEntry {
            ctime: IndexTime::new(0, 0),
            mtime: IndexTime::new(0, 0),
            dev: 0,
            ino: 0,
            mode: 0o100_644,
            uid: 0,
            gid: 0,
            file_size: contents.len() as u32,
            id: blob_id,
            flags: 0,
            flags_extended: 0,
            path: name.as_bytes().to_vec(),
        };
        self.index.add(&entry)?;
        Ok(())
    }

    /// Unstage the entry named `name`, if present.
    pub fn remove(&mut self, name: &str) -> Result<()> {
        match self.index.remove(Path::new(name), 0) {
            Ok(()) => Ok(()),
            Err(err) if err.code() == git2::ErrorCode::NotFound => Ok(()),
            Err(err) => Err(Error::Git(err)),
        }
    }

    /// Names of all staged entries, in index (listing) order.
    pub fn entry_names(&self) -> Vec<String> {
        self.index
            .iter()
            .map(|entry| String::from_utf8_lossy(&entry.path).into_owned())
            .collect()
    }

    /// Materialize the staged tree object.
    pub fn write_tree(&mut self, repo: &Repository) -> Result<Oid> {
        let tree_id = self.index.write_tree_to(repo)?;
        Ok(tree_id)
    }

    /// Check out every staged entry into `dir`, creating directories as
    /// needed. Returns the paths written.
    pub fn checkout_to(&self, repo: &Repository, dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;

        let mut written = Vec::new();
        for entry in self.index.iter() {
            let name = String::from_utf8_lossy(&entry.path).into_owned();
            let blob = repo.find_blob(entry.id)?;
            let target = dir.join(&name);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&target, blob.content())?;
            written.push(target);
        }
        Ok(written)
    }
}
