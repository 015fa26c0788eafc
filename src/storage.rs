//! Scratch-area layout for git-origins
//!
//! Ephemeral state lives under `.git/origins/` and is safely
//! re-creatable; nothing here is part of the durable contract.
//!
//! # Directory Structure
//!
//! ```text
//! .git/origins/                 # Repository-private scratch area
//!   index                       # On-disk staging index (merge resolution)
//!   merge_wd/                   # Conflict files materialized for editing
//! ```

use std::fs;
use std::path::PathBuf;

use crate::error::Result;

/// Name of the scratch directory within .git
pub const SCRATCH_DIR: &str = "origins";

/// Paths into the repository-private scratch area.
#[derive(Debug, Clone)]
pub struct Storage {
    /// Path to .git directory (or worktree's gitdir)
    git_dir: PathBuf,
}

impl Storage {
    pub fn new(git_dir: PathBuf) -> Self {
        Self { git_dir }
    }

    /// Path to the `.git/origins/` scratch directory
    pub fn scratch_dir(&self) -> PathBuf {
        self.git_dir.join(SCRATCH_DIR)
    }

    /// Path to the on-disk staging index file
    pub fn index_file(&self) -> PathBuf {
        self.scratch_dir().join("index")
    }

    /// Path to the merge working directory for conflict files
    pub fn merge_workdir(&self) -> PathBuf {
        self.scratch_dir().join("merge_wd")
    }

    /// Create the scratch directory tree if it does not exist.
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(self.merge_workdir())?;
        Ok(())
    }

    /// Remove leftover merge-resolution state from a prior run.
    pub fn clear_merge_state(&self) -> Result<()> {
        let wd = self.merge_workdir();
        if wd.exists() {
            fs::remove_dir_all(&wd)?;
        }
        let index = self.index_file();
        if index.exists() {
            fs::remove_file(&index)?;
        }
        Ok(())
    }
}
