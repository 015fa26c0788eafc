//! git-origins - Cherry-Pick Provenance Library
//!
//! This library provides the core functionality for the git-origins CLI
//! tool, which records which commits a commit was derived from and
//! keeps that mapping in a mergeable ledger inside the repository.
//!
//! # Core Concepts
//!
//! - **Origin Ledger**: a versioned commit-id -> origin-list store kept
//!   as snapshot commits under `refs/notes/origins`
//! - **Staging Index**: the ephemeral structure each write uses to
//!   build the next snapshot tree
//! - **Merge Engine**: three-way reconciliation of diverged ledger
//!   histories with an id-list-aware conflict driver
//! - **Cherry Range**: branch comparison that suppresses commits known
//!   on both sides, via origins and the blacklist
//! - **Sync**: ledger exchange with remotes over fetch/push
//!
//! # Module Organization
//!
//! - `cli`: command-line interface using clap
//! - `config`: configuration loading from `.origins.toml`
//! - `error`: error types and result aliases
//! - `git`: object-store access wrapper using libgit2
//! - `stage`: staging index for building snapshot trees
//! - `ledger`: the origin ledger itself
//! - `merge`: the ledger merge engine
//! - `cherry`: cherry-range resolution
//! - `sync`: push/pull coordination
//! - `storage`: scratch-area layout under `.git/origins/`
//! - `output`: shared human/JSON output formatting

pub mod cherry;
pub mod cli;
pub mod config;
pub mod error;
pub mod git;
pub mod ledger;
pub mod merge;
pub mod output;
pub mod stage;
pub mod storage;
pub mod sync;

pub use error::{Error, Result};
