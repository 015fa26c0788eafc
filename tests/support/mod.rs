#![allow(dead_code)]

use std::path::{Path, PathBuf};

use git2::{Oid, Repository, Signature};
use tempfile::TempDir;

/// Test repository with helpers for building commit graphs without
/// touching the working tree.
pub struct TestRepo {
    dir: TempDir,
    repo: Repository,
}

impl TestRepo {
    pub fn init() -> Result<Self, git2::Error> {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let repo = Repository::init(dir.path())?;
        set_identity(&repo)?;
        repo.set_head("refs/heads/main")?;
        Ok(Self { dir, repo })
    }

    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write_file(&self, rel_path: &str, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join(rel_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, contents)?;
        Ok(path)
    }

    /// Commit file contents onto a branch, creating the branch at the
    /// root if it does not exist yet. The working tree is not touched;
    /// the commit graph is built directly in the object store.
    pub fn commit_on(
        &self,
        branch: &str,
        files: &[(&str, &str)],
        message: &str,
    ) -> Result<Oid, git2::Error> {
        let refname = format!("refs/heads/{branch}");
        let parent = match self.repo.refname_to_id(&refname) {
            Ok(oid) => Some(self.repo.find_commit(oid)?),
            Err(_) => None,
        };

        let parent_tree = match &parent {
            Some(commit) => Some(commit.tree()?),
            None => None,
        };
        let mut builder = self.repo.treebuilder(parent_tree.as_ref())?;
        for (name, contents) in files {
            let blob = self.repo.blob(contents.as_bytes())?;
            builder.insert(*name, blob, 0o100_644)?;
        }
        let tree = self.repo.find_tree(builder.write()?)?;

        let sig = signature()?;
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        self.repo
            .commit(Some(&refname), &sig, &sig, message, &tree, &parents)
    }

    /// Create a branch at the current tip of another branch.
    pub fn branch_from(&self, name: &str, from: &str) -> Result<Oid, git2::Error> {
        let tip = self.repo.refname_to_id(&format!("refs/heads/{from}"))?;
        let commit = self.repo.find_commit(tip)?;
        self.repo.branch(name, &commit, false)?;
        Ok(tip)
    }

    /// Register a remote pointing at a local path.
    pub fn add_remote(&self, name: &str, url: &Path) -> Result<(), git2::Error> {
        self.repo.remote(name, &url.to_string_lossy())?;
        Ok(())
    }
}

/// Bare repository usable as a push/pull target.
pub struct BareRemote {
    dir: TempDir,
}

impl BareRemote {
    pub fn init() -> Result<Self, git2::Error> {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        Repository::init_bare(dir.path())?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn open(&self) -> Result<Repository, git2::Error> {
        Repository::open_bare(self.dir.path())
    }
}

pub fn signature() -> Result<Signature<'static>, git2::Error> {
    Signature::now("origins-test", "origins-test@example.com")
}

fn set_identity(repo: &Repository) -> Result<(), git2::Error> {
    let mut config = repo.config()?;
    config.set_str("user.name", "origins-test")?;
    config.set_str("user.email", "origins-test@example.com")?;
    Ok(())
}

/// Oid built from a repeated hex digit, for ids that must not resolve.
pub fn fake_oid(ch: char) -> Oid {
    Oid::from_str(&ch.to_string().repeat(40)).expect("valid hex")
}
