// TreeMerge - Tree Merge Driver for Content-Addressed Version Control
// Copyright (C) 2025 TreeMerge Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.

//! Repository handle threaded through driver entry points
//!
//! There is no process-global repository: drivers receive a `Repository`
//! value carrying the working directory, the state directory, the object
//! database, and the `assume_unchanged` option.

use crate::{Index, IndexLock, ObjectDatabase, Reporter};
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use treemerge_storage::LocalBackend;

/// Name of the repository state directory
pub const STATE_DIR: &str = ".treemerge";

/// An open repository: working directory plus state directory
pub struct Repository {
    workdir: PathBuf,
    state_dir: PathBuf,
    /// Content-addressed object database
    pub odb: Arc<ObjectDatabase>,
    /// Mark merged entries assume-unchanged so refresh skips them
    pub assume_unchanged: bool,
}

impl Repository {
    /// Initialize a new repository at `workdir`
    ///
    /// Creates the state directory, the object store, and an empty index.
    /// Initializing an existing repository is an error.
    pub fn init<P: AsRef<Path>>(workdir: P) -> Result<Self> {
        let workdir = workdir.as_ref().to_path_buf();
        let state_dir = workdir.join(STATE_DIR);
        if state_dir.exists() {
            bail!("repository already initialized at {}", workdir.display());
        }
        fs::create_dir_all(state_dir.join("objects"))
            .with_context(|| format!("failed to create {}", state_dir.display()))?;
        Index::new().save(&state_dir.join("index"))?;
        debug!(workdir = %workdir.display(), "initialized repository");
        Self::open(workdir)
    }

    /// Open the repository whose state directory lives in `workdir`
    pub fn open<P: AsRef<Path>>(workdir: P) -> Result<Self> {
        let workdir = workdir.as_ref().to_path_buf();
        let state_dir = workdir.join(STATE_DIR);
        if !state_dir.is_dir() {
            bail!("Not a treemerge repository: {}", workdir.display());
        }
        let storage = Arc::new(LocalBackend::new(state_dir.join("objects"))?);
        Ok(Repository {
            workdir,
            state_dir,
            odb: Arc::new(ObjectDatabase::new(storage)),
            assume_unchanged: false,
        })
    }

    /// Walk up from `start` until a repository state directory is found
    pub fn discover<P: AsRef<Path>>(start: P) -> Result<Self> {
        let mut current = start.as_ref().to_path_buf();
        loop {
            if current.join(STATE_DIR).is_dir() {
                return Self::open(current);
            }
            if !current.pop() {
                bail!("Not a treemerge repository (or any parent directory)");
            }
        }
    }

    /// Working directory root
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Repository state directory
    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Path of the on-disk index
    pub fn index_path(&self) -> PathBuf {
        self.state_dir.join("index")
    }

    /// Load the on-disk index (empty if it does not exist yet)
    pub fn load_index(&self) -> Result<Index> {
        Index::load(&self.index_path())
    }

    /// Whether the index has never been written
    pub fn index_unborn(&self) -> bool {
        !self.index_path().exists()
    }

    /// Acquire the exclusive index lock; contention is fatal
    pub fn lock_index(&self) -> Result<IndexLock> {
        IndexLock::acquire(&self.index_path())
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("workdir", &self.workdir)
            .finish_non_exhaustive()
    }
}

/// Per-invocation merge state: repository, in-memory index, reporter
///
/// Borrowed by the index walker and the per-path resolver; the index lock
/// is held by the driver around the whole walk.
pub struct MergeContext<'a> {
    /// Repository the merge operates on
    pub repo: &'a Repository,
    /// In-memory index, the single source of truth for final state
    pub index: &'a mut Index,
    /// Progress and error output
    pub reporter: &'a Reporter,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_and_open() {
        let temp = TempDir::new().unwrap();
        let repo = Repository::init(temp.path()).unwrap();
        assert!(repo.state_dir().is_dir());
        assert!(repo.index_path().exists());

        let reopened = Repository::open(temp.path()).unwrap();
        assert_eq!(reopened.workdir(), temp.path());
    }

    #[test]
    fn test_init_twice_fails() {
        let temp = TempDir::new().unwrap();
        Repository::init(temp.path()).unwrap();
        assert!(Repository::init(temp.path()).is_err());
    }

    #[test]
    fn test_open_missing_fails() {
        let temp = TempDir::new().unwrap();
        assert!(Repository::open(temp.path()).is_err());
    }

    #[test]
    fn test_discover_walks_up() {
        let temp = TempDir::new().unwrap();
        Repository::init(temp.path()).unwrap();

        let nested = temp.path().join("a/b/c");
        fs::create_dir_all(&nested).unwrap();

        let repo = Repository::discover(&nested).unwrap();
        assert_eq!(repo.workdir(), temp.path());
    }

    #[test]
    fn test_lock_index() {
        let temp = TempDir::new().unwrap();
        let repo = Repository::init(temp.path()).unwrap();

        let lock = repo.lock_index().unwrap();
        assert!(repo.lock_index().is_err());
        lock.rollback();
        assert!(repo.lock_index().is_ok());
    }
}
