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

//! Scoped exclusive lock over the on-disk index
//!
//! Acquiring the lock creates `<index>.lock` exclusively. Committing
//! writes the new index into the lockfile and renames it over the index,
//! consuming the guard. Any other exit path, including unwinding, removes
//! the lockfile and leaves the on-disk index untouched.

use crate::Index;
use anyhow::{bail, Context, Result};
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::trace;

/// RAII guard over the exclusive index lockfile
///
/// Dropping the guard without [`commit`](IndexLock::commit) rolls back:
/// the lockfile is removed and the on-disk index stays byte-identical to
/// its state at acquisition.
#[derive(Debug)]
pub struct IndexLock {
    index_path: PathBuf,
    lock_path: PathBuf,
    armed: bool,
}

impl IndexLock {
    /// Acquire the exclusive lock for the index at `index_path`
    ///
    /// Contention (the lockfile already exists) is fatal for the caller.
    pub fn acquire(index_path: &Path) -> Result<Self> {
        let lock_path = lock_path_for(index_path);

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(_) => {
                trace!(lock = %lock_path.display(), "index lock acquired");
                Ok(IndexLock {
                    index_path: index_path.to_path_buf(),
                    lock_path,
                    armed: true,
                })
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                bail!(
                    "Unable to create '{}': another process seems to be running in this repository",
                    lock_path.display()
                )
            }
            Err(e) => Err(e).with_context(|| {
                format!("Unable to create lock file '{}'", lock_path.display())
            }),
        }
    }

    /// Write the index into the lockfile and rename it over the index,
    /// releasing the lock
    pub fn commit(mut self, index: &Index) -> Result<()> {
        let contents =
            serde_json::to_string_pretty(index).context("Failed to serialize index")?;
        fs::write(&self.lock_path, contents)
            .with_context(|| format!("Failed to write '{}'", self.lock_path.display()))?;
        fs::rename(&self.lock_path, &self.index_path).with_context(|| {
            format!("unable to write new index file '{}'", self.index_path.display())
        })?;
        self.armed = false;
        trace!(index = %self.index_path.display(), "index lock committed");
        Ok(())
    }

    /// Release the lock without touching the on-disk index
    pub fn rollback(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.armed {
            let _ = fs::remove_file(&self.lock_path);
            self.armed = false;
            trace!(lock = %self.lock_path.display(), "index lock rolled back");
        }
    }
}

impl Drop for IndexLock {
    fn drop(&mut self) {
        self.release();
    }
}

fn lock_path_for(index_path: &Path) -> PathBuf {
    let mut name = index_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    index_path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CacheEntry, FileMode, Oid};
    use tempfile::TempDir;

    fn index_with_entry() -> Index {
        let mut index = Index::new();
        index.add(CacheEntry::new(
            "f".to_string(),
            Oid::hash(b"x"),
            FileMode::Regular,
            0,
        ));
        index
    }

    #[test]
    fn test_commit_writes_index() {
        let temp = TempDir::new().unwrap();
        let index_path = temp.path().join("index");

        let lock = IndexLock::acquire(&index_path).unwrap();
        lock.commit(&index_with_entry()).unwrap();

        assert!(index_path.exists());
        assert!(!temp.path().join("index.lock").exists());

        let loaded = Index::load(&index_path).unwrap();
        assert_eq!(loaded.len(), 1);
    }

    #[test]
    fn test_drop_rolls_back() {
        let temp = TempDir::new().unwrap();
        let index_path = temp.path().join("index");
        Index::new().save(&index_path).unwrap();
        let before = fs::read(&index_path).unwrap();

        {
            let _lock = IndexLock::acquire(&index_path).unwrap();
            assert!(temp.path().join("index.lock").exists());
        }

        assert!(!temp.path().join("index.lock").exists());
        assert_eq!(fs::read(&index_path).unwrap(), before);
    }

    #[test]
    fn test_contention_is_fatal() {
        let temp = TempDir::new().unwrap();
        let index_path = temp.path().join("index");

        let _held = IndexLock::acquire(&index_path).unwrap();
        assert!(IndexLock::acquire(&index_path).is_err());
    }

    #[test]
    fn test_reacquire_after_commit() {
        let temp = TempDir::new().unwrap();
        let index_path = temp.path().join("index");

        let lock = IndexLock::acquire(&index_path).unwrap();
        lock.commit(&Index::new()).unwrap();

        let lock2 = IndexLock::acquire(&index_path).unwrap();
        lock2.rollback();
    }
}
