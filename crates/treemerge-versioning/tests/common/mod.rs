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

//! Common fixtures for driver integration tests.

use std::fs;
use tempfile::TempDir;
use treemerge_versioning::{
    CacheEntry, Commit, FileMode, Index, ObjectType, Oid, Repository, Signature, Tree, TreeEntry,
};

/// A repository in a temp directory with helpers for building history
/// and simulating a checked-out head.
pub struct TestRepo {
    _temp: TempDir,
    pub repo: Repository,
}

impl TestRepo {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("tempdir");
        let repo = Repository::init(temp.path()).expect("init repository");
        TestRepo { _temp: temp, repo }
    }

    pub fn blob(&self, content: &[u8]) -> Oid {
        self.repo
            .odb
            .write(ObjectType::Blob, content)
            .expect("write blob")
    }

    /// Store a tree of regular files.
    pub fn tree(&self, entries: &[(&str, &[u8])]) -> Oid {
        let with_modes: Vec<(&str, &[u8], FileMode)> = entries
            .iter()
            .map(|(p, c)| (*p, *c, FileMode::Regular))
            .collect();
        self.tree_with_modes(&with_modes)
    }

    pub fn tree_with_modes(&self, entries: &[(&str, &[u8], FileMode)]) -> Oid {
        let mut tree = Tree::new();
        for (path, content, mode) in entries {
            let oid = self.blob(content);
            tree.add_entry(TreeEntry::new(path.to_string(), *mode, oid));
        }
        tree.write(&self.repo.odb).expect("write tree")
    }

    pub fn commit(&self, tree: Oid, parents: &[Oid]) -> Oid {
        let sig = Signature::now("Test Author".to_string(), "test@example.com".to_string());
        Commit::with_parents(
            tree,
            parents.to_vec(),
            sig.clone(),
            sig,
            "test commit".to_string(),
        )
        .write(&self.repo.odb)
        .expect("write commit")
    }

    /// Populate the index and working tree from a tree, as if the commit
    /// holding it were checked out.
    pub fn checkout(&self, tree_oid: &Oid) {
        let tree = Tree::read(&self.repo.odb, tree_oid).expect("read tree");
        let mut index = Index::new();
        for entry in tree.iter() {
            let data = self.repo.odb.read(&entry.oid).expect("read blob");
            treemerge_versioning::worktree::checkout_blob(
                self.repo.workdir(),
                &entry.name,
                entry.mode,
                &data,
            )
            .expect("checkout file");
            index.add(
                CacheEntry::new(entry.name.clone(), entry.oid, entry.mode, 0)
                    .with_size(data.len() as u64),
            );
        }
        index.save(&self.repo.index_path()).expect("save index");
    }

    pub fn load_index(&self) -> Index {
        self.repo.load_index().expect("load index")
    }

    pub fn read_file(&self, path: &str) -> String {
        fs::read_to_string(self.repo.workdir().join(path)).expect("read worktree file")
    }

    pub fn file_exists(&self, path: &str) -> bool {
        self.repo.workdir().join(path).exists()
    }

    pub fn index_bytes(&self) -> Vec<u8> {
        fs::read(self.repo.index_path()).expect("read index file")
    }
}
