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

//! Common test helpers for TreeMerge CLI tests.

use assert_cmd::Command;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use treemerge_versioning::{
    CacheEntry, Commit, FileMode, Index, ObjectType, Oid, Repository, Signature, Tree, TreeEntry,
};

/// The `treemerge` binary under test.
pub fn treemerge() -> Command {
    Command::cargo_bin("treemerge").expect("binary builds")
}

/// A repository fixture whose history is written through the library and
/// exercised through the binary.
pub struct CliRepo {
    pub temp: TempDir,
    pub repo: Repository,
}

impl CliRepo {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("tempdir");
        let repo = Repository::init(temp.path()).expect("init repository");
        CliRepo { temp, repo }
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub fn tree(&self, entries: &[(&str, &[u8])]) -> Oid {
        let mut tree = Tree::new();
        for (path, content) in entries {
            let oid = self
                .repo
                .odb
                .write(ObjectType::Blob, content)
                .expect("write blob");
            tree.add_entry(TreeEntry::new(path.to_string(), FileMode::Regular, oid));
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

    /// Simulate the head being checked out: index and worktree match the
    /// tree.
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

    pub fn read_file(&self, path: &str) -> String {
        fs::read_to_string(self.path().join(path)).expect("read worktree file")
    }

    pub fn empty_tree_hex(&self) -> String {
        Tree::empty_id().to_hex()
    }
}
