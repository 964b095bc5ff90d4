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

//! Tree objects representing directory snapshots
//!
//! A tree maps repository-relative paths to blob references. The map is
//! flat: entry names are full paths, which is the shape the merge engine
//! works in (paths are compared across trees, never walked recursively).

use crate::{ObjectType, Oid};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

/// File mode in a tree entry (Unix-like permission bits)
///
/// Modes compare structurally; `Regular` and `Executable` differ only in
/// the effective permission bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FileMode {
    /// Regular file (100644)
    Regular,
    /// Executable file (100755)
    Executable,
    /// Symbolic link (120000)
    Symlink,
    /// Submodule reference (160000)
    Gitlink,
}

impl FileMode {
    /// Get the file mode from an integer value
    pub fn from_u32(mode: u32) -> anyhow::Result<Self> {
        match mode {
            0o100644 => Ok(FileMode::Regular),
            0o100755 => Ok(FileMode::Executable),
            0o120000 => Ok(FileMode::Symlink),
            0o160000 => Ok(FileMode::Gitlink),
            _ => anyhow::bail!("Unknown file mode: {:o}", mode),
        }
    }

    /// Convert to u32 representation
    pub fn as_u32(&self) -> u32 {
        match self {
            FileMode::Regular => 0o100644,
            FileMode::Executable => 0o100755,
            FileMode::Symlink => 0o120000,
            FileMode::Gitlink => 0o160000,
        }
    }

    /// Check if this mode names a symbolic link
    pub fn is_symlink(&self) -> bool {
        *self == FileMode::Symlink
    }

    /// Check if this mode names a submodule reference
    pub fn is_gitlink(&self) -> bool {
        *self == FileMode::Gitlink
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:o}", self.as_u32())
    }
}

/// Entry in a tree: one path with its blob reference and mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    /// Repository-relative path
    pub name: String,

    /// File mode (permissions and type)
    pub mode: FileMode,

    /// Object ID of the blob (or submodule commit for gitlinks)
    pub oid: Oid,
}

impl TreeEntry {
    /// Create a new tree entry
    pub fn new(name: String, mode: FileMode, oid: Oid) -> Self {
        Self { name, mode, oid }
    }

    /// True when both id and mode match the other entry
    pub fn same_as(&self, other: &TreeEntry) -> bool {
        self.oid == other.oid && self.mode == other.mode
    }
}

/// Tree object representing a snapshot of the repository
///
/// Entries are sorted by path, giving the snapshot a canonical
/// serialization and therefore a stable content address.
///
/// # Examples
///
/// ```
/// use treemerge_versioning::{Tree, TreeEntry, FileMode, Oid};
///
/// let mut tree = Tree::new();
/// tree.add_entry(TreeEntry::new(
///     "src/main.rs".to_string(),
///     FileMode::Regular,
///     Oid::hash(b"fn main() {}"),
/// ));
/// assert_eq!(tree.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    /// Tree entries, keyed and sorted by path
    pub entries: BTreeMap<String, TreeEntry>,
}

impl Tree {
    /// Create a new empty tree
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// The content address of the empty tree
    ///
    /// Used as the CLI sentinel: arguments naming this id are skipped
    /// rather than resolved to a commit.
    pub fn empty_id() -> Oid {
        static EMPTY: OnceLock<Oid> = OnceLock::new();
        *EMPTY.get_or_init(|| {
            let data = Tree::new()
                .serialize()
                .expect("empty tree always serializes");
            Oid::hash(&data)
        })
    }

    /// Add an entry to the tree, replacing any entry at the same path
    pub fn add_entry(&mut self, entry: TreeEntry) {
        self.entries.insert(entry.name.clone(), entry);
    }

    /// Remove an entry from the tree
    pub fn remove_entry(&mut self, name: &str) -> Option<TreeEntry> {
        self.entries.remove(name)
    }

    /// Get an entry by path
    pub fn get_entry(&self, name: &str) -> Option<&TreeEntry> {
        self.entries.get(name)
    }

    /// Check if tree contains an entry at the given path
    pub fn has_entry(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Get all entries in path order
    pub fn iter(&self) -> impl Iterator<Item = &TreeEntry> {
        self.entries.values()
    }

    /// Get number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if tree is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize tree to bytes
    pub fn serialize(&self) -> anyhow::Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| anyhow::anyhow!("Tree serialization failed: {}", e))
    }

    /// Deserialize tree from bytes
    pub fn deserialize(data: &[u8]) -> anyhow::Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| anyhow::anyhow!("Tree deserialization failed: {}", e))
    }

    /// Write tree to object database and return its OID
    pub fn write(&self, odb: &crate::ObjectDatabase) -> anyhow::Result<Oid> {
        let data = self.serialize()?;
        odb.write(ObjectType::Tree, &data)
    }

    /// Read tree from object database by OID
    pub fn read(odb: &crate::ObjectDatabase, oid: &Oid) -> anyhow::Result<Self> {
        let data = odb.read(oid)?;
        Self::deserialize(&data)
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}
