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

//! Commit objects: history nodes pointing at tree snapshots

use crate::{ObjectType, Oid};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Author or committer information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Name of the author or committer
    pub name: String,

    /// Email address
    pub email: String,

    /// Timestamp of the signature
    pub timestamp: DateTime<Utc>,
}

impl Signature {
    /// Create a new signature
    pub fn new(name: String, email: String, timestamp: DateTime<Utc>) -> Self {
        Self {
            name,
            email,
            timestamp,
        }
    }

    /// Create a signature with current timestamp
    pub fn now(name: String, email: String) -> Self {
        Self {
            name,
            email,
            timestamp: Utc::now(),
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} <{}> {}",
            self.name,
            self.email,
            self.timestamp.timestamp()
        )
    }
}

/// Commit object: a tree snapshot with parents and metadata
///
/// # Examples
///
/// ```
/// use treemerge_versioning::{Commit, Signature, Oid};
///
/// let sig = Signature::now("Alice".to_string(), "alice@example.com".to_string());
/// let commit = Commit::new(Oid::hash(b"tree"), sig.clone(), sig, "Initial".to_string());
/// assert!(commit.is_initial());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// OID of the tree this commit points to
    pub tree: Oid,

    /// OIDs of parent commits
    pub parents: Vec<Oid>,

    /// Author information
    pub author: Signature,

    /// Committer information
    pub committer: Signature,

    /// Commit message
    pub message: String,
}

impl Commit {
    /// Create a new parentless commit
    pub fn new(tree: Oid, author: Signature, committer: Signature, message: String) -> Self {
        Self {
            tree,
            parents: Vec::new(),
            author,
            committer,
            message,
        }
    }

    /// Create a commit with parents
    pub fn with_parents(
        tree: Oid,
        parents: Vec<Oid>,
        author: Signature,
        committer: Signature,
        message: String,
    ) -> Self {
        Self {
            tree,
            parents,
            author,
            committer,
            message,
        }
    }

    /// Add a parent commit
    pub fn add_parent(&mut self, parent_oid: Oid) {
        self.parents.push(parent_oid);
    }

    /// Check if this is an initial commit (no parents)
    pub fn is_initial(&self) -> bool {
        self.parents.is_empty()
    }

    /// Check if this is a merge commit (multiple parents)
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    /// Serialize commit to bytes
    pub fn serialize(&self) -> anyhow::Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| anyhow::anyhow!("Commit serialization failed: {}", e))
    }

    /// Deserialize commit from bytes
    pub fn deserialize(data: &[u8]) -> anyhow::Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| anyhow::anyhow!("Commit deserialization failed: {}", e))
    }

    /// Write commit to object database and return its OID
    pub fn write(&self, odb: &crate::ObjectDatabase) -> anyhow::Result<Oid> {
        let data = self.serialize()?;
        odb.write(ObjectType::Commit, &data)
    }

    /// Read commit from object database by OID
    pub fn read(odb: &crate::ObjectDatabase, oid: &Oid) -> anyhow::Result<Self> {
        let data = odb.read(oid)?;
        Self::deserialize(&data)
    }

    /// Get a summary of the commit (first line of message)
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }
}

impl fmt::Display for Commit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}
