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

//! Merge base detection over the commit graph
//!
//! Commits are reached only through their ids; the object database owns
//! the parsed data. BFS keeps the traversal linear in the number of
//! reachable commits.

use crate::{Commit, ObjectDatabase, Oid};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tracing::debug;

/// Merge base finder for the octopus and resolve drivers
pub struct MergeBaseFinder {
    odb: Arc<ObjectDatabase>,
}

impl MergeBaseFinder {
    /// Create a new finder over the given object database
    pub fn new(odb: Arc<ObjectDatabase>) -> Self {
        Self { odb }
    }

    /// Check if one commit is an ancestor of another (inclusive)
    pub fn is_ancestor(&self, ancestor: &Oid, descendant: &Oid) -> anyhow::Result<bool> {
        if ancestor == descendant {
            return Ok(true);
        }

        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(*descendant);

        while let Some(current) = queue.pop_front() {
            if current == *ancestor {
                return Ok(true);
            }

            if !visited.insert(current) {
                continue;
            }

            if let Ok(commit) = Commit::read(&self.odb, &current) {
                for parent in &commit.parents {
                    if !visited.contains(parent) {
                        queue.push_back(*parent);
                    }
                }
            }
        }

        Ok(false)
    }

    /// All commits reachable from `start`, including `start` itself
    fn ancestors(&self, start: &Oid) -> anyhow::Result<HashSet<Oid>> {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(*start);

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }
            if let Ok(commit) = Commit::read(&self.odb, &current) {
                for parent in &commit.parents {
                    if !visited.contains(parent) {
                        queue.push_back(*parent);
                    }
                }
            }
        }

        Ok(visited)
    }

    /// Merge bases of `commit` against every commit in `references`
    ///
    /// Returns the lowest common ancestors ordered newest-first by
    /// committer timestamp (ties broken by id), or an empty list when the
    /// histories share nothing. Multiple results indicate a criss-cross.
    pub fn merge_bases_many(
        &self,
        commit: &Oid,
        references: &[Oid],
    ) -> anyhow::Result<Vec<Oid>> {
        debug!(commit = %commit, refs = references.len(), "finding merge bases");

        let mut common = self.ancestors(commit)?;
        for reference in references {
            let reachable = self.ancestors(reference)?;
            common.retain(|oid| reachable.contains(oid));
            if common.is_empty() {
                return Ok(Vec::new());
            }
        }

        // Keep only the lowest common ancestors: drop any candidate that
        // is a strict ancestor of another candidate.
        let candidates: Vec<Oid> = common.iter().copied().collect();
        let mut bases = Vec::new();
        'outer: for c in &candidates {
            for d in &candidates {
                if c != d && self.is_ancestor(c, d)? {
                    continue 'outer;
                }
            }
            bases.push(*c);
        }

        bases.sort_by_key(|oid| {
            let ts = Commit::read(&self.odb, oid)
                .map(|c| c.committer.timestamp)
                .unwrap_or_default();
            (std::cmp::Reverse(ts), oid.to_hex())
        });

        debug!(count = bases.len(), "found merge base(s)");
        Ok(bases)
    }
}
