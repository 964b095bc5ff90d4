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

//! The resolve strategy: two-head merge using enhanced multi-base
//! unpacking
//!
//! A single unpack pass resolves everything trivial; if the resulting
//! index cannot be written as a tree, the per-path resolver runs over the
//! remaining stages under a fresh lock. Exit codes: 0 clean, 1 conflicts
//! recorded in the index, 2 the merge could not be attempted.

use crate::unpack::{unpack_trees, UnpackOptions};
use crate::walker::{merge_all, OneFileMerger};
use crate::{MergeContext, Oid, Reporter, Repository, Tree};
use anyhow::Result;
use tracing::{debug, instrument};

/// Run the resolve strategy
///
/// `bases` may be empty (the caller rejects baseless merges); `head` and
/// `remote` are optional to mirror the argument shape of the CLI, which
/// validates their presence.
#[instrument(level = "debug", skip_all, fields(bases = bases.len()))]
pub fn resolve(
    repo: &Repository,
    reporter: &Reporter,
    bases: &[Oid],
    head: Option<&Oid>,
    remote: Option<&Oid>,
) -> Result<i32> {
    let mut index = repo.load_index()?;
    let index_unborn = repo.index_unborn();
    let lock = repo.lock_index()?;
    let _ = index.refresh(repo.workdir(), false);

    let mut trees: Vec<Tree> = Vec::new();
    for oid in bases.iter().chain(head).chain(remote) {
        match repo.odb.parse_tree_indirect(oid) {
            Ok(tree) => trees.push(tree),
            Err(e) => {
                debug!(oid = %oid, error = %e, "cannot parse tree");
                lock.rollback();
                return Ok(2);
            }
        }
    }
    if trees.is_empty() {
        lock.rollback();
        return Ok(2);
    }

    let opts = match UnpackOptions::merge_for(trees.len(), index_unborn, true) {
        Ok(opts) => opts,
        Err(_) => {
            lock.rollback();
            return Ok(2);
        }
    };

    if let Err(e) = unpack_trees(repo, &mut index, &trees, &opts) {
        reporter.error(e);
        lock.rollback();
        return Ok(2);
    }

    reporter.progress("Trying simple merge.");
    lock.commit(&index)?;

    if index.write_as_tree(&repo.odb, true).is_ok() {
        return Ok(0);
    }

    reporter.progress("Simple merge failed, trying Automatic merge.");
    let lock = repo.lock_index()?;
    let outcome = {
        let mut ctx = MergeContext {
            repo,
            index: &mut index,
            reporter,
        };
        merge_all(&mut ctx, false, false, &mut OneFileMerger)?
    };
    lock.commit(&index)?;

    Ok(if outcome.is_clean() { 0 } else { 1 })
}
