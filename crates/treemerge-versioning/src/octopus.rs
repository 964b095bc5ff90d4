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

//! The octopus strategy: merge two or more remotes into one head
//!
//! Walks the remote list, fast-forwarding while possible and falling back
//! to simple tree merges. Only the last remote may leave hand-resolvable
//! conflicts; an earlier conflicted round aborts the whole merge with
//! exit code 2.

use crate::lca::MergeBaseFinder;
use crate::unpack::{unpack_trees, UnpackOptions};
use crate::walker::{merge_all, OneFileMerger};
use crate::{Commit, Index, MergeContext, Oid, Reporter, Repository, Tree};
use anyhow::{bail, Result};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Prefer a human-readable name for a remote over its raw id
///
/// Merge front-ends export `TREEMERGE_HEAD_<hex>` with the branch name
/// that produced each head.
fn better_branch_name(oid: &Oid) -> String {
    std::env::var(format!("TREEMERGE_HEAD_{}", oid.to_hex())).unwrap_or_else(|_| oid.to_hex())
}

/// Reload, refresh, and unpack the given ids into a fresh index
///
/// Used for both the fast-forward and the simple-merge branch; the ids
/// may name commits or trees. The lock is committed on success and rolled
/// back on any failure.
fn fast_forward(repo: &Repository, oids: &[Oid], aggressive: bool) -> Result<Index> {
    let mut index = repo.load_index()?;
    let index_unborn = repo.index_unborn();
    index.refresh(repo.workdir(), true)?;
    let lock = repo.lock_index()?;

    let mut trees: Vec<Tree> = Vec::with_capacity(oids.len());
    for oid in oids {
        trees.push(repo.odb.parse_tree_indirect(oid)?);
    }

    let opts = UnpackOptions::merge_for(trees.len(), index_unborn, aggressive)?;
    unpack_trees(repo, &mut index, &trees, &opts)?;
    lock.commit(&index)?;
    Ok(index)
}

fn write_tree(repo: &Repository, index: &Index) -> Result<Oid> {
    index.write_as_tree(&repo.odb, false)
}

/// Run the octopus strategy
///
/// `bases` arrive from the command line but the driver recomputes merge
/// bases per remote against the growing reference set; they only feed
/// diagnostics. The caller guarantees at least two remotes.
#[instrument(level = "debug", skip_all, fields(remotes = remotes.len()))]
pub fn octopus(
    repo: &Repository,
    reporter: &Reporter,
    bases: &[Oid],
    head: &Oid,
    remotes: &[Oid],
) -> Result<i32> {
    debug!(bases = bases.len(), head = %head, "starting octopus merge");

    let head_commit = Commit::read(&repo.odb, head)?;
    let mut reference_tree_oid = head_commit.tree;

    let index = repo.load_index()?;
    let reference_tree = Tree::read(&repo.odb, &reference_tree_oid)?;
    let changed = index.has_changes_against(&reference_tree);
    if !changed.is_empty() {
        reporter.error(format_args!(
            "Your local changes to the following files would be overwritten by merge:\n  {}",
            changed.join("\n  ")
        ));
        return Ok(2);
    }
    drop(index);

    let finder = MergeBaseFinder::new(Arc::clone(&repo.odb));
    let mut reference_commits: Vec<Oid> = vec![*head];
    let mut non_ff_merge = false;
    let mut ret = 0;

    for c in remotes {
        if ret != 0 {
            // Only the last remote may carry hand-resolvable conflicts;
            // the previous round failed and a head is still pending.
            reporter.progress("Automated merge did not work.");
            reporter.progress("Should not be doing an octopus.");
            return Ok(2);
        }

        let branch_name = better_branch_name(c);
        let common = finder.merge_bases_many(c, &reference_commits)?;

        if common.is_empty() {
            bail!("Unable to find common commit with {}", branch_name);
        }

        if common.contains(c) {
            reporter.progress(format_args!("Already up to date with {}", branch_name));
            continue;
        }

        let can_ff = !non_ff_merge
            && common.len() >= reference_commits.len()
            && reference_commits
                .iter()
                .enumerate()
                .all(|(i, rc)| common.get(i) == Some(rc));

        if can_ff {
            // The head being merged supersedes the current reference;
            // adopt its tree as the intermediate result.
            reporter.progress(format_args!("Fast-forwarding to: {}", branch_name));

            let index = match fast_forward(repo, &[*head, *c], false) {
                Ok(index) => index,
                Err(e) => {
                    reporter.error(e);
                    return Ok(2);
                }
            };

            reference_commits.clear();
            reference_tree_oid = write_tree(repo, &index)?;
        } else {
            non_ff_merge = true;
            reporter.progress(format_args!("Trying simple merge with {}", branch_name));

            let mut oids: Vec<Oid> = common.clone();
            oids.push(reference_tree_oid);
            oids.push(*c);

            let mut index = match fast_forward(repo, &oids, true) {
                Ok(index) => index,
                Err(e) => {
                    reporter.error(e);
                    return Ok(2);
                }
            };

            match write_tree(repo, &index) {
                Ok(next) => reference_tree_oid = next,
                Err(_) => {
                    reporter.progress("Simple merge did not work, trying automatic merge.");

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
                    ret = if outcome.is_clean() { 0 } else { 1 };

                    // May still fail; the next iteration catches that
                    // through the last-only-conflict rule.
                    if let Ok(next) = write_tree(repo, &index) {
                        reference_tree_oid = next;
                    }
                }
            }
        }

        reference_commits.push(*c);
    }

    Ok(ret)
}
