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

//! N-way tree unpacking into the index and working tree
//!
//! Applies one, two, or many trees to the index under merge semantics.
//! Trivially resolvable paths become stage-0 entries; the rest are
//! recorded as stages 1/2/3 for the per-path resolver. Working-tree
//! updates happen only for resolved paths; conflicted paths are left
//! untouched on disk.
//!
//! With more than three trees, every tree ahead of the head slot is a
//! merge base, and a side that matches *any* base counts as unchanged
//! (multi-base unification).

use crate::{worktree, CacheEntry, FileMode, Index, Repository, Tree, TreeEntry};
use anyhow::{bail, Result};
use std::collections::BTreeSet;
use tracing::{debug, trace};

/// Which n-way rule set to apply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeFn {
    /// Reset to a single tree
    OneWay,
    /// Switch from one tree to another
    TwoWay,
    /// Merge bases + head + remote
    ThreeWay,
}

/// Options controlling an unpack pass
#[derive(Debug, Clone, Copy)]
pub struct UnpackOptions {
    /// Rule set to apply
    pub strategy: MergeFn,
    /// Index of the head tree in the tree list (three-way only); trees
    /// before it are merge bases, the tree after it is the remote
    pub head_idx: usize,
    /// Record unresolved paths as stages instead of failing
    pub merge: bool,
    /// Propagate resolved results to the working tree
    pub update: bool,
    /// Auto-resolve trivial deletions (both deleted, delete vs unchanged)
    pub aggressive: bool,
    /// The index is unborn; take the new tree wholesale (two-way only)
    pub initial_checkout: bool,
}

impl UnpackOptions {
    /// Standard merge options for a driver-supplied tree list
    pub fn merge_for(tree_count: usize, index_unborn: bool, aggressive: bool) -> Result<Self> {
        let strategy = match tree_count {
            0 => bail!("no trees to unpack"),
            1 => MergeFn::OneWay,
            2 => MergeFn::TwoWay,
            _ => MergeFn::ThreeWay,
        };
        Ok(UnpackOptions {
            strategy,
            head_idx: tree_count.saturating_sub(2),
            merge: true,
            update: true,
            aggressive,
            initial_checkout: strategy == MergeFn::TwoWay && index_unborn,
        })
    }
}

/// Per-path outcome of the n-way rules
enum Resolution {
    /// Leave the index entry and working tree alone
    Keep,
    /// Resolved: stage-0 entry (or removal for `None`)
    Take(Option<TreeEntry>),
    /// Unresolved: record stages 1/2/3
    Stages {
        base: Option<TreeEntry>,
        ours: Option<TreeEntry>,
        theirs: Option<TreeEntry>,
    },
}

/// Unpack `trees` into the index, updating the working tree for resolved
/// paths
///
/// Failure means the merge cannot be attempted (exit 2 territory); the
/// caller owns the index lock and decides whether to roll back.
pub fn unpack_trees(
    repo: &Repository,
    index: &mut Index,
    trees: &[Tree],
    opts: &UnpackOptions,
) -> Result<()> {
    debug!(trees = trees.len(), strategy = ?opts.strategy, "unpacking trees");

    let mut paths: BTreeSet<String> = BTreeSet::new();
    for tree in trees {
        paths.extend(tree.entries.keys().cloned());
    }
    for entry in index.entries() {
        paths.insert(entry.path.clone());
    }

    for path in paths {
        let resolution = match opts.strategy {
            MergeFn::OneWay => Resolution::Take(trees[0].get_entry(&path).cloned()),
            MergeFn::TwoWay => resolve_twoway(index, trees, opts, &path)?,
            MergeFn::ThreeWay => resolve_threeway(trees, opts, &path),
        };
        apply_resolution(repo, index, opts, &path, resolution)?;
    }

    Ok(())
}

fn entry_same(a: Option<&TreeEntry>, b: Option<&TreeEntry>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(x), Some(y)) => x.same_as(y),
        _ => false,
    }
}

fn cache_matches(cur: Option<&CacheEntry>, te: Option<&TreeEntry>) -> bool {
    match (cur, te) {
        (None, None) => true,
        (Some(c), Some(t)) => c.oid == t.oid && c.mode == t.mode,
        _ => false,
    }
}

fn resolve_twoway(
    index: &Index,
    trees: &[Tree],
    opts: &UnpackOptions,
    path: &str,
) -> Result<Resolution> {
    let old = trees[0].get_entry(path);
    let new = trees[1].get_entry(path);

    if opts.initial_checkout {
        return Ok(Resolution::Take(new.cloned()));
    }
    if index.is_unmerged(path) {
        bail!("Entry '{}' is unmerged. Cannot merge.", path);
    }

    let cur = index.get(path, 0);
    if entry_same(old, new) {
        // Unchanged between the trees; whatever the index holds stands.
        Ok(Resolution::Keep)
    } else if cache_matches(cur, old) {
        Ok(Resolution::Take(new.cloned()))
    } else if cache_matches(cur, new) {
        Ok(Resolution::Keep)
    } else {
        bail!("Entry '{}' would be overwritten by merge. Cannot merge.", path);
    }
}

fn resolve_threeway(trees: &[Tree], opts: &UnpackOptions, path: &str) -> Resolution {
    let bases = &trees[..opts.head_idx];
    let ours = trees[opts.head_idx].get_entry(path);
    let theirs = trees[trees.len() - 1].get_entry(path);

    if entry_same(ours, theirs) {
        if ours.is_some() {
            return Resolution::Take(ours.cloned());
        }
        // Gone on both sides. Dropping the stale stage-1 entry is the
        // aggressive rule; otherwise it stays for the resolver.
        if opts.aggressive || bases.iter().all(|b| b.get_entry(path).is_none()) {
            return Resolution::Take(None);
        }
        return Resolution::Stages {
            base: nearest_base(bases, path),
            ours: None,
            theirs: None,
        };
    }

    let ours_unchanged = bases.iter().any(|b| entry_same(b.get_entry(path), ours));
    let theirs_unchanged = bases.iter().any(|b| entry_same(b.get_entry(path), theirs));

    if ours_unchanged && (theirs.is_some() || opts.aggressive) {
        trace!(path, "three-way: take theirs");
        return Resolution::Take(theirs.cloned());
    }
    if theirs_unchanged && (ours.is_some() || opts.aggressive) {
        trace!(path, "three-way: take ours");
        return Resolution::Take(ours.cloned());
    }

    Resolution::Stages {
        base: nearest_base(bases, path),
        ours: ours.cloned(),
        theirs: theirs.cloned(),
    }
}

fn nearest_base(bases: &[Tree], path: &str) -> Option<TreeEntry> {
    bases.iter().rev().find_map(|b| b.get_entry(path).cloned())
}

fn apply_resolution(
    repo: &Repository,
    index: &mut Index,
    opts: &UnpackOptions,
    path: &str,
    resolution: Resolution,
) -> Result<()> {
    match resolution {
        Resolution::Keep => Ok(()),
        Resolution::Take(Some(te)) => {
            let changed = index.is_unmerged(path)
                || !cache_matches(index.get(path, 0), Some(&te));
            if !changed {
                // Entry already matches; keep its stat cache intact.
                return Ok(());
            }

            index.remove_path(path);
            let mut entry = CacheEntry::new(path.to_string(), te.oid, te.mode, 0);
            if opts.update && te.mode != FileMode::Gitlink {
                let data = repo.odb.read(&te.oid)?;
                worktree::checkout_blob(repo.workdir(), path, te.mode, &data)?;
                entry = entry.with_size(data.len() as u64);
            }
            index.add(entry);
            Ok(())
        }
        Resolution::Take(None) => {
            let was_tracked = index.contains_path(path);
            index.remove_path(path);
            if opts.update && was_tracked {
                worktree::remove_path(repo.workdir(), path)?;
            }
            Ok(())
        }
        Resolution::Stages { base, ours, theirs } => {
            if !opts.merge {
                bail!("Entry '{}' would require a merge. Cannot checkout.", path);
            }
            trace!(path, "three-way: unresolved, recording stages");
            index.remove_path(path);
            for (stage, entry) in [(1u8, base), (2, ours), (3, theirs)] {
                if let Some(te) = entry {
                    index.add(CacheEntry::new(path.to_string(), te.oid, te.mode, stage));
                }
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ObjectType, Oid};
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        repo: Repository,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let repo = Repository::init(temp.path()).unwrap();
        Fixture { _temp: temp, repo }
    }

    fn tree_of(repo: &Repository, entries: &[(&str, &[u8])]) -> Tree {
        let mut tree = Tree::new();
        for (path, content) in entries {
            let oid = repo.odb.write(ObjectType::Blob, content).unwrap();
            tree.add_entry(TreeEntry::new(path.to_string(), FileMode::Regular, oid));
        }
        tree
    }

    fn index_of(tree: &Tree) -> Index {
        let mut index = Index::new();
        index.read_tree(tree);
        index
    }

    #[test]
    fn test_oneway_resets_index_and_worktree() {
        let f = fixture();
        let target = tree_of(&f.repo, &[("a.txt", b"a"), ("b.txt", b"b")]);
        let mut index = Index::new();

        let opts = UnpackOptions::merge_for(1, false, true).unwrap();
        unpack_trees(&f.repo, &mut index, &[target.clone()], &opts).unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(
            fs::read(f.repo.workdir().join("a.txt")).unwrap(),
            b"a".to_vec()
        );
    }

    #[test]
    fn test_twoway_advances_matching_entries() {
        let f = fixture();
        let old = tree_of(&f.repo, &[("f.txt", b"old")]);
        let new = tree_of(&f.repo, &[("f.txt", b"new")]);
        let mut index = index_of(&old);

        let opts = UnpackOptions::merge_for(2, false, false).unwrap();
        unpack_trees(&f.repo, &mut index, &[old, new], &opts).unwrap();

        assert_eq!(index.get("f.txt", 0).unwrap().oid, Oid::hash(b"new"));
        assert_eq!(
            fs::read(f.repo.workdir().join("f.txt")).unwrap(),
            b"new".to_vec()
        );
    }

    #[test]
    fn test_twoway_rejects_local_divergence() {
        let f = fixture();
        let old = tree_of(&f.repo, &[("f.txt", b"old")]);
        let new = tree_of(&f.repo, &[("f.txt", b"new")]);
        let local = tree_of(&f.repo, &[("f.txt", b"local")]);
        let mut index = index_of(&local);

        let opts = UnpackOptions::merge_for(2, false, false).unwrap();
        assert!(unpack_trees(&f.repo, &mut index, &[old, new], &opts).is_err());
    }

    #[test]
    fn test_twoway_removes_deleted_entries() {
        let f = fixture();
        let old = tree_of(&f.repo, &[("f.txt", b"old"), ("keep.txt", b"k")]);
        let new = tree_of(&f.repo, &[("keep.txt", b"k")]);
        let mut index = index_of(&old);
        worktree::checkout_blob(f.repo.workdir(), "f.txt", FileMode::Regular, b"old").unwrap();

        let opts = UnpackOptions::merge_for(2, false, false).unwrap();
        unpack_trees(&f.repo, &mut index, &[old, new], &opts).unwrap();

        assert!(!index.contains_path("f.txt"));
        assert!(!f.repo.workdir().join("f.txt").exists());
        assert!(index.contains_path("keep.txt"));
    }

    #[test]
    fn test_threeway_one_sided_change_resolves() {
        let f = fixture();
        let base = tree_of(&f.repo, &[("f.txt", b"base")]);
        let ours = tree_of(&f.repo, &[("f.txt", b"base")]);
        let theirs = tree_of(&f.repo, &[("f.txt", b"theirs")]);
        let mut index = index_of(&ours);

        let opts = UnpackOptions::merge_for(3, false, true).unwrap();
        unpack_trees(&f.repo, &mut index, &[base, ours, theirs], &opts).unwrap();

        assert_eq!(index.get("f.txt", 0).unwrap().oid, Oid::hash(b"theirs"));
        assert!(!index.has_unmerged());
    }

    #[test]
    fn test_threeway_both_changed_records_stages() {
        let f = fixture();
        let base = tree_of(&f.repo, &[("f.txt", b"base")]);
        let ours = tree_of(&f.repo, &[("f.txt", b"ours")]);
        let theirs = tree_of(&f.repo, &[("f.txt", b"theirs")]);
        let mut index = index_of(&ours);
        worktree::checkout_blob(f.repo.workdir(), "f.txt", FileMode::Regular, b"ours").unwrap();

        let opts = UnpackOptions::merge_for(3, false, true).unwrap();
        unpack_trees(&f.repo, &mut index, &[base, ours, theirs], &opts).unwrap();

        let stages = index.stages("f.txt");
        assert_eq!(stages[0].unwrap().oid, Oid::hash(b"base"));
        assert_eq!(stages[1].unwrap().oid, Oid::hash(b"ours"));
        assert_eq!(stages[2].unwrap().oid, Oid::hash(b"theirs"));
        assert!(index.get("f.txt", 0).is_none());

        // Conflicted paths keep their working-tree content.
        assert_eq!(
            fs::read(f.repo.workdir().join("f.txt")).unwrap(),
            b"ours".to_vec()
        );
    }

    #[test]
    fn test_threeway_aggressive_removes_deleted_in_both() {
        let f = fixture();
        let base = tree_of(&f.repo, &[("gone.txt", b"base"), ("keep.txt", b"k")]);
        let ours = tree_of(&f.repo, &[("keep.txt", b"k")]);
        let theirs = tree_of(&f.repo, &[("keep.txt", b"k")]);
        let mut index = index_of(&ours);

        let opts = UnpackOptions::merge_for(3, false, true).unwrap();
        unpack_trees(&f.repo, &mut index, &[base, ours, theirs], &opts).unwrap();

        assert!(!index.contains_path("gone.txt"));
        assert!(!index.has_unmerged());
    }

    #[test]
    fn test_threeway_aggressive_delete_vs_unchanged() {
        let f = fixture();
        let base = tree_of(&f.repo, &[("f.txt", b"same")]);
        let ours = tree_of(&f.repo, &[("f.txt", b"same")]);
        let theirs = tree_of(&f.repo, &[]);
        let mut index = index_of(&ours);
        worktree::checkout_blob(f.repo.workdir(), "f.txt", FileMode::Regular, b"same").unwrap();

        let opts = UnpackOptions::merge_for(3, false, true).unwrap();
        unpack_trees(&f.repo, &mut index, &[base, ours, theirs], &opts).unwrap();

        assert!(!index.contains_path("f.txt"));
        assert!(!f.repo.workdir().join("f.txt").exists());
    }

    #[test]
    fn test_threeway_add_in_one_resolves() {
        let f = fixture();
        let base = tree_of(&f.repo, &[("common.txt", b"c")]);
        let ours = tree_of(&f.repo, &[("common.txt", b"c")]);
        let theirs = tree_of(&f.repo, &[("common.txt", b"c"), ("new.txt", b"new")]);
        let mut index = index_of(&ours);

        let opts = UnpackOptions::merge_for(3, false, true).unwrap();
        unpack_trees(&f.repo, &mut index, &[base, ours, theirs], &opts).unwrap();

        assert_eq!(index.get("new.txt", 0).unwrap().oid, Oid::hash(b"new"));
        assert_eq!(
            fs::read(f.repo.workdir().join("new.txt")).unwrap(),
            b"new".to_vec()
        );
    }

    #[test]
    fn test_threeway_multi_base_unification() {
        let f = fixture();
        // Two bases; ours matches the second base, so theirs' change wins.
        let base1 = tree_of(&f.repo, &[("f.txt", b"ancient")]);
        let base2 = tree_of(&f.repo, &[("f.txt", b"ours")]);
        let ours = tree_of(&f.repo, &[("f.txt", b"ours")]);
        let theirs = tree_of(&f.repo, &[("f.txt", b"theirs")]);
        let mut index = index_of(&ours);

        let opts = UnpackOptions::merge_for(4, false, true).unwrap();
        assert_eq!(opts.head_idx, 2);
        unpack_trees(&f.repo, &mut index, &[base1, base2, ours, theirs], &opts).unwrap();

        assert_eq!(index.get("f.txt", 0).unwrap().oid, Oid::hash(b"theirs"));
    }
}
