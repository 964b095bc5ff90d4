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

//! Octopus strategy integration tests
//!
//! Covers fast-forward adoption, the simple-merge fallback, the
//! last-only-conflict rule, and the local-changes preflight.

mod common;

use common::TestRepo;
use treemerge_versioning::{octopus, Oid, Reporter, Tree};

fn run_octopus(t: &TestRepo, bases: &[Oid], head: &Oid, remotes: &[Oid]) -> i32 {
    let reporter = Reporter::new(false);
    octopus(&t.repo, &reporter, bases, head, remotes).expect("octopus driver")
}

/// Tree id the final index resolves to.
fn final_tree(t: &TestRepo) -> Oid {
    t.load_index()
        .write_as_tree(&t.repo.odb, true)
        .expect("write final tree")
}

#[test]
fn test_fast_forward_adopts_remote_tree() {
    let t = TestRepo::new();

    let head_tree = t.tree(&[("file.txt", b"v1\n")]);
    let head = t.commit(head_tree, &[]);
    let remote_tree = t.tree(&[("file.txt", b"v2\n"), ("new.txt", b"new\n")]);
    let remote = t.commit(remote_tree, &[head]);
    t.checkout(&head_tree);

    let code = run_octopus(&t, &[], &head, &[remote]);
    assert_eq!(code, 0);

    // Fast-forward identity: the result tree is the remote's tree.
    assert_eq!(final_tree(&t), remote_tree);
    assert_eq!(t.read_file("file.txt"), "v2\n");
    assert_eq!(t.read_file("new.txt"), "new\n");
}

#[test]
fn test_already_up_to_date_remote_is_skipped() {
    let t = TestRepo::new();

    let old_tree = t.tree(&[("file.txt", b"old\n")]);
    let old = t.commit(old_tree, &[]);
    let head_tree = t.tree(&[("file.txt", b"new\n")]);
    let head = t.commit(head_tree, &[old]);
    t.checkout(&head_tree);

    let code = run_octopus(&t, &[], &head, &[old]);
    assert_eq!(code, 0);

    // Nothing changed: the ancestor brought nothing new.
    assert_eq!(final_tree(&t), head_tree);
    assert_eq!(t.read_file("file.txt"), "new\n");
}

#[test]
fn test_fast_forward_then_simple_merge() {
    let t = TestRepo::new();

    // H -- A (descendant, touches a.txt)
    //  \
    //   B (diverged, adds b.txt)
    let head_tree = t.tree(&[("base.txt", b"base\n")]);
    let head = t.commit(head_tree, &[]);

    let a_tree = t.tree(&[("base.txt", b"base\n"), ("a.txt", b"from a\n")]);
    let a = t.commit(a_tree, &[head]);

    let b_tree = t.tree(&[("base.txt", b"base\n"), ("b.txt", b"from b\n")]);
    let b = t.commit(b_tree, &[head]);

    t.checkout(&head_tree);

    let code = run_octopus(&t, &[], &head, &[a, b]);
    assert_eq!(code, 0);

    // The union of both heads, which is neither A's nor B's tree.
    let result = final_tree(&t);
    assert_ne!(result, a_tree);
    assert_ne!(result, b_tree);

    let tree = Tree::read(&t.repo.odb, &result).expect("read result tree");
    assert!(tree.has_entry("a.txt"));
    assert!(tree.has_entry("b.txt"));
    assert!(tree.has_entry("base.txt"));
    assert_eq!(t.read_file("a.txt"), "from a\n");
    assert_eq!(t.read_file("b.txt"), "from b\n");
}

#[test]
fn test_conflict_before_last_remote_aborts_with_two() {
    let t = TestRepo::new();

    // R -- H  (head modifies file.txt one way)
    //  \-- X  (first remote modifies it another way: conflict)
    //  \-- Y  (second remote adds y.txt; must never be merged)
    let root_tree = t.tree(&[("file.txt", b"a\nmiddle\nz\n")]);
    let root = t.commit(root_tree, &[]);

    let head_tree = t.tree(&[("file.txt", b"a\nours\nz\n")]);
    let head = t.commit(head_tree, &[root]);

    let x_tree = t.tree(&[("file.txt", b"a\ntheirs\nz\n")]);
    let x = t.commit(x_tree, &[root]);

    let y_tree = t.tree(&[("file.txt", b"a\nmiddle\nz\n"), ("y.txt", b"from y\n")]);
    let y = t.commit(y_tree, &[root]);

    t.checkout(&head_tree);

    let code = run_octopus(&t, &[], &head, &[x, y]);
    assert_eq!(code, 2);

    // The second remote was never processed.
    assert!(!t.file_exists("y.txt"));
    assert!(!t.load_index().contains_path("y.txt"));
}

#[test]
fn test_conflict_on_last_remote_returns_one() {
    let t = TestRepo::new();

    let root_tree = t.tree(&[("file.txt", b"a\nmiddle\nz\n"), ("other.txt", b"o\n")]);
    let root = t.commit(root_tree, &[]);

    let head_tree = t.tree(&[("file.txt", b"a\nours\nz\n"), ("other.txt", b"o\n")]);
    let head = t.commit(head_tree, &[root]);

    // First remote merges cleanly, second conflicts.
    let clean_tree = t.tree(&[
        ("file.txt", b"a\nmiddle\nz\n"),
        ("other.txt", b"o\n"),
        ("clean.txt", b"clean\n"),
    ]);
    let clean = t.commit(clean_tree, &[root]);

    let conflicted_tree = t.tree(&[("file.txt", b"a\ntheirs\nz\n"), ("other.txt", b"o\n")]);
    let conflicted = t.commit(conflicted_tree, &[root]);

    t.checkout(&head_tree);

    let code = run_octopus(&t, &[], &head, &[clean, conflicted]);
    assert_eq!(code, 1);

    // The clean remote's addition landed; the conflicted path kept its
    // stages.
    assert_eq!(t.read_file("clean.txt"), "clean\n");
    let index = t.load_index();
    assert!(index.is_unmerged("file.txt"));
    assert!(t.read_file("file.txt").contains("<<<<<<< our"));
}

#[test]
fn test_local_changes_block_the_merge() {
    let t = TestRepo::new();

    let head_tree = t.tree(&[("file.txt", b"committed\n")]);
    let head = t.commit(head_tree, &[]);
    let remote_tree = t.tree(&[("file.txt", b"committed\n"), ("r.txt", b"r\n")]);
    let remote = t.commit(remote_tree, &[head]);

    // Index diverges from head's tree: staged local change.
    let dirty_tree = t.tree(&[("file.txt", b"staged local change\n")]);
    t.checkout(&dirty_tree);
    let before = t.index_bytes();

    let code = run_octopus(&t, &[], &head, &[remote]);
    assert_eq!(code, 2);
    assert_eq!(t.index_bytes(), before, "preflight must not touch the index");
}

#[test]
fn test_simple_merge_of_two_diverged_remotes() {
    let t = TestRepo::new();

    let root_tree = t.tree(&[("base.txt", b"base\n")]);
    let root = t.commit(root_tree, &[]);

    let head_tree = t.tree(&[("base.txt", b"base\n"), ("h.txt", b"h\n")]);
    let head = t.commit(head_tree, &[root]);

    let r1_tree = t.tree(&[("base.txt", b"base\n"), ("r1.txt", b"r1\n")]);
    let r1 = t.commit(r1_tree, &[root]);

    let r2_tree = t.tree(&[("base.txt", b"base\n"), ("r2.txt", b"r2\n")]);
    let r2 = t.commit(r2_tree, &[root]);

    t.checkout(&head_tree);

    let code = run_octopus(&t, &[], &head, &[r1, r2]);
    assert_eq!(code, 0);

    let tree = Tree::read(&t.repo.odb, &final_tree(&t)).expect("read result tree");
    assert!(tree.has_entry("h.txt"));
    assert!(tree.has_entry("r1.txt"));
    assert!(tree.has_entry("r2.txt"));
    let index = t.load_index();
    assert!(!index.has_unmerged());
}

#[test]
fn test_unrelated_history_is_fatal() {
    let t = TestRepo::new();

    let head_tree = t.tree(&[("a.txt", b"a\n")]);
    let head = t.commit(head_tree, &[]);
    let stray_tree = t.tree(&[("b.txt", b"b\n")]);
    let stray = t.commit(stray_tree, &[]);

    t.checkout(&head_tree);

    let reporter = Reporter::new(true);
    let result = octopus(&t.repo, &reporter, &[], &head, &[stray]);
    assert!(result.is_err(), "no common commit must be fatal");
}
