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

//! End-to-end tests for `treemerge octopus`.

mod common;

use common::{treemerge, CliRepo};
use predicates::prelude::*;

#[test]
fn test_fewer_than_two_remotes_exits_two() {
    let r = CliRepo::new();

    let tree = r.tree(&[("f", b"x\n")]);
    let c = r.commit(tree, &[]);
    r.checkout(&tree);

    let hex = c.to_hex();
    treemerge()
        .current_dir(r.path())
        .args(["octopus", "--", &hex, &hex])
        .assert()
        .code(2);
}

#[test]
fn test_merges_two_diverged_remotes() {
    let r = CliRepo::new();

    let root_tree = r.tree(&[("base.txt", b"base\n")]);
    let root = r.commit(root_tree, &[]);

    let head_tree = r.tree(&[("base.txt", b"base\n"), ("h.txt", b"h\n")]);
    let head = r.commit(head_tree, &[root]);

    let r1_tree = r.tree(&[("base.txt", b"base\n"), ("r1.txt", b"r1\n")]);
    let r1 = r.commit(r1_tree, &[root]);

    let r2_tree = r.tree(&[("base.txt", b"base\n"), ("r2.txt", b"r2\n")]);
    let r2 = r.commit(r2_tree, &[root]);

    r.checkout(&head_tree);

    treemerge()
        .current_dir(r.path())
        .args([
            "octopus",
            &root.to_hex(),
            "--",
            &head.to_hex(),
            &r1.to_hex(),
            &r2.to_hex(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Trying simple merge with"));

    assert_eq!(r.read_file("r1.txt"), "r1\n");
    assert_eq!(r.read_file("r2.txt"), "r2\n");
    assert_eq!(r.read_file("h.txt"), "h\n");
}

#[test]
fn test_fast_forward_reports_branch_name_from_environment() {
    let r = CliRepo::new();

    let head_tree = r.tree(&[("f", b"v1\n")]);
    let head = r.commit(head_tree, &[]);

    let ff_tree = r.tree(&[("f", b"v2\n")]);
    let ff = r.commit(ff_tree, &[head]);

    let other_tree = r.tree(&[("f", b"v2\n"), ("o.txt", b"o\n")]);
    let other = r.commit(other_tree, &[ff]);

    r.checkout(&head_tree);

    treemerge()
        .current_dir(r.path())
        .env(format!("TREEMERGE_HEAD_{}", ff.to_hex()), "topic/fast")
        .args(["octopus", "--", &head.to_hex(), &ff.to_hex(), &other.to_hex()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Fast-forwarding to: topic/fast"));

    assert_eq!(r.read_file("o.txt"), "o\n");
}

#[test]
fn test_conflict_before_last_remote_aborts() {
    let r = CliRepo::new();

    let root_tree = r.tree(&[("file.txt", b"a\nmiddle\nz\n")]);
    let root = r.commit(root_tree, &[]);

    let head_tree = r.tree(&[("file.txt", b"a\nours\nz\n")]);
    let head = r.commit(head_tree, &[root]);

    let x_tree = r.tree(&[("file.txt", b"a\ntheirs\nz\n")]);
    let x = r.commit(x_tree, &[root]);

    let y_tree = r.tree(&[("file.txt", b"a\nmiddle\nz\n"), ("y.txt", b"y\n")]);
    let y = r.commit(y_tree, &[root]);

    r.checkout(&head_tree);

    treemerge()
        .current_dir(r.path())
        .args([
            "octopus",
            &root.to_hex(),
            "--",
            &head.to_hex(),
            &x.to_hex(),
            &y.to_hex(),
        ])
        .assert()
        .code(2)
        .stdout(
            predicate::str::contains("Automated merge did not work.")
                .and(predicate::str::contains("Should not be doing an octopus.")),
        );

    assert!(!r.path().join("y.txt").exists());
}

#[test]
fn test_local_changes_block_the_merge() {
    let r = CliRepo::new();

    let head_tree = r.tree(&[("f", b"committed\n")]);
    let head = r.commit(head_tree, &[]);
    let r1_tree = r.tree(&[("f", b"committed\n"), ("a", b"a\n")]);
    let r1 = r.commit(r1_tree, &[head]);
    let r2_tree = r.tree(&[("f", b"committed\n"), ("b", b"b\n")]);
    let r2 = r.commit(r2_tree, &[head]);

    let dirty = r.tree(&[("f", b"staged local change\n")]);
    r.checkout(&dirty);

    treemerge()
        .current_dir(r.path())
        .args(["octopus", "--", &head.to_hex(), &r1.to_hex(), &r2.to_hex()])
        .assert()
        .code(2)
        .stderr(predicate::str::contains(
            "Your local changes to the following files would be overwritten by merge:",
        ));
}
