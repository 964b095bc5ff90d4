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

//! Tree-merge driver core for TreeMerge
//!
//! This crate implements the merge subsystem of a content-addressed
//! version control system:
//! - Content-addressable object model (SHA-256 oids, trees, commits)
//! - Stage-aware index with a scoped exclusive lockfile
//! - N-way tree unpacking with multi-base unification
//! - Per-path three-way merge resolution with a pluggable callback
//! - The **resolve** (two-head) and **octopus** (N-head) strategies
//!
//! # Architecture
//!
//! Drivers hold only object ids and borrow parsed data per operation; the
//! object database owns allocation behind a pluggable storage backend.
//! A driver invocation locks the index, runs an unpack pass, and — only
//! if the result cannot be written as a tree — walks the remaining
//! unmerged stages through the per-path resolver. All I/O is blocking and
//! single-threaded; message ordering is part of the driver contract.
//!
//! # Examples
//!
//! ```no_run
//! use treemerge_versioning::{resolve, Reporter, Repository, Oid};
//!
//! fn main() -> anyhow::Result<()> {
//!     let repo = Repository::discover(std::env::current_dir()?)?;
//!     let reporter = Reporter::new(false);
//!
//!     let base = Oid::from_hex("...")?;
//!     let head = Oid::from_hex("...")?;
//!     let remote = Oid::from_hex("...")?;
//!
//!     let code = resolve(&repo, &reporter, &[base], Some(&head), Some(&remote))?;
//!     std::process::exit(code);
//! }
//! ```

mod commit;
mod filemerge;
mod index;
mod lca;
mod lock;
mod object;
mod octopus;
mod odb;
mod oid;
mod pathmerge;
mod repo;
mod report;
mod resolve;
mod tree;
mod unpack;
mod walker;
pub mod worktree;

pub use commit::{Commit, Signature};
pub use filemerge::{three_way_file_merge, FileMergeOptions, MergeLabels};
pub use index::{
    verify_path, CacheEntry, Index, FLAG_ASSUME_VALID, STAGE_ANCESTOR, STAGE_OURS, STAGE_THEIRS,
};
pub use lca::MergeBaseFinder;
pub use lock::IndexLock;
pub use object::ObjectType;
pub use octopus::octopus;
pub use odb::ObjectDatabase;
pub use oid::Oid;
pub use pathmerge::{merge_one_file, BlobRef, PathMergeError, PathMergeInput};
pub use repo::{MergeContext, Repository, STATE_DIR};
pub use report::Reporter;
pub use resolve::resolve;
pub use tree::{FileMode, Tree, TreeEntry};
pub use unpack::{unpack_trees, MergeFn, UnpackOptions};
pub use walker::{merge_all, merge_one_path, MergeCallback, MergeProgram, OneFileMerger, WalkOutcome};
