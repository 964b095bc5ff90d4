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

//! Index walking over unmerged entries
//!
//! Groups the stage-1/2/3 entries of each unmerged path and dispatches the
//! group to a merge callback, in index (lexicographic) order. A callback
//! failure is a hand-resolvable conflict: counted in oneshot mode,
//! aborting the walk otherwise. A path with no entries at all is a hard
//! error.

use crate::pathmerge::{merge_one_file, BlobRef, PathMergeError, PathMergeInput};
use crate::MergeContext;
use anyhow::{bail, Result};
use std::process::Command;
use tracing::debug;

/// Result of walking one or more paths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkOutcome {
    /// Every dispatched path merged cleanly
    Clean,
    /// Hand-resolvable conflicts remain
    Conflicts(usize),
}

impl WalkOutcome {
    /// Number of conflicted paths (zero when clean)
    pub fn conflict_count(&self) -> usize {
        match self {
            WalkOutcome::Clean => 0,
            WalkOutcome::Conflicts(n) => *n,
        }
    }

    /// Whether any conflict was recorded
    pub fn is_clean(&self) -> bool {
        matches!(self, WalkOutcome::Clean)
    }
}

/// A per-path merge capability
///
/// Implementations mutate the index and working tree through the borrowed
/// [`MergeContext`]; an `Err` marks the path as a hand-resolvable
/// conflict.
pub trait MergeCallback {
    /// Merge a single path
    fn merge(
        &mut self,
        ctx: &mut MergeContext<'_>,
        input: &PathMergeInput,
    ) -> Result<(), PathMergeError>;
}

/// The built-in resolver: [`merge_one_file`]
#[derive(Debug, Default)]
pub struct OneFileMerger;

impl MergeCallback for OneFileMerger {
    fn merge(
        &mut self,
        ctx: &mut MergeContext<'_>,
        input: &PathMergeInput,
    ) -> Result<(), PathMergeError> {
        merge_one_file(ctx, input)
    }
}

/// External merge program adapter
///
/// Spawns `<program> <orig_hex> <ours_hex> <theirs_hex> <path>
/// <orig_mode_oct> <ours_mode_oct> <theirs_mode_oct>` in the working
/// directory. Absent blobs become empty hex strings and mode `0`. The
/// child updates the index itself; a non-zero exit is a conflict.
#[derive(Debug, Clone)]
pub struct MergeProgram {
    /// Program to run for each unmerged path
    pub program: String,
}

impl MergeProgram {
    /// Create an adapter for the given program
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl MergeCallback for MergeProgram {
    fn merge(
        &mut self,
        ctx: &mut MergeContext<'_>,
        input: &PathMergeInput,
    ) -> Result<(), PathMergeError> {
        let hex = |b: &Option<BlobRef>| b.map(|b| b.oid.to_hex()).unwrap_or_default();
        let octal = |b: &Option<BlobRef>| {
            b.map(|b| format!("{:o}", b.mode.as_u32()))
                .unwrap_or_else(|| "0".to_string())
        };

        let status = Command::new(&self.program)
            .arg(hex(&input.orig))
            .arg(hex(&input.ours))
            .arg(hex(&input.theirs))
            .arg(&input.path)
            .arg(octal(&input.orig))
            .arg(octal(&input.ours))
            .arg(octal(&input.theirs))
            .current_dir(ctx.repo.workdir())
            .status()
            .map_err(|e| {
                PathMergeError::Other(anyhow::anyhow!(
                    "failed to run merge program '{}': {}",
                    self.program,
                    e
                ))
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(PathMergeError::Other(anyhow::anyhow!(
                "merge program '{}' exited with {}",
                self.program,
                status
            )))
        }
    }
}

/// Per-path dispatch outcome
enum EntryOutcome {
    Found,
    Conflict,
}

/// Collect a path's stage slots into a merge input and dispatch it
fn merge_entry(
    ctx: &mut MergeContext<'_>,
    quiet: bool,
    path: &str,
    cb: &mut dyn MergeCallback,
) -> Result<EntryOutcome> {
    let stages = ctx.index.stages(path);
    if stages.iter().all(Option::is_none) {
        bail!("{} is not in the cache", path);
    }

    let slot = |entry: Option<&crate::CacheEntry>| entry.map(|e| BlobRef::new(e.oid, e.mode));
    let input = PathMergeInput {
        path: path.to_string(),
        orig: slot(stages[0]),
        ours: slot(stages[1]),
        theirs: slot(stages[2]),
    };
    debug_assert!(
        input.orig.is_some() || input.ours.is_some() || input.theirs.is_some(),
        "empty inputs are not dispatched"
    );

    match cb.merge(ctx, &input) {
        Ok(()) => Ok(EntryOutcome::Found),
        Err(e) => {
            debug!(path, error = %e, "path left unmerged");
            if !quiet {
                ctx.reporter.error("Merge program failed");
            }
            Ok(EntryOutcome::Conflict)
        }
    }
}

/// Merge a single path
///
/// A path already at stage 0 is a no-op; a path absent from the index is
/// a hard error. One unmerged path yields `Conflicts(1)` when the
/// callback fails.
pub fn merge_one_path(
    ctx: &mut MergeContext<'_>,
    quiet: bool,
    path: &str,
    cb: &mut dyn MergeCallback,
) -> Result<WalkOutcome> {
    // Already merged at stage 0: nothing to do.
    if ctx.index.get(path, 0).is_some() {
        return Ok(WalkOutcome::Clean);
    }

    match merge_entry(ctx, quiet, path, cb)? {
        EntryOutcome::Found => Ok(WalkOutcome::Clean),
        EntryOutcome::Conflict => Ok(WalkOutcome::Conflicts(1)),
    }
}

/// Merge every unmerged path in the index
///
/// Paths are visited in lexicographic order, the stage slots presented to
/// the callback by stage number regardless of physical order. With
/// `oneshot` the walk continues past conflicts and returns their count;
/// without it the first conflict aborts the walk.
pub fn merge_all(
    ctx: &mut MergeContext<'_>,
    oneshot: bool,
    quiet: bool,
    cb: &mut dyn MergeCallback,
) -> Result<WalkOutcome> {
    let paths = ctx.index.unmerged_paths();
    debug!(unmerged = paths.len(), oneshot, "walking unmerged paths");

    let mut err = 0usize;
    for path in paths {
        match merge_entry(ctx, quiet, &path, cb)? {
            EntryOutcome::Found => {}
            EntryOutcome::Conflict => {
                if oneshot {
                    err += 1;
                } else {
                    return Ok(WalkOutcome::Conflicts(1));
                }
            }
        }
    }

    if err > 0 {
        Ok(WalkOutcome::Conflicts(err))
    } else {
        Ok(WalkOutcome::Clean)
    }
}
