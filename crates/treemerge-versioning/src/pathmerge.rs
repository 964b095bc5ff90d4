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

//! Per-path merge resolution
//!
//! Decides the outcome for a single path given the ancestor, ours, and
//! theirs versions: clean deletion, one-sided add, identical add, or a
//! three-way content merge. Mutates the in-memory index and the working
//! tree, and emits exactly one progress line per path; every error is
//! reported once, at the point it is detected, then returned for the
//! walker to count.

use crate::filemerge::{three_way_file_merge, FileMergeOptions, MergeLabels};
use crate::{worktree, FileMode, MergeContext, ObjectType, Oid, STAGE_OURS};
use std::fs::{self, OpenOptions};
use std::io::Write;
use thiserror::Error;
use tracing::debug;

/// A present blob: content id plus file mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobRef {
    /// Content address of the blob
    pub oid: Oid,
    /// File mode carried by the tree or index entry
    pub mode: FileMode,
}

impl BlobRef {
    /// Create a blob reference
    pub fn new(oid: Oid, mode: FileMode) -> Self {
        Self { oid, mode }
    }
}

/// Input to the per-path resolver
///
/// At least one of the three versions must be present; the walker never
/// dispatches empty groups.
#[derive(Debug, Clone)]
pub struct PathMergeInput {
    /// Repository-relative path being merged
    pub path: String,
    /// Ancestor version (stage 1), if any
    pub orig: Option<BlobRef>,
    /// Current branch's version (stage 2), if any
    pub ours: Option<BlobRef>,
    /// Incoming version (stage 3), if any
    pub theirs: Option<BlobRef>,
}

/// Per-path merge failure
///
/// These are hand-resolvable conflicts or per-path hard failures; the
/// walker counts them, the index keeps the path's stages, and the driver
/// maps a non-empty count to exit code 1.
#[derive(Error, Debug)]
pub enum PathMergeError {
    /// Deleted on one branch, permissions changed on the other
    #[error("File {path} deleted on one branch but had its permissions changed on the other.")]
    DeletedModified {
        /// Conflicted path
        path: String,
    },

    /// Path failed index validation
    #[error("Invalid path '{path}'")]
    InvalidPath {
        /// Offending path
        path: String,
    },

    /// An untracked working-tree file blocks the incoming add
    #[error("untracked {path} is overwritten by the merge.")]
    UntrackedOverwrite {
        /// Blocked path
        path: String,
    },

    /// Identical add on both sides with differing permissions
    #[error("File {path} added identically in both branches, but permissions conflict {ours:o}->{theirs:o}.")]
    AddedPermissionConflict {
        /// Conflicted path
        path: String,
        /// Our mode bits
        ours: u32,
        /// Their mode bits
        theirs: u32,
    },

    /// Symbolic links are never content-merged
    #[error("{path}: Not merging symbolic link changes.")]
    SymlinkConflict {
        /// Conflicted path
        path: String,
    },

    /// Submodules are never content-merged
    #[error("{path}: Not merging conflicting submodule changes.")]
    SubmoduleConflict {
        /// Conflicted path
        path: String,
    },

    /// The line-merge engine failed outright
    #[error("Failed to execute internal merge")]
    InternalMerge,

    /// The stage-2 entry the worktree mode comes from is missing
    #[error("{path}: file is not present in the cache")]
    MissingStage {
        /// Affected path
        path: String,
    },

    /// Could not open the working-tree file for the merge result
    #[error("failed to open file '{path}'")]
    OpenFailed {
        /// Affected path
        path: String,
    },

    /// Could not write the merge result
    #[error("failed to write to '{path}'")]
    WriteFailed {
        /// Affected path
        path: String,
    },

    /// Conflict hunks remain in the merged content
    #[error("content conflict in {path}")]
    ContentConflict {
        /// Conflicted path
        path: String,
    },

    /// Sides disagree on the file mode
    #[error("permission conflict: {orig:o}->{ours:o},{theirs:o} in {path}")]
    PermissionConflict {
        /// Conflicted path
        path: String,
        /// Ancestor mode bits (0 when the ancestor is absent)
        orig: u32,
        /// Our mode bits
        ours: u32,
        /// Their mode bits
        theirs: u32,
    },

    /// Presence combination the resolver does not handle
    #[error("{path}: Not handling case {orig_hex} -> {ours_hex} -> {theirs_hex}")]
    UnhandledCase {
        /// Affected path
        path: String,
        /// Ancestor id, empty when absent
        orig_hex: String,
        /// Our id, empty when absent
        ours_hex: String,
        /// Their id, empty when absent
        theirs_hex: String,
    },

    /// Object database failure while merging the path
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Report an error line and hand the error back for propagation
fn report(ctx: &MergeContext<'_>, err: PathMergeError) -> PathMergeError {
    ctx.reporter.error(&err);
    err
}

/// Resolve one path of a merge
///
/// Side effects on success: the in-memory index holds a single stage-0
/// entry for the path (or none, for deletions) and the working tree
/// matches. On conflict the stages are left in place for hand resolution.
pub fn merge_one_file(
    ctx: &mut MergeContext<'_>,
    input: &PathMergeInput,
) -> Result<(), PathMergeError> {
    let path = input.path.as_str();
    let (orig, ours, theirs) = (input.orig, input.ours, input.theirs);
    debug!(
        path,
        orig = orig.is_some(),
        ours = ours.is_some(),
        theirs = theirs.is_some(),
        "merging path"
    );

    if let Some(o) = orig {
        let deleted_in_both = ours.is_none() && theirs.is_none();
        let deleted_in_one = (theirs.is_none() && ours.is_some_and(|u| u.oid == o.oid))
            || (ours.is_none() && theirs.is_some_and(|t| t.oid == o.oid));
        if deleted_in_both || deleted_in_one {
            return merge_one_file_deleted(ctx, o, ours, theirs, path);
        }
    }

    match (orig, ours, theirs) {
        // Added in ours only: the path just needs to be marked merged.
        (None, Some(u), None) => add_cacheinfo(ctx, u.mode, u.oid, path),

        (None, None, Some(t)) => {
            ctx.reporter.progress(format_args!("Adding {path}"));

            if worktree::file_exists(ctx.repo.workdir(), path) {
                return Err(report(
                    ctx,
                    PathMergeError::UntrackedOverwrite {
                        path: path.to_string(),
                    },
                ));
            }

            add_cacheinfo(ctx, t.mode, t.oid, path)?;
            checkout_from_index(ctx, path)
        }

        (None, Some(u), Some(t)) if u.oid == t.oid => {
            // Added in both, identically (check for same permissions).
            if u.mode != t.mode {
                return Err(report(
                    ctx,
                    PathMergeError::AddedPermissionConflict {
                        path: path.to_string(),
                        ours: u.mode.as_u32(),
                        theirs: t.mode.as_u32(),
                    },
                ));
            }

            ctx.reporter.progress(format_args!("Adding {path}"));
            add_cacheinfo(ctx, u.mode, u.oid, path)?;
            checkout_from_index(ctx, path)
        }

        // Modified in both, but differently.
        (_, Some(u), Some(t)) => do_merge_one_file(ctx, orig, u, t, path),

        _ => {
            let hex = |b: Option<BlobRef>| b.map(|b| b.oid.to_hex()).unwrap_or_default();
            Err(report(
                ctx,
                PathMergeError::UnhandledCase {
                    path: path.to_string(),
                    orig_hex: hex(orig),
                    ours_hex: hex(ours),
                    theirs_hex: hex(theirs),
                },
            ))
        }
    }
}

/// Deleted in both, or deleted in one and unchanged in the other
fn merge_one_file_deleted(
    ctx: &mut MergeContext<'_>,
    orig: BlobRef,
    ours: Option<BlobRef>,
    theirs: Option<BlobRef>,
    path: &str,
) -> Result<(), PathMergeError> {
    if ours.is_some_and(|u| u.mode != orig.mode) || theirs.is_some_and(|t| t.mode != orig.mode) {
        return Err(report(
            ctx,
            PathMergeError::DeletedModified {
                path: path.to_string(),
            },
        ));
    }

    if ours.is_some() {
        ctx.reporter.progress(format_args!("Removing {path}"));

        if worktree::file_exists(ctx.repo.workdir(), path) {
            let _ = worktree::remove_path(ctx.repo.workdir(), path);
        }
    }

    ctx.index.remove_path(path);
    Ok(())
}

/// Three-way content merge of a path present on both sides
fn do_merge_one_file(
    ctx: &mut MergeContext<'_>,
    orig: Option<BlobRef>,
    ours: BlobRef,
    theirs: BlobRef,
    path: &str,
) -> Result<(), PathMergeError> {
    if ours.mode.is_symlink() || theirs.mode.is_symlink() {
        return Err(report(
            ctx,
            PathMergeError::SymlinkConflict {
                path: path.to_string(),
            },
        ));
    }
    if ours.mode.is_gitlink() || theirs.mode.is_gitlink() {
        return Err(report(
            ctx,
            PathMergeError::SubmoduleConflict {
                path: path.to_string(),
            },
        ));
    }

    let our_bytes = read_blob(ctx, &ours.oid)?;
    let their_bytes = read_blob(ctx, &theirs.oid)?;
    let orig_bytes = match orig {
        Some(o) => {
            ctx.reporter.progress(format_args!("Auto-merging {path}"));
            read_blob(ctx, &o.oid)?
        }
        None => {
            ctx.reporter
                .progress(format_args!("Added {path} in both, but differently."));
            Vec::new()
        }
    };

    let (merged, status) = three_way_file_merge(
        &orig_bytes,
        &our_bytes,
        &their_bytes,
        MergeLabels::default(),
        FileMergeOptions { zealous_alnum: true },
    );

    if status < 0 {
        return Err(report(ctx, PathMergeError::InternalMerge));
    }

    // The working-tree file takes "our tree" mode from the index.
    let ce_mode = match ctx.index.get(path, STAGE_OURS).map(|e| e.mode) {
        Some(mode) => mode,
        None => {
            return Err(report(
                ctx,
                PathMergeError::MissingStage {
                    path: path.to_string(),
                },
            ))
        }
    };

    let abs = ctx.repo.workdir().join(path);
    let _ = fs::remove_file(&abs);
    if let Some(parent) = abs.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let mut dest = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&abs)
        .map_err(|_| {
            report(
                ctx,
                PathMergeError::OpenFailed {
                    path: path.to_string(),
                },
            )
        })?;
    dest.write_all(&merged).map_err(|_| {
        report(
            ctx,
            PathMergeError::WriteFailed {
                path: path.to_string(),
            },
        )
    })?;
    drop(dest);
    worktree::set_file_mode(&abs, ce_mode).map_err(|_| {
        report(
            ctx,
            PathMergeError::WriteFailed {
                path: path.to_string(),
            },
        )
    })?;

    let mut conflicted = false;
    if status != 0 || orig.is_none() {
        ctx.reporter.error(PathMergeError::ContentConflict {
            path: path.to_string(),
        });
        conflicted = true;
    }
    if ours.mode != theirs.mode {
        return Err(report(
            ctx,
            PathMergeError::PermissionConflict {
                path: path.to_string(),
                orig: orig.map(|o| o.mode.as_u32()).unwrap_or(0),
                ours: ours.mode.as_u32(),
                theirs: theirs.mode.as_u32(),
            },
        ));
    }
    if conflicted {
        // Already reported above; the stages stay for hand resolution.
        return Err(PathMergeError::ContentConflict {
            path: path.to_string(),
        });
    }

    add_file_to_index(ctx, path, ce_mode)
}

fn read_blob(ctx: &MergeContext<'_>, oid: &Oid) -> Result<Vec<u8>, PathMergeError> {
    ctx.repo.odb.read(oid).map_err(|e| report(ctx, e.into()))
}

fn add_cacheinfo(
    ctx: &mut MergeContext<'_>,
    mode: FileMode,
    oid: Oid,
    path: &str,
) -> Result<(), PathMergeError> {
    let assume_unchanged = ctx.repo.assume_unchanged;
    if ctx
        .index
        .add_cacheinfo(mode, oid, path, assume_unchanged)
        .is_err()
    {
        return Err(report(
            ctx,
            PathMergeError::InvalidPath {
                path: path.to_string(),
            },
        ));
    }
    Ok(())
}

/// Materialize the freshly merged stage-0 entry into the working tree
fn checkout_from_index(ctx: &mut MergeContext<'_>, path: &str) -> Result<(), PathMergeError> {
    let entry = ctx.index.get(path, 0).cloned().ok_or_else(|| {
        report(
            ctx,
            PathMergeError::MissingStage {
                path: path.to_string(),
            },
        )
    })?;

    worktree::checkout_from_odb(
        &ctx.repo.odb,
        ctx.repo.workdir(),
        path,
        entry.mode,
        &entry.oid,
    )
    .map_err(|_| {
        report(
            ctx,
            PathMergeError::OpenFailed {
                path: path.to_string(),
            },
        )
    })
}

/// Hash the merged working-tree file back into a stage-0 entry
fn add_file_to_index(
    ctx: &mut MergeContext<'_>,
    path: &str,
    mode: FileMode,
) -> Result<(), PathMergeError> {
    let abs = ctx.repo.workdir().join(path);
    let data = fs::read(&abs).map_err(|_| {
        report(
            ctx,
            PathMergeError::OpenFailed {
                path: path.to_string(),
            },
        )
    })?;
    let oid = ctx
        .repo
        .odb
        .write(ObjectType::Blob, &data)
        .map_err(|e| report(ctx, e.into()))?;
    add_cacheinfo(ctx, mode, oid, path)?;
    Ok(())
}
