//! Working-tree file materialization
//!
//! Per-path helpers used by the unpacker and the merge resolver: existence
//! checks for the untracked-overwrite guard, blob checkout with the
//! entry's mode, and removal with empty-parent pruning.

use crate::{FileMode, ObjectDatabase};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::trace;

/// Whether a working-tree file (or symlink) exists at `path`
pub fn file_exists(workdir: &Path, path: &str) -> bool {
    workdir.join(path).symlink_metadata().is_ok()
}

/// Remove the working-tree file at `path` and prune now-empty parent
/// directories up to the repository root
pub fn remove_path(workdir: &Path, path: &str) -> Result<()> {
    let abs = workdir.join(path);
    match fs::remove_file(&abs) {
        Ok(()) => trace!(path, "removed worktree file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => {
            return Err(e).with_context(|| format!("failed to remove '{}'", abs.display()))
        }
    }

    let mut dir = abs.parent();
    while let Some(d) = dir {
        if d == workdir || fs::remove_dir(d).is_err() {
            break;
        }
        dir = d.parent();
    }
    Ok(())
}

/// Write blob bytes to the working tree at `path` with the given mode
pub fn checkout_blob(workdir: &Path, path: &str, mode: FileMode, data: &[u8]) -> Result<()> {
    let abs = workdir.join(path);
    if let Some(parent) = abs.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory for '{}'", abs.display()))?;
    }
    fs::write(&abs, data).with_context(|| format!("failed to write '{}'", abs.display()))?;
    set_file_mode(&abs, mode)?;
    trace!(path, %mode, bytes = data.len(), "checked out worktree file");
    Ok(())
}

/// Read a blob out of the object database and check it out at `path`
pub fn checkout_from_odb(
    odb: &ObjectDatabase,
    workdir: &Path,
    path: &str,
    mode: FileMode,
    oid: &crate::Oid,
) -> Result<()> {
    let data = odb.read(oid)?;
    checkout_blob(workdir, path, mode, &data)
}

/// Apply the permission bits a mode implies to an on-disk file
#[cfg(unix)]
pub fn set_file_mode(abs: &Path, mode: FileMode) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let bits = match mode {
        FileMode::Executable => 0o755,
        _ => 0o644,
    };
    fs::set_permissions(abs, fs::Permissions::from_mode(bits))
        .with_context(|| format!("failed to set permissions on '{}'", abs.display()))
}

#[cfg(not(unix))]
pub fn set_file_mode(_abs: &Path, _mode: FileMode) -> Result<()> {
    Ok(())
}
