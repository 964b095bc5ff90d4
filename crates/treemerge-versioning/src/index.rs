//! Stage-aware index (staging area)
//!
//! The index is an ordered sequence of cache entries sorted by
//! `(path, stage)`. Stage 0 is a merged entry; stages 1/2/3 hold the
//! ancestor, ours, and theirs versions of an unmerged path. Per path,
//! stage 0 and the unmerged stages are mutually exclusive at rest.
//!
//! It is persisted to `.treemerge/index` as a JSON file and only ever
//! rewritten through the scoped lock in [`crate::lock`].

use crate::{FileMode, Oid, Tree, TreeEntry};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Entry flag: the user promised the working-tree file is unchanged, so
/// refresh must not stat it.
pub const FLAG_ASSUME_VALID: u16 = 0x8000;

/// Unmerged stage slots: ancestor, ours, theirs.
pub const STAGE_ANCESTOR: u8 = 1;
/// Stage of the current branch's version.
pub const STAGE_OURS: u8 = 2;
/// Stage of the incoming branch's version.
pub const STAGE_THEIRS: u8 = 3;

/// An entry in the index
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheEntry {
    /// Path to the file relative to repository root
    pub path: String,
    /// Object ID of the staged content
    pub oid: Oid,
    /// File mode
    pub mode: FileMode,
    /// Merge stage (0 merged, 1 ancestor, 2 ours, 3 theirs)
    pub stage: u8,
    /// File size in bytes (stat cache, stage 0 only)
    pub size: u64,
    /// Entry flags
    pub flags: u16,
}

impl CacheEntry {
    /// Create a new index entry
    pub fn new(path: String, oid: Oid, mode: FileMode, stage: u8) -> Self {
        Self {
            path,
            oid,
            mode,
            stage,
            size: 0,
            flags: 0,
        }
    }

    /// Entry with a recorded file size
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    /// Whether this entry belongs to an unmerged path
    pub fn is_unmerged(&self) -> bool {
        self.stage != 0
    }
}

/// Validate a repository-relative path for index insertion.
///
/// Rejects empty paths, absolute paths, `.`/`..` components, empty
/// components, and embedded NUL bytes.
pub fn verify_path(path: &str) -> bool {
    if path.is_empty() || path.starts_with('/') || path.contains('\0') {
        return false;
    }
    path.split('/')
        .all(|c| !c.is_empty() && c != "." && c != "..")
}

/// The index: an ordered sequence of cache entries
///
/// Entries are kept sorted by `(path, stage)`, so lookups are binary
/// searches and a linear scan visits paths in lexicographic order with a
/// path's stages adjacent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Index {
    /// Entries sorted by (path, stage)
    entries: Vec<CacheEntry>,
    /// Version of the index format
    version: u32,
}

impl Index {
    /// Create a new empty index
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            version: 1,
        }
    }

    /// Load index from a file, returning an empty index if none exists
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read index file: {}", path.display()))?;

        let index: Index =
            serde_json::from_str(&contents).context("Failed to parse index file")?;

        Ok(index)
    }

    /// Save index to a file
    ///
    /// Drivers must not call this directly; index rewrites go through the
    /// lockfile so concurrent invocations cannot interleave.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self).context("Failed to serialize index")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write index file: {}", path.display()))?;

        Ok(())
    }

    /// Number of entries (all stages)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the index has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in (path, stage) order
    pub fn entries(&self) -> &[CacheEntry] {
        &self.entries
    }

    fn pos(&self, path: &str, stage: u8) -> std::result::Result<usize, usize> {
        self.entries
            .binary_search_by(|e| (e.path.as_str(), e.stage).cmp(&(path, stage)))
    }

    /// Index of the first entry at or after `path`
    pub fn first_pos(&self, path: &str) -> usize {
        self.entries
            .partition_point(|e| (e.path.as_str(), e.stage) < (path, 0))
    }

    /// Get the entry at (path, stage)
    pub fn get(&self, path: &str, stage: u8) -> Option<&CacheEntry> {
        self.pos(path, stage).ok().map(|i| &self.entries[i])
    }

    /// The unmerged stage slots for a path: [ancestor, ours, theirs]
    pub fn stages(&self, path: &str) -> [Option<&CacheEntry>; 3] {
        [
            self.get(path, STAGE_ANCESTOR),
            self.get(path, STAGE_OURS),
            self.get(path, STAGE_THEIRS),
        ]
    }

    /// Whether the path has any entry, at any stage
    pub fn contains_path(&self, path: &str) -> bool {
        self.entries
            .get(self.first_pos(path))
            .is_some_and(|e| e.path == path)
    }

    /// Whether the path is unmerged (has stage 1/2/3 entries)
    pub fn is_unmerged(&self, path: &str) -> bool {
        self.entries
            .get(self.first_pos(path))
            .is_some_and(|e| e.path == path && e.is_unmerged())
    }

    /// Add or replace the entry at (path, stage)
    pub fn add(&mut self, entry: CacheEntry) {
        match self.pos(&entry.path, entry.stage) {
            Ok(i) => self.entries[i] = entry,
            Err(i) => self.entries.insert(i, entry),
        }
    }

    /// Add a stage-0 entry for (mode, oid, path), dropping any unmerged
    /// stages the path carried
    ///
    /// This is the "path is now merged" transition: stages 1/2/3 collapse
    /// into a single stage-0 entry.
    pub fn add_cacheinfo(
        &mut self,
        mode: FileMode,
        oid: Oid,
        path: &str,
        assume_unchanged: bool,
    ) -> Result<()> {
        if !verify_path(path) {
            bail!("Invalid path '{}'", path);
        }

        self.remove_path(path);
        let mut entry = CacheEntry::new(path.to_string(), oid, mode, 0);
        if assume_unchanged {
            entry.flags |= FLAG_ASSUME_VALID;
        }
        self.add(entry);
        Ok(())
    }

    /// Remove all entries for a path, returning whether any existed
    pub fn remove_path(&mut self, path: &str) -> bool {
        let start = self.first_pos(path);
        let mut end = start;
        while end < self.entries.len() && self.entries[end].path == path {
            end += 1;
        }
        if end > start {
            self.entries.drain(start..end);
            true
        } else {
            false
        }
    }

    /// Unmerged paths in index order, each listed once
    pub fn unmerged_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        for entry in &self.entries {
            if entry.is_unmerged() && paths.last().map(String::as_str) != Some(&entry.path) {
                paths.push(entry.path.clone());
            }
        }
        paths
    }

    /// Whether any entry is unmerged
    pub fn has_unmerged(&self) -> bool {
        self.entries.iter().any(|e| e.is_unmerged())
    }

    /// Refresh the stat cache of stage-0 entries against the working tree
    ///
    /// Entries flagged `FLAG_ASSUME_VALID` are skipped. Missing files are
    /// left alone; the merge machinery decides what to do with them.
    pub fn refresh(&mut self, workdir: &Path, quiet: bool) -> Result<()> {
        for entry in &mut self.entries {
            if entry.stage != 0 || entry.flags & FLAG_ASSUME_VALID != 0 {
                continue;
            }
            match fs::metadata(workdir.join(&entry.path)) {
                Ok(meta) => entry.size = meta.len(),
                Err(_) if quiet => {}
                Err(_) => debug!(path = %entry.path, "needs update"),
            }
        }
        Ok(())
    }

    /// Write the index out as a tree object
    ///
    /// Fails while any unmerged entry remains; the caller decides whether
    /// that failure means "run the automatic merge" or "give up".
    pub fn write_as_tree(&self, odb: &crate::ObjectDatabase, silent: bool) -> Result<Oid> {
        if self.has_unmerged() {
            if !silent {
                debug!("cannot write tree: unmerged index entries present");
            }
            bail!("Committing unmerged index entries is not possible");
        }

        let mut tree = Tree::new();
        for entry in &self.entries {
            tree.add_entry(TreeEntry::new(entry.path.clone(), entry.mode, entry.oid));
        }
        tree.write(odb)
    }

    /// Paths whose index state differs from the given tree
    ///
    /// Unmerged paths always count as changed. Used by the octopus
    /// preflight to refuse merging over local changes.
    pub fn has_changes_against(&self, tree: &Tree) -> Vec<String> {
        let mut changed = Vec::new();

        for entry in &self.entries {
            if entry.is_unmerged() {
                if changed.last().map(String::as_str) != Some(&entry.path) {
                    changed.push(entry.path.clone());
                }
                continue;
            }
            match tree.get_entry(&entry.path) {
                Some(te) if te.oid == entry.oid && te.mode == entry.mode => {}
                _ => changed.push(entry.path.clone()),
            }
        }

        for te in tree.iter() {
            if !self.contains_path(&te.name) {
                changed.push(te.name.clone());
            }
        }

        changed.sort();
        changed.dedup();
        changed
    }

    /// Replace the whole index with the stage-0 contents of a tree
    pub fn read_tree(&mut self, tree: &Tree) {
        self.entries.clear();
        for te in tree.iter() {
            self.entries
                .push(CacheEntry::new(te.name.clone(), te.oid, te.mode, 0));
        }
    }
}

impl Default for Index {
    fn default() -> Self {
        Self::new()
    }
}
