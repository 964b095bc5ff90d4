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

//! Storage abstraction layer for TreeMerge
//!
//! This crate provides a unified storage interface behind which the object
//! database keeps its content-addressed payloads:
//! - Local filesystem (`LocalBackend`)
//! - In-memory mock for tests (`MockBackend`)
//!
//! # Architecture
//!
//! The `StorageBackend` trait defines a minimal but complete interface for
//! object storage operations, allowing implementations to handle various
//! storage systems transparently.
//!
//! ## Core Concepts
//!
//! - **Keys**: Unique identifiers for stored objects (strings, typically
//!   hierarchical like file paths)
//! - **Objects**: Arbitrary binary data associated with a key
//! - **Prefixes**: String prefixes used for listing and organization
//!
//! The merge driver is single-threaded with blocking I/O, so the trait is
//! synchronous. Implementations must still be `Send + Sync` so an
//! `Arc<dyn StorageBackend>` can be shared freely.
//!
//! # Examples
//!
//! Using the mock backend for testing:
//!
//! ```
//! use treemerge_storage::{StorageBackend, mock::MockBackend};
//!
//! fn main() -> anyhow::Result<()> {
//!     let storage = MockBackend::new();
//!
//!     storage.put("ab/cdef", b"payload")?;
//!     let data = storage.get("ab/cdef")?;
//!     assert_eq!(data, b"payload");
//!
//!     assert!(storage.exists("ab/cdef")?);
//!     storage.delete("ab/cdef")?;
//!     assert!(!storage.exists("ab/cdef")?);
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod local;
pub mod mock;

use std::fmt::Debug;

pub use error::{StorageError, StorageResult};
pub use local::LocalBackend;
pub use mock::MockBackend;

/// Storage backend trait for object storage operations
///
/// This trait defines the minimal interface for object storage systems.
/// Implementations must be thread-safe and handle errors gracefully.
///
/// Deleting a non-existent object succeeds (idempotent); reading one
/// returns [`StorageError::NotFound`]. List operations return sorted keys.
pub trait StorageBackend: Send + Sync + Debug {
    /// Store an object under the given key, replacing any previous value.
    fn put(&self, key: &str, data: &[u8]) -> StorageResult<()>;

    /// Retrieve the object stored under the given key.
    fn get(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Check whether an object exists under the given key.
    fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Delete the object stored under the given key.
    fn delete(&self, key: &str) -> StorageResult<()>;

    /// List all keys starting with the given prefix, sorted.
    fn list_objects(&self, prefix: &str) -> StorageResult<Vec<String>>;
}

/// Validate a storage key.
///
/// Keys are relative, slash-separated paths: no empty keys, no absolute
/// paths, no `.`/`..` components, no embedded NUL.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::invalid_key("key cannot be empty"));
    }
    if key.starts_with('/') {
        return Err(StorageError::invalid_key(format!(
            "key cannot be absolute: {key}"
        )));
    }
    if key.contains('\0') {
        return Err(StorageError::invalid_key("key cannot contain NUL"));
    }
    for component in key.split('/') {
        if component.is_empty() || component == "." || component == ".." {
            return Err(StorageError::invalid_key(format!(
                "key contains invalid component: {key}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key_accepts_relative_paths() {
        assert!(validate_key("ab/cdef0123").is_ok());
        assert!(validate_key("single").is_ok());
    }

    #[test]
    fn test_validate_key_rejects_bad_keys() {
        assert!(validate_key("").is_err());
        assert!(validate_key("/absolute").is_err());
        assert!(validate_key("a/../b").is_err());
        assert!(validate_key("a//b").is_err());
        assert!(validate_key("a/./b").is_err());
        assert!(validate_key("nul\0byte").is_err());
    }
}
