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

//! In-memory mock storage backend for testing
//!
//! Provides a thread-safe, in-memory implementation of
//! [`StorageBackend`](crate::StorageBackend) using `Arc<RwLock<HashMap>>`.

use crate::{validate_key, StorageBackend, StorageError, StorageResult};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

/// In-memory mock storage backend for testing
///
/// Thread-safe implementation suitable for unit and integration tests.
#[derive(Clone, Default)]
pub struct MockBackend {
    store: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MockBackend {
    /// Create a new empty mock storage backend
    pub fn new() -> Self {
        MockBackend {
            store: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create a mock storage backend with initial data
    pub fn with_data(initial_data: HashMap<String, Vec<u8>>) -> Self {
        MockBackend {
            store: Arc::new(RwLock::new(initial_data)),
        }
    }

    /// Get the current number of objects stored
    pub fn len(&self) -> usize {
        self.store.read().expect("mock store poisoned").len()
    }

    /// Check whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockBackend")
            .field("objects", &self.len())
            .finish()
    }
}

impl StorageBackend for MockBackend {
    fn put(&self, key: &str, data: &[u8]) -> StorageResult<()> {
        validate_key(key)?;
        self.store
            .write()
            .map_err(|_| StorageError::backend("mock store poisoned"))?
            .insert(key.to_string(), data.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        validate_key(key)?;
        self.store
            .read()
            .map_err(|_| StorageError::backend("mock store poisoned"))?
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::not_found(key))
    }

    fn exists(&self, key: &str) -> StorageResult<bool> {
        validate_key(key)?;
        Ok(self
            .store
            .read()
            .map_err(|_| StorageError::backend("mock store poisoned"))?
            .contains_key(key))
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        self.store
            .write()
            .map_err(|_| StorageError::backend("mock store poisoned"))?
            .remove(key);
        Ok(())
    }

    fn list_objects(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let store = self
            .store
            .read()
            .map_err(|_| StorageError::backend("mock store poisoned"))?;
        let mut keys: Vec<String> = store
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}
