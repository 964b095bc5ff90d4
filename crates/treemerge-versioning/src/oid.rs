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

//! Object Identifier (OID) for content-addressable storage
//!
//! An OID is a SHA-256 hash of an object's content. Equality is byte
//! equality; the hex form is the wire and CLI representation.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Object Identifier - SHA-256 hash of object content
///
/// The OID is a 32-byte (256-bit) SHA-256 hash that uniquely identifies
/// an object by its content.
///
/// # Examples
///
/// ```
/// use treemerge_versioning::Oid;
///
/// let data = b"Hello, World!";
/// let oid = Oid::hash(data);
/// assert_eq!(oid.to_hex().len(), 64);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Oid([u8; 32]);

impl Oid {
    /// Create an OID by hashing the given data
    pub fn hash(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        let result = hasher.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&result);
        Oid(bytes)
    }

    /// Create OID from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Oid(bytes)
    }

    /// Get the raw bytes of the OID
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert OID to hex string
    ///
    /// # Examples
    ///
    /// ```
    /// use treemerge_versioning::Oid;
    ///
    /// let hex = Oid::hash(b"test").to_hex();
    /// assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    /// ```
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Create OID from hex string
    ///
    /// # Errors
    ///
    /// Returns error if the string is not 64 hex characters
    pub fn from_hex(s: &str) -> anyhow::Result<Self> {
        if s.len() != 64 {
            anyhow::bail!("OID hex string must be 64 characters, got {}", s.len());
        }

        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            anyhow::bail!("Decoded OID must be 32 bytes, got {}", bytes.len());
        }

        let mut oid_bytes = [0u8; 32];
        oid_bytes.copy_from_slice(&bytes);
        Ok(Oid(oid_bytes))
    }

    /// Get object path for fan-out object storage
    ///
    /// Returns path in format: `{first2hex}/{remaining62hex}`
    pub fn to_path(&self) -> String {
        let hex = self.to_hex();
        format!("{}/{}", &hex[..2], &hex[2..])
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Oid({})", self.to_hex())
    }
}

impl From<[u8; 32]> for Oid {
    fn from(bytes: [u8; 32]) -> Self {
        Oid(bytes)
    }
}

impl From<Oid> for [u8; 32] {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}
