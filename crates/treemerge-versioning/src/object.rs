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

//! Object types stored in the object database

use serde::{Deserialize, Serialize};
use std::fmt;

/// Type of an object in the database
///
/// Stored as a one-byte tag ahead of the payload so callers can resolve
/// an id to either a commit or a tree without guessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectType {
    /// File content
    Blob,
    /// Directory snapshot (flat path map)
    Tree,
    /// History node
    Commit,
}

impl ObjectType {
    /// One-byte storage tag for this type
    pub fn tag(&self) -> u8 {
        match self {
            ObjectType::Blob => b'b',
            ObjectType::Tree => b't',
            ObjectType::Commit => b'c',
        }
    }

    /// Decode a storage tag back into a type
    pub fn from_tag(tag: u8) -> anyhow::Result<Self> {
        match tag {
            b'b' => Ok(ObjectType::Blob),
            b't' => Ok(ObjectType::Tree),
            b'c' => Ok(ObjectType::Commit),
            other => anyhow::bail!("unknown object type tag: {:#04x}", other),
        }
    }

    /// Human-readable type name
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Blob => "blob",
            ObjectType::Tree => "tree",
            ObjectType::Commit => "commit",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
