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

mod init;
mod octopus;
mod resolve;

pub use init::InitCmd;
pub use octopus::OctopusCmd;
pub use resolve::ResolveCmd;

use anyhow::{Context, Result};
use treemerge_versioning::{Commit, Oid, Repository};

/// Open the repository named by `-C`, or discover it from the current
/// directory.
pub(crate) fn open_repo(repository: Option<&str>) -> Result<Repository> {
    match repository {
        Some(path) => Repository::discover(path),
        None => Repository::discover(std::env::current_dir()?),
    }
}

/// Resolve a commit-ish argument to an object id.
pub(crate) fn parse_oid(arg: &str) -> Result<Oid> {
    Oid::from_hex(arg).with_context(|| format!("invalid object id '{arg}'"))
}

/// Resolve an argument that must name a commit, or die.
pub(crate) fn lookup_commit(repo: &Repository, arg: &str) -> Result<Oid> {
    let oid = parse_oid(arg)?;
    Commit::read(&repo.odb, &oid).with_context(|| format!("'{arg}' does not name a commit"))?;
    Ok(oid)
}
