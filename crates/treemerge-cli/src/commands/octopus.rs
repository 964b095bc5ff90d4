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

use super::{lookup_commit, open_repo, parse_oid};
use anyhow::{bail, Result};
use clap::Parser;
use treemerge_versioning::{octopus, Reporter, Tree};

/// Merge two or more heads in one octopus pass
///
/// Merge bases come ahead of `--`, the head and the remotes after it.
/// Arguments naming the empty tree are skipped. Fewer than two remotes is
/// not an octopus (exit 2; use resolve instead).
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:
    # Merge three heads at once
    treemerge octopus <base> -- <head> <remote1> <remote2>

SEE ALSO:
    treemerge-resolve(1)")]
pub struct OctopusCmd {
    /// Merge bases
    #[arg(value_name = "BASE")]
    pub bases: Vec<String>,

    /// Head and remotes, separated from the bases by `--`
    #[arg(last = true, value_name = "HEAD/REMOTES", required = true)]
    pub heads: Vec<String>,
}

impl OctopusCmd {
    pub fn execute(&self, quiet: bool, repository: Option<&str>) -> Result<i32> {
        if self.heads.len() < 2 {
            bail!("usage: treemerge octopus [<bases>...] -- <head> <remote1> <remote2> [<remotes>...]");
        }

        let repo = open_repo(repository)?;
        let empty_tree = Tree::empty_id();

        let mut bases = Vec::new();
        for arg in &self.bases {
            let oid = parse_oid(arg)?;
            if oid != empty_tree {
                bases.push(lookup_commit(&repo, arg)?);
            }
        }

        let head = parse_oid(&self.heads[0])?;

        let mut remotes = Vec::new();
        for arg in &self.heads[1..] {
            let oid = parse_oid(arg)?;
            if oid != empty_tree {
                remotes.push(lookup_commit(&repo, arg)?);
            }
        }

        // Reject if this is not an octopus; resolve should be used
        // instead.
        if remotes.len() < 2 {
            return Ok(2);
        }

        let reporter = Reporter::new(quiet);
        octopus(&repo, &reporter, &bases, &head, &remotes)
    }
}
