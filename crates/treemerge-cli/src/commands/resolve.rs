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
use treemerge_versioning::{resolve, Reporter, Tree};

/// Resolve two heads using an enhanced multi-base merge
///
/// Merge bases come ahead of `--`, the head and the single remote after
/// it. Arguments naming the empty tree are skipped. A merge with no bases
/// or with more than one remote cannot be attempted (exit 2).
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:
    # Two-head merge with one base
    treemerge resolve <base> -- <head> <remote>

SEE ALSO:
    treemerge-octopus(1)")]
pub struct ResolveCmd {
    /// Merge bases
    #[arg(value_name = "BASE")]
    pub bases: Vec<String>,

    /// Head and remote, separated from the bases by `--`
    #[arg(last = true, value_name = "HEAD/REMOTE", required = true)]
    pub heads: Vec<String>,
}

impl ResolveCmd {
    pub fn execute(&self, quiet: bool, repository: Option<&str>) -> Result<i32> {
        if self.heads.len() < 2 {
            bail!("usage: treemerge resolve <bases>... -- <head> <remote>");
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

        let mut remote = None;
        for arg in &self.heads[1..] {
            let oid = parse_oid(arg)?;
            if oid == empty_tree {
                continue;
            }
            if remote.is_some() {
                // Two or more remotes: not handling octopus here.
                return Ok(2);
            }
            remote = Some(lookup_commit(&repo, arg)?);
        }

        // Give up if this is a baseless merge.
        if self.bases.is_empty() {
            return Ok(2);
        }

        let reporter = Reporter::new(quiet);
        resolve(&repo, &reporter, &bases, Some(&head), remote.as_ref())
    }
}
