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

use anyhow::Result;
use clap::Parser;
use treemerge_versioning::Repository;

/// Initialize a new TreeMerge repository
///
/// Creates the state directory with an empty object store and index.
#[derive(Parser, Debug)]
pub struct InitCmd {
    /// Directory to initialize
    #[arg(value_name = "PATH", default_value = ".")]
    pub path: String,
}

impl InitCmd {
    pub fn execute(&self, quiet: bool) -> Result<i32> {
        let repo = Repository::init(&self.path)?;
        if !quiet {
            println!(
                "Initialized empty treemerge repository in {}",
                repo.state_dir().display()
            );
        }
        Ok(0)
    }
}
