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

//! Progress and error reporting for the merge drivers
//!
//! Message text and ordering are part of the driver contract, so they go
//! through this thin wrapper rather than the tracing layer: one progress
//! line per path on stdout, errors on stderr with an `error: ` prefix.

use std::fmt::Display;

/// Reporter for user-visible merge output
#[derive(Debug, Clone, Copy, Default)]
pub struct Reporter {
    quiet: bool,
}

impl Reporter {
    /// Create a reporter; `quiet` suppresses progress lines
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    /// Whether progress output is suppressed
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Emit a progress line to stdout
    pub fn progress(&self, msg: impl Display) {
        if !self.quiet {
            println!("{msg}");
        }
    }

    /// Emit an error line to stderr
    pub fn error(&self, msg: impl Display) {
        eprintln!("error: {msg}");
    }
}
