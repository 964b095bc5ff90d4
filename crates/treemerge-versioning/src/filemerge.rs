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

//! Three-way line merge for file contents
//!
//! Uses the `diffy` crate to merge an ancestor, "ours", and "theirs"
//! version of a file. The status protocol follows the classic engine:
//! negative for internal failure, zero for a clean merge, positive for the
//! number of conflict hunks left in the output.
//!
//! The zealous-alnum option collapses conflict hunks whose two sides are
//! equal once every non-alphanumeric byte is discarded, keeping "ours" for
//! the collapsed region.

use tracing::{debug, trace};

/// Labels spliced into conflict markers
#[derive(Debug, Clone, Copy)]
pub struct MergeLabels<'a> {
    /// Label for the ancestor version
    pub orig: &'a str,
    /// Label for the current branch's version
    pub ours: &'a str,
    /// Label for the incoming version
    pub theirs: &'a str,
}

impl Default for MergeLabels<'static> {
    fn default() -> Self {
        MergeLabels {
            orig: "orig",
            ours: "our",
            theirs: "their",
        }
    }
}

/// Options for the file-level merge
#[derive(Debug, Clone, Copy, Default)]
pub struct FileMergeOptions {
    /// Collapse conflict hunks that differ only in non-alphanumeric bytes
    pub zealous_alnum: bool,
}

/// Merge three versions of a file.
///
/// Returns the merged bytes and a status: `< 0` internal failure, `0`
/// clean, `> 0` the number of conflict hunks embedded in the output.
pub fn three_way_file_merge(
    orig: &[u8],
    ours: &[u8],
    theirs: &[u8],
    labels: MergeLabels<'_>,
    opts: FileMergeOptions,
) -> (Vec<u8>, i32) {
    match diffy::MergeOptions::new().merge_bytes(orig, ours, theirs) {
        Ok(merged) => {
            trace!(bytes = merged.len(), "clean file merge");
            (merged, 0)
        }
        Err(conflicted) => {
            let (merged, hunks) = rewrite_conflicts(&conflicted, labels, opts.zealous_alnum);
            debug!(hunks, "file merge left conflicts");
            (merged, hunks as i32)
        }
    }
}

/// One parsed region of conflicted merge output
enum Region<'a> {
    Common(&'a [u8]),
    Conflict {
        ours: Vec<&'a [u8]>,
        base: Vec<&'a [u8]>,
        theirs: Vec<&'a [u8]>,
    },
}

/// Walk the conflict markers in `data`, collapsing zealously-equal hunks
/// and relabeling the markers that remain. Returns the rewritten bytes
/// and the number of surviving hunks.
fn rewrite_conflicts(
    data: &[u8],
    labels: MergeLabels<'_>,
    zealous: bool,
) -> (Vec<u8>, usize) {
    let regions = parse_regions(data);

    let mut out = Vec::with_capacity(data.len());
    let mut hunks = 0;

    for region in regions {
        match region {
            Region::Common(line) => out.extend_from_slice(line),
            Region::Conflict { ours, base, theirs } => {
                if zealous && alnum_eq(&ours, &theirs) {
                    for line in &ours {
                        out.extend_from_slice(line);
                    }
                    continue;
                }

                hunks += 1;
                out.extend_from_slice(format!("<<<<<<< {}\n", labels.ours).as_bytes());
                for line in &ours {
                    out.extend_from_slice(line);
                }
                if !base.is_empty() {
                    out.extend_from_slice(format!("||||||| {}\n", labels.orig).as_bytes());
                    for line in &base {
                        out.extend_from_slice(line);
                    }
                }
                out.extend_from_slice(b"=======\n");
                for line in &theirs {
                    out.extend_from_slice(line);
                }
                out.extend_from_slice(format!(">>>>>>> {}\n", labels.theirs).as_bytes());
            }
        }
    }

    (out, hunks)
}

fn parse_regions(data: &[u8]) -> Vec<Region<'_>> {
    #[derive(PartialEq)]
    enum State {
        Common,
        Ours,
        Base,
        Theirs,
    }

    let mut regions = Vec::new();
    let mut state = State::Common;
    let mut ours = Vec::new();
    let mut base = Vec::new();
    let mut theirs = Vec::new();

    for line in split_lines(data) {
        let body = trim_eol(line);
        match state {
            State::Common if body.starts_with(b"<<<<<<<") => state = State::Ours,
            State::Common => regions.push(Region::Common(line)),
            State::Ours if body.starts_with(b"|||||||") => state = State::Base,
            State::Ours if body == b"=======" => state = State::Theirs,
            State::Ours => ours.push(line),
            State::Base if body == b"=======" => state = State::Theirs,
            State::Base => base.push(line),
            State::Theirs if body.starts_with(b">>>>>>>") => {
                regions.push(Region::Conflict {
                    ours: std::mem::take(&mut ours),
                    base: std::mem::take(&mut base),
                    theirs: std::mem::take(&mut theirs),
                });
                state = State::Common;
            }
            State::Theirs => theirs.push(line),
        }
    }

    // Unterminated hunk: keep what we have rather than dropping lines.
    if state != State::Common {
        regions.push(Region::Conflict { ours, base, theirs });
    }

    regions
}

fn split_lines(data: &[u8]) -> impl Iterator<Item = &[u8]> {
    let mut rest = data;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let end = rest
            .iter()
            .position(|&b| b == b'\n')
            .map(|i| i + 1)
            .unwrap_or(rest.len());
        let (line, tail) = rest.split_at(end);
        rest = tail;
        Some(line)
    })
}

fn trim_eol(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Compare two line blocks keeping only ASCII alphanumeric bytes
fn alnum_eq(ours: &[&[u8]], theirs: &[&[u8]]) -> bool {
    let filter = |lines: &[&[u8]]| -> Vec<u8> {
        lines
            .iter()
            .flat_map(|l| l.iter())
            .copied()
            .filter(u8::is_ascii_alphanumeric)
            .collect()
    };
    filter(ours) == filter(theirs)
}
