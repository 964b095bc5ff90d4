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

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{InitCmd, OctopusCmd, ResolveCmd};
use console::style;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "treemerge")]
#[command(version, about = "Tree-merge driver for content-addressed version control")]
#[command(
    long_about = "TreeMerge produces a merged index and working tree from a shared ancestor,\n\
an \"ours\" head, and one or more \"theirs\" heads, invoking three-way file\n\
content merging only where necessary."
)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Suppress progress output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Repository path
    #[arg(short = 'C', long, global = true, value_name = "PATH")]
    repository: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new TreeMerge repository
    Init(InitCmd),

    /// Resolve two heads using an enhanced multi-base merge
    Resolve(ResolveCmd),

    /// Merge two or more heads in one octopus pass
    Octopus(OctopusCmd),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> Result<i32> {
    match &cli.command {
        Commands::Init(cmd) => cmd.execute(cli.quiet),
        Commands::Resolve(cmd) => cmd.execute(cli.quiet, cli.repository.as_deref()),
        Commands::Octopus(cmd) => cmd.execute(cli.quiet, cli.repository.as_deref()),
    }
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let code = match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", style("fatal:").red().bold(), e);
            2
        }
    };
    std::process::exit(code);
}
