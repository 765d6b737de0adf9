//! Command-line surface, kept thin: each subcommand's real work lives in
//! [`crate::commands`].

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::message::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "woof", version, about = "WOOFNB notebook toolchain")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Logging verbosity: -v for debug, -vv for trace.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all log output below warnings.
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Rewrite a notebook into canonical form.
    Fmt {
        path: PathBuf,
        /// Exit nonzero instead of writing if the file isn't canonical.
        #[arg(long)]
        check: bool,
    },
    /// Run structural and policy checks without executing anything.
    Lint {
        path: PathBuf,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Print the planned execution order.
    Graph { path: PathBuf },
    /// Execute a notebook's cells.
    Run {
        path: PathBuf,
        /// Restrict execution to these cell ids (plus their dependencies).
        selectors: Vec<String>,
        /// With a selector set, skip pulling in transitive dependencies.
        #[arg(long)]
        no_deps: bool,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Run a notebook's `test`-typed cells.
    Test { path: PathBuf },
    /// Remove cached results.
    Clean {
        path: PathBuf,
        /// Remove every notebook's cache, not just this one's.
        #[arg(long)]
        all: bool,
    },
}
