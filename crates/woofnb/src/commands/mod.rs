//! One module per CLI subcommand. Each command reads the notebook, calls
//! into the library, and maps the result to an [`crate::orchestrator::ExitStatus`].

pub mod clean;
pub mod fmt;
pub mod graph;
pub mod lint;
pub mod run;

use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::model::Notebook;

/// Reads and parses the notebook at `path`, wrapping any I/O or parse
/// failure with the path for context.
pub fn read_notebook(path: &Path) -> Result<Notebook> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("failed to read `{}`", path.display()))?;
    crate::parser::parse(&source)
        .with_context(|| format!("failed to parse `{}`", path.display()))
}

/// The sidecar path for a notebook: sibling of the source file, suffix
/// `.woofnb.out`. Always used for `run`/`test`/`clean` — there is no flag
/// to redirect or suppress it.
#[must_use]
pub fn sidecar_path_for(notebook_path: &Path) -> PathBuf {
    let mut name = notebook_path
        .file_name()
        .map_or_else(|| OsString::from("notebook"), OsStr::to_os_string);
    name.push(".woofnb.out");
    notebook_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(name)
}
