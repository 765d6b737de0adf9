//! `woof fmt`: rewrite a notebook into canonical form.

use std::path::Path;

use anyhow::{Context, Result};

use crate::orchestrator::ExitStatus;

pub struct Options {
    pub check: bool,
}

/// Formats the notebook at `path`. With `opts.check`, doesn't write: exits
/// [`ExitStatus::LintFailed`] if the file isn't already canonical.
pub fn run(path: &Path, opts: &Options) -> Result<ExitStatus> {
    let notebook = super::read_notebook(path)?;
    let formatted = crate::formatter::format(&notebook)
        .with_context(|| format!("failed to render canonical form of `{}`", path.display()))?;
    let current = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read `{}`", path.display()))?;

    if formatted == current {
        return Ok(ExitStatus::Success);
    }

    if opts.check {
        println!("{} is not formatted", path.display());
        return Ok(ExitStatus::LintFailed);
    }

    std::fs::write(path, &formatted)
        .with_context(|| format!("failed to write `{}`", path.display()))?;
    println!("formatted {}", path.display());
    Ok(ExitStatus::Success)
}
