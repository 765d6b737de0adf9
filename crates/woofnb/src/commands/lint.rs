//! `woof lint`: structural and policy checks, no execution.

use std::path::Path;

use anyhow::Result;

use crate::message::{json_lines, text, OutputFormat};
use crate::orchestrator::ExitStatus;

pub fn run(path: &Path, format: OutputFormat) -> Result<ExitStatus> {
    let notebook = super::read_notebook(path)?;
    let diagnostics = crate::linter::lint(&notebook);

    match format {
        OutputFormat::Text => text::print_diagnostics(&diagnostics),
        OutputFormat::Json => json_lines::print_diagnostics(&diagnostics),
    }

    Ok(if diagnostics.has_errors() {
        ExitStatus::LintFailed
    } else {
        ExitStatus::Success
    })
}
