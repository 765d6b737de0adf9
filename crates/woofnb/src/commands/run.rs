//! `woof run`: execute the notebook end to end.

use std::path::Path;

use anyhow::{Context, Result};

use crate::commands::sidecar_path_for;
use crate::message::{json_lines, text, OutputFormat};
use crate::orchestrator::{self, ExitStatus, OrchestratorError, RunOptions};

pub struct Options {
    pub selectors: Vec<String>,
    pub no_deps: bool,
    pub format: OutputFormat,
}

pub fn run(path: &Path, opts: &Options, runner_version: &str) -> Result<ExitStatus> {
    let notebook = super::read_notebook(path)?;
    let sidecar_path = sidecar_path_for(path);

    let run_opts = RunOptions {
        notebook_path: path,
        runner_version: runner_version.to_string(),
        sidecar_path: Some(&sidecar_path),
        selectors: &opts.selectors,
        no_deps: opts.no_deps,
    };

    let report = match orchestrator::run(&notebook, &run_opts) {
        Ok(report) => report,
        Err(OrchestratorError::Lint(diagnostics)) => {
            match opts.format {
                OutputFormat::Text => text::print_diagnostics(&diagnostics),
                OutputFormat::Json => json_lines::print_diagnostics(&diagnostics),
            }
            return Ok(ExitStatus::LintFailed);
        }
        Err(e @ OrchestratorError::Plan(_)) => {
            return Err(anyhow::anyhow!(e.to_string()))
                .with_context(|| format!("failed to run `{}`", path.display()));
        }
        Err(OrchestratorError::Io(e)) => {
            return Err(e).with_context(|| format!("failed to run `{}`", path.display()));
        }
    };

    match opts.format {
        OutputFormat::Text => text::print_run_report(&report),
        OutputFormat::Json => json_lines::print_run_report(&report),
    }

    Ok(if report.failed() {
        ExitStatus::RunFailed
    } else {
        ExitStatus::Success
    })
}
