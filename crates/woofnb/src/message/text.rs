//! Human-readable emitter, colorized the way `woof`'s own log lines are.

use colored::Colorize;

use crate::diagnostics::{Diagnostics, Severity};
use crate::model::Output;
use crate::orchestrator::{CellStatus, RunReport};

pub fn print_diagnostics(diagnostics: &Diagnostics) {
    for diagnostic in diagnostics.iter() {
        let label = match diagnostic.severity {
            Severity::Error => "error".red().bold(),
            Severity::Warning => "warning".yellow().bold(),
        };
        match &diagnostic.cell_id {
            Some(id) => println!(
                "{label} [{}] {}: {}",
                diagnostic.code,
                id.cyan(),
                diagnostic.message
            ),
            None => println!("{label} [{}]: {}", diagnostic.code, diagnostic.message),
        }
    }
    if diagnostics.is_empty() {
        println!("{}", "no issues found".green());
    }
}

pub fn print_run_report(report: &RunReport) {
    for result in &report.results {
        let status = match result.status {
            CellStatus::Success => result.status.as_str().green(),
            CellStatus::Replayed => result.status.as_str().blue(),
            CellStatus::FailedDeterministic | CellStatus::FailedExhausted => {
                result.status.as_str().red()
            }
            CellStatus::Blocked => result.status.as_str().yellow(),
        };
        println!(
            "{} {} ({} ms)",
            status,
            result.cell_id.cyan(),
            result.elapsed_ms
        );
        for output in &result.outputs {
            print_output(output);
        }
    }
}

fn print_output(output: &Output) {
    match output {
        Output::Stream { text, .. } => {
            for line in text.lines() {
                println!("  {line}");
            }
        }
        Output::ExecuteResult { repr } => println!("  {} {repr}", "=>".dimmed()),
        Output::DisplayData { .. } => println!("  {}", "<display data>".dimmed()),
        Output::Error { ename, evalue, .. } => {
            println!("  {} {ename}: {evalue}", "error:".red().bold());
        }
    }
}
