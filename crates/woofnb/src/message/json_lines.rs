//! Machine-readable emitter: one JSON object per line, so a caller can
//! stream and parse results incrementally instead of waiting for the whole
//! run to finish.

use serde::Serialize;

use crate::diagnostics::Diagnostics;
use crate::orchestrator::RunReport;

#[derive(Serialize)]
struct DiagnosticLine<'a> {
    severity: &'a str,
    code: &'a str,
    message: &'a str,
    cell_id: Option<&'a str>,
}

pub fn print_diagnostics(diagnostics: &Diagnostics) {
    for diagnostic in diagnostics.iter() {
        let line = DiagnosticLine {
            severity: match diagnostic.severity {
                crate::diagnostics::Severity::Error => "error",
                crate::diagnostics::Severity::Warning => "warning",
            },
            code: diagnostic.code.as_str(),
            message: &diagnostic.message,
            cell_id: diagnostic.cell_id.as_deref(),
        };
        if let Ok(json) = serde_json::to_string(&line) {
            println!("{json}");
        }
    }
}

#[derive(Serialize)]
struct ResultLine<'a> {
    cell_id: &'a str,
    status: &'a str,
    elapsed_ms: u64,
    outputs: &'a [crate::model::Output],
}

pub fn print_run_report(report: &RunReport) {
    for result in &report.results {
        let line = ResultLine {
            cell_id: &result.cell_id,
            status: result.status.as_str(),
            elapsed_ms: result.elapsed_ms,
            outputs: &result.outputs,
        };
        if let Ok(json) = serde_json::to_string(&line) {
            println!("{json}");
        }
    }
}
