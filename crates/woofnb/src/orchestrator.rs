//! Drives a full `woof run`: parse, lint, plan, then execute the plan
//! cell-by-cell through policy, cache, the runner, and the sidecar.
//!
//! Under `execution.order=graph`, a cell whose dependency failed or was
//! blocked is itself never attempted — its status becomes `BLOCKED` (reason
//! `UpstreamFailed`), and that blocks its own dependents in turn, all the
//! way down the plan, while unrelated siblings still run. Under
//! `execution.order=linear` a failing cell instead stops every subsequent
//! cell in the plan, related or not. Either way a run never aborts
//! partway through; it always finishes walking the plan and reports the
//! terminal status of every scheduled cell.

use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};

use log::{info, warn};

use crate::cache::{self, Cache};
use crate::diagnostics::Diagnostics;
use crate::error::ExecErrorName;
use crate::model::{CacheEntry, CacheMode, ExecutionOrder, Notebook, Output};
use crate::planner::{self, Plan};
use crate::policy;
use crate::runner::{self, Session};
use crate::sidecar::{Sidecar, SidecarRecord};

/// Terminal cell states from the state machine in §4.7: every attempted
/// cell ends in exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellStatus {
    Success,
    FailedDeterministic,
    FailedExhausted,
    Blocked,
    Replayed,
}

impl CellStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CellStatus::Success => "SUCCESS",
            CellStatus::FailedDeterministic => "FAILED-DETERMINISTIC",
            CellStatus::FailedExhausted => "FAILED-EXHAUSTED",
            CellStatus::Blocked => "BLOCKED",
            CellStatus::Replayed => "REPLAYED",
        }
    }

    /// Whether this status counts as a success for `run`/`test`'s exit code
    /// (§6: exit 0 iff every attempted cell ended SUCCESS or REPLAYED).
    #[must_use]
    pub fn is_ok_for_exit(self) -> bool {
        matches!(self, CellStatus::Success | CellStatus::Replayed)
    }
}

#[derive(Debug, Clone)]
pub struct CellResult {
    pub cell_id: String,
    pub status: CellStatus,
    pub outputs: Vec<Output>,
    pub elapsed_ms: u64,
}

/// Stand-in for "no timeout" (§4.7: `timeout_sec` → header default → none):
/// long enough that no real cell body could legitimately run that long, so
/// `run_process`'s poll loop still terminates a genuinely hung process
/// eventually rather than looping forever on an unbounded `Duration`.
const NO_TIMEOUT: Duration = Duration::from_secs(365 * 24 * 3600);

#[derive(Debug, Clone)]
pub struct RunReport {
    pub results: Vec<CellResult>,
}

impl RunReport {
    /// Exit code of `run`/`test` is 0 only if every scheduled cell ended
    /// SUCCESS or REPLAYED (§6/§7).
    #[must_use]
    pub fn failed(&self) -> bool {
        !self.results.iter().all(|r| r.status.is_ok_for_exit())
    }
}

pub struct RunOptions<'a> {
    pub notebook_path: &'a Path,
    pub runner_version: String,
    pub sidecar_path: Option<&'a Path>,
    pub selectors: &'a [String],
    pub no_deps: bool,
}

/// Lints `notebook`, bails with the diagnostics on any error-severity
/// finding, builds a plan (optionally narrowed to `opts.selectors`), then
/// executes it cell by cell.
///
/// # Errors
/// Returns the lint diagnostics if linting found any error, or a plan error
/// if the notebook's `execution.order` can't produce a valid schedule.
pub fn run(notebook: &Notebook, opts: &RunOptions<'_>) -> Result<RunReport, OrchestratorError> {
    let diagnostics = crate::linter::lint(notebook);
    if diagnostics.has_errors() {
        return Err(OrchestratorError::Lint(diagnostics));
    }

    let base_plan = planner::plan(notebook).map_err(OrchestratorError::Plan)?;
    let plan = if opts.selectors.is_empty() {
        base_plan
    } else {
        planner::select(&base_plan, notebook, opts.selectors, opts.no_deps)
    };

    let cache_dir = cache::resolve_dir(opts.notebook_path);
    let cell_cache = Cache::new(cache_dir);
    let mut sidecar = opts
        .sidecar_path
        .map(Sidecar::create)
        .transpose()
        .map_err(OrchestratorError::Io)?;

    let linear = notebook.header.view.execution.order == ExecutionOrder::Linear;
    let mut sessions: HashMap<String, Session> = HashMap::new();
    let mut blocked: std::collections::HashSet<String> = std::collections::HashSet::new();
    let mut fail_stop = false;
    let mut results = Vec::with_capacity(plan.order.len());

    for cell_id in &plan.order {
        let cell = notebook.cell(cell_id).expect("plan only lists known cells");

        if fail_stop {
            warn!("skipping `{cell_id}`: a prior cell failed under linear order");
            blocked.insert(cell_id.clone());
            let result = CellResult {
                cell_id: cell_id.clone(),
                status: CellStatus::Blocked,
                outputs: vec![],
                elapsed_ms: 0,
            };
            append_sidecar(sidecar.as_mut(), &result);
            results.push(result);
            continue;
        }

        if cell.deps.iter().any(|d| blocked.contains(d)) {
            warn!("skipping `{cell_id}`: a dependency was blocked (UpstreamFailed)");
            blocked.insert(cell_id.clone());
            let result = CellResult {
                cell_id: cell_id.clone(),
                status: CellStatus::Blocked,
                outputs: vec![],
                elapsed_ms: 0,
            };
            append_sidecar(sidecar.as_mut(), &result);
            results.push(result);
            continue;
        }

        let lang = cell.effective_lang(notebook.language()).to_string();

        if let Err((name, message)) = policy::check(cell, &notebook.header.view.io_policy) {
            warn!("`{cell_id}` denied by policy: {message}");
            blocked.insert(cell_id.clone());
            fail_stop |= linear;
            let result = CellResult {
                cell_id: cell_id.clone(),
                status: CellStatus::Blocked,
                outputs: vec![Output::error(name.as_str(), message)],
                elapsed_ms: 0,
            };
            append_sidecar(sidecar.as_mut(), &result);
            results.push(result);
            continue;
        }

        let digest = cache::digest(notebook, cell, &opts.runner_version);

        let use_cache = notebook.header.view.execution.cache == CacheMode::ContentHash;
        if use_cache {
            if let Some(entry) = cell_cache.get(cell_id, &digest) {
                info!("`{cell_id}` served from cache");
                let result = CellResult {
                    cell_id: cell_id.clone(),
                    status: CellStatus::Replayed,
                    outputs: entry.outputs,
                    elapsed_ms: entry.elapsed_ms,
                };
                append_sidecar(sidecar.as_mut(), &result);
                results.push(result);
                continue;
            }
        }

        let session = sessions
            .entry(lang.clone())
            .or_insert_with(|| Session::new(lang.clone()));

        let timeout_sec = cell
            .timeout_sec
            .or(notebook.header.view.defaults.timeout_sec);
        let timeout = timeout_sec.map_or(NO_TIMEOUT, Duration::from_secs);
        let started = Instant::now();
        let outcome = runner::run_cell(session, cell, &lang, timeout);
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let (status, outputs) = match outcome {
            Ok(outputs) => {
                if outputs.iter().any(|o| matches!(o, Output::Error { .. })) {
                    blocked.insert(cell_id.clone());
                    (CellStatus::FailedDeterministic, outputs)
                } else {
                    (CellStatus::Success, outputs)
                }
            }
            Err((name, message)) => {
                blocked.insert(cell_id.clone());
                let status = if name.is_transient() {
                    CellStatus::FailedExhausted
                } else {
                    CellStatus::FailedDeterministic
                };
                (status, vec![Output::error(name.as_str(), message)])
            }
        };
        fail_stop |= linear && !status.is_ok_for_exit();

        if use_cache && status == CellStatus::Success {
            let entry = CacheEntry {
                key: digest,
                cell_id: cell_id.clone(),
                outputs: outputs.clone(),
                elapsed_ms,
                runner_version: opts.runner_version.clone(),
            };
            let _ = cell_cache.put(&entry);
        }

        let result = CellResult {
            cell_id: cell_id.clone(),
            status,
            outputs,
            elapsed_ms,
        };
        append_sidecar(sidecar.as_mut(), &result);
        results.push(result);
    }

    Ok(RunReport { results })
}

fn append_sidecar(sidecar: Option<&mut Sidecar>, result: &CellResult) {
    let Some(sidecar) = sidecar else { return };
    let record = SidecarRecord {
        cell: result.cell_id.clone(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        elapsed_ms: result.elapsed_ms,
        status: result.status.as_str().to_string(),
        outputs: result.outputs.clone(),
    };
    let _ = sidecar.append(&record);
}

#[derive(Debug)]
pub enum OrchestratorError {
    Lint(Diagnostics),
    Plan(crate::planner::PlanError),
    Io(std::io::Error),
}

impl std::fmt::Display for OrchestratorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrchestratorError::Lint(diags) => write!(f, "{} lint error(s) found", diags.len()),
            OrchestratorError::Plan(e) => write!(f, "{e}"),
            OrchestratorError::Io(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for OrchestratorError {}

/// Process exit codes for the CLI's subcommands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    LintFailed,
    RunFailed,
    UsageError,
}

impl ExitStatus {
    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::LintFailed => 1,
            ExitStatus::RunFailed => 2,
            ExitStatus::UsageError => 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn opts<'a>(path: &'a Path, selectors: &'a [String]) -> RunOptions<'a> {
        RunOptions {
            notebook_path: path,
            runner_version: "1.0.0".to_string(),
            sidecar_path: None,
            selectors,
            no_deps: false,
        }
    }

    #[test]
    fn runs_a_simple_bash_pipeline() {
        let src = "%WOOFNB 1.0\nname: rt\nlanguage: bash\nio_policy:\n  allow_shell: true\n```cell id=a type=bash\necho hi\n```\n";
        let nb = parse(src).unwrap();
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nb.woofnb");
        std::env::set_var("WOOF_CACHE_DIR", tmp.path().join("cache"));
        let report = run(&nb, &opts(&path, &[])).unwrap();
        std::env::remove_var("WOOF_CACHE_DIR");
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].status, CellStatus::Success);
        assert!(!report.failed());
    }

    #[test]
    fn an_empty_body_cell_is_a_no_op_success() {
        let src = "%WOOFNB 1.0\nname: rt\nlanguage: bash\nio_policy:\n  allow_shell: true\n```cell id=a type=bash\n```\n";
        let nb = parse(src).unwrap();
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nb.woofnb");
        std::env::set_var("WOOF_CACHE_DIR", tmp.path().join("cache"));
        let report = run(&nb, &opts(&path, &[])).unwrap();
        std::env::remove_var("WOOF_CACHE_DIR");
        assert_eq!(report.results[0].status, CellStatus::Success);
        assert!(report.results[0].outputs.is_empty());
    }

    #[test]
    fn lint_errors_abort_before_any_execution() {
        let src = "%WOOFNB 1.0\nname: rt\nlanguage: python\n```cell id=a type=code deps=ghost\n1\n```\n";
        let nb = parse(src).unwrap();
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nb.woofnb");
        let err = run(&nb, &opts(&path, &[])).unwrap_err();
        assert!(matches!(err, OrchestratorError::Lint(_)));
    }

    #[test]
    fn dependents_of_a_policy_denial_are_blocked() {
        let src = "%WOOFNB 1.0\nname: rt\nlanguage: bash\n```cell id=a type=bash\necho hi\n```\n```cell id=b type=code deps=a\n1\n```\n";
        let nb = parse(src).unwrap();
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nb.woofnb");
        std::env::set_var("WOOF_CACHE_DIR", tmp.path().join("cache"));
        let report = run(&nb, &opts(&path, &[])).unwrap();
        std::env::remove_var("WOOF_CACHE_DIR");
        assert_eq!(report.results[0].status, CellStatus::Blocked);
        assert!(report.results[0].outputs.iter().any(
            |o| matches!(o, Output::Error { ename, .. } if ename == "PolicyDenied")
        ));
        assert_eq!(report.results[1].status, CellStatus::Blocked);
        assert!(report.failed());
    }

    #[test]
    fn a_failing_cell_under_linear_order_stops_an_unrelated_sibling() {
        let src = "%WOOFNB 1.0\nname: rt\nlanguage: bash\nio_policy:\n  allow_shell: true\n```cell id=a type=bash\nexit 1\n```\n```cell id=b type=code\n1\n```\n";
        let nb = parse(src).unwrap();
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nb.woofnb");
        std::env::set_var("WOOF_CACHE_DIR", tmp.path().join("cache"));
        let report = run(&nb, &opts(&path, &[])).unwrap();
        std::env::remove_var("WOOF_CACHE_DIR");
        assert_eq!(report.results[0].status, CellStatus::FailedDeterministic);
        assert_eq!(report.results[1].status, CellStatus::Blocked);
        assert!(report.results[1].outputs.is_empty());
        assert!(report.failed());
    }

    #[test]
    fn a_failing_cell_under_graph_order_does_not_stop_an_unrelated_sibling() {
        let src = "%WOOFNB 1.0\nname: rt\nlanguage: bash\nexecution:\n  order: graph\nio_policy:\n  allow_shell: true\n```cell id=a type=bash\nexit 1\n```\n```cell id=b type=code\n1\n```\n";
        let nb = parse(src).unwrap();
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nb.woofnb");
        std::env::set_var("WOOF_CACHE_DIR", tmp.path().join("cache"));
        let report = run(&nb, &opts(&path, &[])).unwrap();
        std::env::remove_var("WOOF_CACHE_DIR");
        assert_eq!(report.results[0].status, CellStatus::FailedDeterministic);
        assert_eq!(report.results[1].status, CellStatus::Success);
        assert!(report.failed());
    }

    #[test]
    fn a_cached_hit_is_replayed_without_invoking_the_runner() {
        let src = "%WOOFNB 1.0\nname: rt\nlanguage: bash\nexecution:\n  cache: content-hash\nio_policy:\n  allow_shell: true\n```cell id=a type=bash\necho hi\n```\n";
        let nb = parse(src).unwrap();
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nb.woofnb");
        std::env::set_var("WOOF_CACHE_DIR", tmp.path().join("cache"));
        let first = run(&nb, &opts(&path, &[])).unwrap();
        assert_eq!(first.results[0].status, CellStatus::Success);
        let second = run(&nb, &opts(&path, &[])).unwrap();
        std::env::remove_var("WOOF_CACHE_DIR");
        assert_eq!(second.results[0].status, CellStatus::Replayed);
        assert!(!second.failed());
    }

    #[test]
    fn header_default_timeout_applies_when_a_cell_sets_none() {
        let src = "%WOOFNB 1.0\nname: rt\nlanguage: bash\ndefaults:\n  timeout_sec: 1\nio_policy:\n  allow_shell: true\n```cell id=a type=bash\nsleep 5\n```\n";
        let nb = parse(src).unwrap();
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nb.woofnb");
        std::env::set_var("WOOF_CACHE_DIR", tmp.path().join("cache"));
        let report = run(&nb, &opts(&path, &[])).unwrap();
        std::env::remove_var("WOOF_CACHE_DIR");
        assert_eq!(report.results[0].status, CellStatus::FailedExhausted);
        assert!(report.results[0].outputs.iter().any(
            |o| matches!(o, Output::Error { ename, .. } if ename == "Timeout")
        ));
    }

    #[test]
    fn sidecar_records_use_spec_status_strings() {
        let src = "%WOOFNB 1.0\nname: rt\nlanguage: bash\nio_policy:\n  allow_shell: true\n```cell id=a type=bash\necho hi\n```\n";
        let nb = parse(src).unwrap();
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nb.woofnb");
        let sidecar_path = tmp.path().join("nb.woofnb.out");
        std::env::set_var("WOOF_CACHE_DIR", tmp.path().join("cache"));
        let run_opts = RunOptions {
            notebook_path: &path,
            runner_version: "1.0.0".to_string(),
            sidecar_path: Some(&sidecar_path),
            selectors: &[],
            no_deps: false,
        };
        run(&nb, &run_opts).unwrap();
        std::env::remove_var("WOOF_CACHE_DIR");
        let contents = std::fs::read_to_string(&sidecar_path).unwrap();
        let line: serde_json::Value = serde_json::from_str(contents.lines().next().unwrap()).unwrap();
        assert_eq!(line["cell"], "a");
        assert_eq!(line["status"], "SUCCESS");
        assert!(line["timestamp"].is_string());
    }
}
