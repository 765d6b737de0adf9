//! Structural and policy checks over a parsed [`Notebook`].
//!
//! Parse already rejects malformed syntax; the linter catches everything
//! that's syntactically fine but semantically broken — duplicate ids,
//! dangling deps, dependency cycles, policy/sidefx mismatches.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::diagnostics::{Diagnostic, Diagnostics, Severity};
use crate::error::LintCode;
use crate::model::{ExecutionOrder, Notebook, SideFx};

const ID_CHARS: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789._-";

fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| ID_CHARS.contains(c))
}

/// Runs every check below and returns the accumulated diagnostics.
/// Never errors: a notebook that fails every check still produces a full
/// [`Diagnostics`] report rather than aborting partway through.
#[must_use]
pub fn lint(notebook: &Notebook) -> Diagnostics {
    let mut diags = Diagnostics::new();

    check_ids(notebook, &mut diags);
    let known_ids = check_deps(notebook, &mut diags);
    if notebook.header.view.execution.order == ExecutionOrder::Graph {
        check_cycles(notebook, &mut diags);
    }
    check_policy(notebook, &mut diags);
    check_unknown_tokens(notebook, &mut diags);
    check_disabled_with_dependents(notebook, &known_ids, &mut diags);

    diags
}

fn check_ids(notebook: &Notebook, diags: &mut Diagnostics) {
    let mut seen = FxHashSet::default();
    for cell in &notebook.cells {
        if !is_valid_id(&cell.id) {
            diags.push(
                Diagnostic::new(
                    Severity::Error,
                    LintCode::BadCellId,
                    format!("cell id `{}` must match [A-Za-z0-9_-]+", cell.id),
                )
                .with_cell(cell.id.clone()),
            );
        }
        if !seen.insert(cell.id.clone()) {
            diags.push(
                Diagnostic::new(
                    Severity::Error,
                    LintCode::DuplicateCellId,
                    format!("cell id `{}` is used more than once", cell.id),
                )
                .with_cell(cell.id.clone()),
            );
        }
    }
}

fn check_deps(notebook: &Notebook, diags: &mut Diagnostics) -> FxHashSet<String> {
    let known: FxHashSet<String> = notebook.cells.iter().map(|c| c.id.clone()).collect();
    for cell in &notebook.cells {
        for dep in &cell.deps {
            if !known.contains(dep) {
                diags.push(
                    Diagnostic::new(
                        Severity::Error,
                        LintCode::MissingDep,
                        format!("cell `{}` depends on unknown cell `{dep}`", cell.id),
                    )
                    .with_cell(cell.id.clone()),
                );
            }
        }
    }
    known
}

/// Detects cycles with Tarjan's strongly-connected-components algorithm: any
/// SCC with more than one member, or a single node with a self-dependency,
/// is a cycle — scheduling requires a DAG.
fn check_cycles(notebook: &Notebook, diags: &mut Diagnostics) {
    let index_of: FxHashMap<&str, usize> = notebook
        .cells
        .iter()
        .enumerate()
        .map(|(i, c)| (c.id.as_str(), i))
        .collect();

    let adjacency: Vec<Vec<usize>> = notebook
        .cells
        .iter()
        .map(|cell| {
            cell.deps
                .iter()
                .filter_map(|d| index_of.get(d.as_str()).copied())
                .collect()
        })
        .collect();

    let n = notebook.cells.len();
    let mut index = vec![None; n];
    let mut lowlink = vec![0usize; n];
    let mut on_stack = vec![false; n];
    let mut stack = Vec::new();
    let mut counter = 0usize;
    let mut reported = FxHashSet::default();

    fn strongconnect(
        v: usize,
        adjacency: &[Vec<usize>],
        index: &mut [Option<usize>],
        lowlink: &mut [usize],
        on_stack: &mut [bool],
        stack: &mut Vec<usize>,
        counter: &mut usize,
        sccs: &mut Vec<Vec<usize>>,
    ) {
        index[v] = Some(*counter);
        lowlink[v] = *counter;
        *counter += 1;
        stack.push(v);
        on_stack[v] = true;

        for &w in &adjacency[v] {
            if index[w].is_none() {
                strongconnect(w, adjacency, index, lowlink, on_stack, stack, counter, sccs);
                lowlink[v] = lowlink[v].min(lowlink[w]);
            } else if on_stack[w] {
                lowlink[v] = lowlink[v].min(index[w].unwrap());
            }
        }

        if lowlink[v] == index[v].unwrap() {
            let mut scc = Vec::new();
            loop {
                let w = stack.pop().unwrap();
                on_stack[w] = false;
                scc.push(w);
                if w == v {
                    break;
                }
            }
            sccs.push(scc);
        }
    }

    let mut sccs = Vec::new();
    for v in 0..n {
        if index[v].is_none() {
            strongconnect(
                v,
                &adjacency,
                &mut index,
                &mut lowlink,
                &mut on_stack,
                &mut stack,
                &mut counter,
                &mut sccs,
            );
        }
    }

    for scc in sccs {
        let is_cycle = scc.len() > 1 || adjacency[scc[0]].contains(&scc[0]);
        if !is_cycle {
            continue;
        }
        let mut ids: Vec<&str> = scc.iter().map(|&i| notebook.cells[i].id.as_str()).collect();
        ids.sort_unstable();
        let key = ids.join(",");
        if !reported.insert(key) {
            continue;
        }
        diags.push(Diagnostic::new(
            Severity::Error,
            LintCode::Cycle,
            format!("dependency cycle among cells: {}", ids.join(", ")),
        ));
    }
}

/// Flags cells whose declared `sidefx` needs a capability the header's
/// `io_policy` doesn't grant, and bash cells that need `allow_shell`.
///
/// A capability mismatch is only a warning: execution re-checks the same
/// condition and fails closed (`PolicyDenied`) without ever invoking the
/// runner, so the notebook is still safe to run — this is the advance
/// notice, not the enforcement point. `sidefx=shell` declared on a
/// non-`bash` cell is different: that's a structural invariant violation
/// (§3), not a missing grant, and is an error.
fn check_policy(notebook: &Notebook, diags: &mut Diagnostics) {
    let policy = &notebook.header.view.io_policy;
    for cell in &notebook.cells {
        if cell.sidefx == SideFx::Shell && cell.cell_type != crate::model::CellType::Bash {
            diags.push(
                Diagnostic::new(
                    Severity::Error,
                    LintCode::PolicyConflict,
                    "sidefx=shell is only valid on type=bash cells",
                )
                .with_cell(cell.id.clone()),
            );
        }

        let needs_shell = cell.cell_type == crate::model::CellType::Bash
            || cell.sidefx == SideFx::Shell;
        let needs_fs = cell.sidefx == SideFx::Fs;
        let needs_net = cell.sidefx == SideFx::Net;

        if needs_shell && !policy.allow_shell {
            diags.push(
                Diagnostic::new(
                    Severity::Warning,
                    LintCode::PolicyConflict,
                    "requires `allow_shell` but the header does not grant it",
                )
                .with_cell(cell.id.clone()),
            );
        }
        if needs_fs && !policy.allow_files && !policy.allow_shell {
            diags.push(
                Diagnostic::new(
                    Severity::Warning,
                    LintCode::PolicyConflict,
                    "sidefx=fs requires `allow_files`",
                )
                .with_cell(cell.id.clone()),
            );
        }
        if needs_net && !policy.allow_network {
            diags.push(
                Diagnostic::new(
                    Severity::Warning,
                    LintCode::PolicyConflict,
                    "sidefx=net requires `allow_network`",
                )
                .with_cell(cell.id.clone()),
            );
        }
    }
}

fn check_unknown_tokens(notebook: &Notebook, diags: &mut Diagnostics) {
    for cell in &notebook.cells {
        for (key, _) in &cell.unknown_tokens {
            diags.push(
                Diagnostic::new(
                    Severity::Warning,
                    LintCode::UnknownToken,
                    format!("unrecognized cell-header token `{key}`"),
                )
                .with_cell(cell.id.clone()),
            );
        }
    }
}

fn check_disabled_with_dependents(
    notebook: &Notebook,
    known_ids: &FxHashSet<String>,
    diags: &mut Diagnostics,
) {
    let disabled: FxHashSet<&str> = notebook
        .cells
        .iter()
        .filter(|c| c.disabled)
        .map(|c| c.id.as_str())
        .collect();

    for cell in &notebook.cells {
        if cell.disabled {
            continue;
        }
        for dep in &cell.deps {
            if known_ids.contains(dep) && disabled.contains(dep.as_str()) {
                diags.push(
                    Diagnostic::new(
                        Severity::Warning,
                        LintCode::DisabledWithDependents,
                        format!("depends on disabled cell `{dep}`"),
                    )
                    .with_cell(cell.id.clone()),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::lint;
    use crate::parser::parse;

    fn notebook(src: &str) -> crate::model::Notebook {
        parse(src).unwrap()
    }

    #[test]
    fn clean_notebook_has_no_diagnostics() {
        let src = "%WOOFNB 1.0\nname: rt\nlanguage: python\n```cell id=a type=code\n1\n```\n";
        assert!(lint(&notebook(src)).is_empty());
    }

    #[test]
    fn duplicate_ids_flagged() {
        let src = "%WOOFNB 1.0\nname: rt\nlanguage: python\n```cell id=a type=code\n1\n```\n```cell id=a type=code\n2\n```\n";
        let diags = lint(&notebook(src));
        assert!(diags.iter().any(|d| d.code == crate::error::LintCode::DuplicateCellId));
    }

    #[test]
    fn missing_dep_flagged() {
        let src = "%WOOFNB 1.0\nname: rt\nlanguage: python\n```cell id=a type=code deps=ghost\n1\n```\n";
        let diags = lint(&notebook(src));
        assert!(diags.iter().any(|d| d.code == crate::error::LintCode::MissingDep));
    }

    #[test]
    fn self_cycle_flagged() {
        let src = "%WOOFNB 1.0\nname: rt\nlanguage: python\nexecution:\n  order: graph\n```cell id=a type=code deps=a\n1\n```\n";
        let diags = lint(&notebook(src));
        assert!(diags.iter().any(|d| d.code == crate::error::LintCode::Cycle));
    }

    #[test]
    fn two_cycle_flagged() {
        let src = "%WOOFNB 1.0\nname: rt\nlanguage: python\nexecution:\n  order: graph\n```cell id=a type=code deps=b\n1\n```\n```cell id=b type=code deps=a\n2\n```\n";
        let diags = lint(&notebook(src));
        assert!(diags.iter().any(|d| d.code == crate::error::LintCode::Cycle));
    }

    #[test]
    fn cycle_not_checked_under_linear_order() {
        let src = "%WOOFNB 1.0\nname: rt\nlanguage: python\n```cell id=a type=code deps=b\n1\n```\n```cell id=b type=code deps=a\n2\n```\n";
        let diags = lint(&notebook(src));
        assert!(!diags.iter().any(|d| d.code == crate::error::LintCode::Cycle));
    }

    #[test]
    fn bash_without_allow_shell_flagged() {
        let src = "%WOOFNB 1.0\nname: rt\nlanguage: python\n```cell id=a type=bash\necho hi\n```\n";
        let diags = lint(&notebook(src));
        assert!(diags.iter().any(|d| d.code == crate::error::LintCode::PolicyConflict));
    }

    #[test]
    fn unknown_token_is_a_warning_not_an_error() {
        let src = "%WOOFNB 1.0\nname: rt\nlanguage: python\n```cell id=a type=code frobnicate=yes\n1\n```\n";
        let diags = lint(&notebook(src));
        let d = diags
            .iter()
            .find(|d| d.code == crate::error::LintCode::UnknownToken)
            .unwrap();
        assert_eq!(d.severity, crate::diagnostics::Severity::Warning);
        assert!(!diags.has_errors());
    }

    #[test]
    fn disabled_dependency_warns() {
        let src = "%WOOFNB 1.0\nname: rt\nlanguage: python\n```cell id=a type=code disabled\n1\n```\n```cell id=b type=code deps=a\n2\n```\n";
        let diags = lint(&notebook(src));
        assert!(diags
            .iter()
            .any(|d| d.code == crate::error::LintCode::DisabledWithDependents));
    }
}
