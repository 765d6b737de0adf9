//! Builds an execution plan from a linted [`Notebook`].
//!
//! Two scheduling modes hang off `execution.order`: `linear` walks cells in
//! file order (deps must already have appeared), `graph` performs a
//! dependency-respecting topological sort with deterministic tie-breaking
//! (lower `priority` first, then file order).

use rustc_hash::FxHashSet;

use crate::model::{ExecutionOrder, Notebook};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanError {
    pub message: String,
}

impl std::fmt::Display for PlanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for PlanError {}

/// An ordered, filtered list of cell ids ready to execute in sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub order: Vec<String>,
}

/// Whether a cell belongs in a plan's emitted `order`, as opposed to merely
/// being a node the dependency graph resolves through. Non-executable types
/// (`md`, `raw`, `viz`) and `disabled=true` cells are excluded from the
/// output but still participate in dep resolution (§4.4) — a `code` cell
/// depending on an `md` cell must still see it as satisfied in file/topo
/// order, even though the `md` cell itself never appears in the plan.
fn is_emitted(cell: &crate::model::Cell) -> bool {
    cell.cell_type.is_executable() && !cell.disabled
}

/// Builds a plan covering every executable, non-disabled cell.
///
/// Dependency resolution runs over *every* cell in the notebook, not just
/// the ones that end up emitted — a non-executable or disabled cell still
/// has to be accounted for wherever it sits in the dependency graph, or a
/// constraint that routes through it would silently vanish. Only the final
/// `Plan.order` is filtered down to emitted cells.
///
/// # Errors
/// Returns a [`PlanError`] if `execution.order` is `linear` and a cell's
/// dependency hasn't executed yet by the time it's reached (linear order
/// requires deps to already appear earlier in the file).
pub fn plan(notebook: &Notebook) -> Result<Plan, PlanError> {
    let all: Vec<&crate::model::Cell> = notebook.cells.iter().collect();

    match notebook.header.view.execution.order {
        ExecutionOrder::Linear => plan_linear(&all),
        ExecutionOrder::Graph => plan_graph(&all),
    }
}

/// Expands a user-requested selector set (e.g. `woof run b`) to the ids that
/// must run to satisfy it: the selected cells plus, unless `no_deps` is set,
/// everything they transitively depend on — restricted to the base plan's
/// order so the result is still a valid execution sequence.
#[must_use]
pub fn select(base: &Plan, notebook: &Notebook, targets: &[String], no_deps: bool) -> Plan {
    if no_deps {
        let wanted: FxHashSet<&str> = targets.iter().map(String::as_str).collect();
        return Plan {
            order: base
                .order
                .iter()
                .filter(|id| wanted.contains(id.as_str()))
                .cloned()
                .collect(),
        };
    }

    let mut needed: FxHashSet<String> = FxHashSet::default();
    let mut stack: Vec<String> = targets.to_vec();
    while let Some(id) = stack.pop() {
        if !needed.insert(id.clone()) {
            continue;
        }
        if let Some(cell) = notebook.cell(&id) {
            stack.extend(cell.deps.iter().cloned());
        }
    }

    Plan {
        order: base
            .order
            .iter()
            .filter(|id| needed.contains(id.as_str()))
            .cloned()
            .collect(),
    }
}

/// `all` is every cell in the notebook, in file order. A dep is resolved
/// against everything seen so far regardless of whether it was emitted;
/// only emitted cells are pushed onto `order`.
fn plan_linear(all: &[&crate::model::Cell]) -> Result<Plan, PlanError> {
    let mut seen = FxHashSet::default();
    let mut order = Vec::new();

    for cell in all {
        for dep in &cell.deps {
            if !seen.contains(dep.as_str()) {
                return Err(PlanError {
                    message: format!(
                        "cell `{}` depends on `{dep}`, which has not executed yet under linear order",
                        cell.id
                    ),
                });
            }
        }
        seen.insert(cell.id.as_str());
        if is_emitted(cell) {
            order.push(cell.id.clone());
        }
    }

    Ok(Plan { order })
}

/// Kahn's algorithm with a deterministic tie-break: among cells whose deps
/// are all satisfied, prefer lower `priority`, then earlier `file_index`.
///
/// `all` is every cell in the notebook; non-emitted cells (non-executable
/// types, `disabled`) still become graph nodes so a constraint that routes
/// through one isn't lost. They're dropped from the topological order only
/// once it's fully computed.
fn plan_graph(all: &[&crate::model::Cell]) -> Result<Plan, PlanError> {
    let ids: Vec<&str> = all.iter().map(|c| c.id.as_str()).collect();
    let known: FxHashSet<&str> = ids.iter().copied().collect();

    let mut indegree: Vec<usize> = vec![0; all.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); all.len()];
    let index_of: std::collections::HashMap<&str, usize> =
        ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();

    for (i, cell) in all.iter().enumerate() {
        for dep in &cell.deps {
            if !known.contains(dep.as_str()) {
                // A dep on an id that doesn't exist at all is a linter
                // concern; the planner just treats it as already satisfied.
                continue;
            }
            let dep_idx = index_of[dep.as_str()];
            dependents[dep_idx].push(i);
            indegree[i] += 1;
        }
    }

    let mut ready: Vec<usize> = (0..all.len()).filter(|&i| indegree[i] == 0).collect();
    let mut topo_order = Vec::with_capacity(all.len());
    let mut remaining = all.len();

    while !ready.is_empty() {
        ready.sort_by(|&a, &b| {
            all[a]
                .priority
                .cmp(&all[b].priority)
                .then(all[a].file_index.cmp(&all[b].file_index))
        });
        let next = ready.remove(0);
        topo_order.push(next);
        remaining -= 1;

        for &dep_idx in &dependents[next] {
            indegree[dep_idx] -= 1;
            if indegree[dep_idx] == 0 {
                ready.push(dep_idx);
            }
        }
    }

    if remaining != 0 {
        return Err(PlanError {
            message: "dependency cycle prevents a graph-order plan".to_string(),
        });
    }

    let order = topo_order
        .into_iter()
        .map(|i| all[i])
        .filter(|cell| is_emitted(cell))
        .map(|cell| cell.id.clone())
        .collect();

    Ok(Plan { order })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn linear_order_matches_file_order_when_deps_precede() {
        let src = "%WOOFNB 1.0\nname: rt\nlanguage: python\n```cell id=a type=code\n1\n```\n```cell id=b type=code deps=a\n2\n```\n";
        let nb = parse(src).unwrap();
        let p = plan(&nb).unwrap();
        assert_eq!(p.order, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn linear_order_rejects_forward_reference() {
        let src = "%WOOFNB 1.0\nname: rt\nlanguage: python\n```cell id=a type=code deps=b\n1\n```\n```cell id=b type=code\n2\n```\n";
        let nb = parse(src).unwrap();
        assert!(plan(&nb).is_err());
    }

    #[test]
    fn graph_order_respects_deps_regardless_of_file_order() {
        let src = "%WOOFNB 1.0\nname: rt\nlanguage: python\nexecution:\n  order: graph\n```cell id=a type=code deps=b\n1\n```\n```cell id=b type=code\n2\n```\n";
        let nb = parse(src).unwrap();
        let p = plan(&nb).unwrap();
        assert_eq!(p.order, vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn graph_order_breaks_ties_by_priority_then_file_index() {
        let src = "%WOOFNB 1.0\nname: rt\nlanguage: python\nexecution:\n  order: graph\n```cell id=a type=code\n1\n```\n```cell id=b type=code priority=-5\n2\n```\n```cell id=c type=code\n3\n```\n";
        let nb = parse(src).unwrap();
        let p = plan(&nb).unwrap();
        assert_eq!(p.order, vec!["b".to_string(), "a".to_string(), "c".to_string()]);
    }

    #[test]
    fn graph_order_matches_the_spec_c_minus_one_scenario() {
        let src = "%WOOFNB 1.0\nname: rt\nlanguage: python\nexecution:\n  order: graph\n```cell id=a type=code\n1\n```\n```cell id=b type=code deps=a\n2\n```\n```cell id=c type=code deps=a priority=-1\n3\n```\n";
        let nb = parse(src).unwrap();
        let p = plan(&nb).unwrap();
        assert_eq!(p.order, vec!["a".to_string(), "c".to_string(), "b".to_string()]);
    }

    #[test]
    fn disabled_cells_are_excluded() {
        let src = "%WOOFNB 1.0\nname: rt\nlanguage: python\n```cell id=a type=code disabled\n1\n```\n```cell id=b type=code\n2\n```\n";
        let nb = parse(src).unwrap();
        let p = plan(&nb).unwrap();
        assert_eq!(p.order, vec!["b".to_string()]);
    }

    #[test]
    fn md_and_raw_cells_are_excluded() {
        let src = "%WOOFNB 1.0\nname: rt\nlanguage: python\n```cell id=a type=md\n# hi\n```\n```cell id=b type=code\n1\n```\n";
        let nb = parse(src).unwrap();
        let p = plan(&nb).unwrap();
        assert_eq!(p.order, vec!["b".to_string()]);
    }

    #[test]
    fn select_with_deps_pulls_in_transitive_dependencies() {
        let src = "%WOOFNB 1.0\nname: rt\nlanguage: python\n```cell id=a type=code\n1\n```\n```cell id=b type=code deps=a\n2\n```\n```cell id=c type=code\n3\n```\n";
        let nb = parse(src).unwrap();
        let base = plan(&nb).unwrap();
        let s = select(&base, &nb, &["b".to_string()], false);
        assert_eq!(s.order, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn linear_order_accepts_a_dep_on_a_non_executable_cell() {
        let src = "%WOOFNB 1.0\nname: rt\nlanguage: python\n```cell id=m type=md\n# hi\n```\n```cell id=a type=code deps=m\n1\n```\n";
        let nb = parse(src).unwrap();
        let p = plan(&nb).unwrap();
        assert_eq!(p.order, vec!["a".to_string()]);
    }

    #[test]
    fn graph_order_respects_a_constraint_routed_through_a_non_executable_cell() {
        let src = "%WOOFNB 1.0\nname: rt\nlanguage: python\nexecution:\n  order: graph\n```cell id=a type=code deps=v\n1\n```\n```cell id=v type=viz deps=c\nplot\n```\n```cell id=c type=code\n2\n```\n";
        let nb = parse(src).unwrap();
        let p = plan(&nb).unwrap();
        assert_eq!(p.order, vec!["c".to_string(), "a".to_string()]);
    }

    #[test]
    fn select_no_deps_runs_only_the_target() {
        let src = "%WOOFNB 1.0\nname: rt\nlanguage: python\n```cell id=a type=code\n1\n```\n```cell id=b type=code deps=a\n2\n```\n";
        let nb = parse(src).unwrap();
        let base = plan(&nb).unwrap();
        let s = select(&base, &nb, &["b".to_string()], true);
        assert_eq!(s.order, vec!["b".to_string()]);
    }
}
