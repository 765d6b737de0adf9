//! `woof graph`: prints the planned execution order without running
//! anything. Non-executable cells (`md`, `raw`, `viz`) never appear; they
//! have nothing to schedule.

use std::path::Path;

use anyhow::{Context, Result};

use crate::orchestrator::ExitStatus;

pub fn run(path: &Path) -> Result<ExitStatus> {
    let notebook = super::read_notebook(path)?;
    let plan = crate::planner::plan(&notebook)
        .with_context(|| format!("failed to build an execution plan for `{}`", path.display()))?;

    for (i, cell_id) in plan.order.iter().enumerate() {
        let cell = notebook.cell(cell_id).expect("plan only lists known cells");
        let deps = if cell.deps.is_empty() {
            String::new()
        } else {
            format!(" <- {}", cell.deps.join(", "))
        };
        println!("{:>3}. {cell_id}{deps}", i + 1);
    }

    Ok(ExitStatus::Success)
}
