//! Dispatch table from cell kind to execution backend.

mod bash;
mod code;
mod data;

use std::time::Duration;

use crate::error::ExecErrorName;
use crate::model::{Cell, CellType, Output};

pub use bash::BashBackend;
pub use code::CodeBackend;
pub use data::DataBackend;

/// One execution attempt's outcome: the captured outputs in arrival order,
/// or a named failure.
pub type BackendResult = Result<Vec<Output>, (ExecErrorName, String)>;

pub trait Backend {
    /// Runs `cell`'s body under `lang`, returning within `timeout` or being
    /// killed by the caller's watchdog.
    fn run(&self, cell: &Cell, lang: &str, timeout: Duration) -> BackendResult;
}

/// Picks the backend for a cell the way a Jupyter kernel manager picks a
/// kernel for a notebook's declared language, but keyed on cell type first:
/// `bash` and `data` cells ignore the notebook language entirely.
#[must_use]
pub fn backend_for(cell_type: CellType) -> Box<dyn Backend> {
    match cell_type {
        CellType::Bash => Box::new(BashBackend),
        CellType::Data => Box::new(DataBackend),
        _ => Box::new(CodeBackend),
    }
}
