//! `bash` cell backend: runs the cell body as a shell script. Requires
//! `allow_shell` — enforced by [`crate::policy`] before dispatch ever
//! reaches here.

use std::process::Command;
use std::time::Duration;

use super::{Backend, BackendResult};
use crate::model::Cell;
use crate::runner::run_process;

pub struct BashBackend;

impl Backend for BashBackend {
    fn run(&self, cell: &Cell, _lang: &str, timeout: Duration) -> BackendResult {
        let mut cmd = Command::new("bash");
        cmd.arg("-c").arg(&cell.body);
        run_process(cmd, timeout)
    }
}
