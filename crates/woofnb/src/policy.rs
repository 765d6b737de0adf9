//! Capability gating at execution time.
//!
//! The linter already warns about these mismatches ahead of time
//! ([`crate::linter::lint`]); this module is the hard enforcement point the
//! orchestrator consults immediately before dispatching a cell to a runner.

use crate::error::ExecErrorName;
use crate::header::IoPolicy;
use crate::model::{Cell, CellType, SideFx};

/// Returns `Err` with the reason a cell must not run under `policy`, or
/// `Ok(())` if it's cleared.
///
/// Rules:
/// - `sidefx=isolated` is always permitted — it names no ambient capability.
/// - `allow_shell` implies `allow_files` (a shell can touch the filesystem
///   by definition, so granting one without the other is meaningless).
/// - A `bash` cell always needs `allow_shell`, regardless of its own
///   declared `sidefx`.
pub fn check(cell: &Cell, policy: &IoPolicy) -> Result<(), (ExecErrorName, String)> {
    if cell.cell_type == CellType::Bash && !policy.allow_shell {
        return Err((
            ExecErrorName::PolicyDenied,
            "bash cells require `allow_shell`".to_string(),
        ));
    }

    match cell.sidefx {
        SideFx::None | SideFx::Isolated => Ok(()),
        SideFx::Fs => {
            if policy.allow_files || policy.allow_shell {
                Ok(())
            } else {
                Err((
                    ExecErrorName::PolicyDenied,
                    "sidefx=fs requires `allow_files`".to_string(),
                ))
            }
        }
        SideFx::Net => {
            if policy.allow_network {
                Ok(())
            } else {
                Err((
                    ExecErrorName::PolicyDenied,
                    "sidefx=net requires `allow_network`".to_string(),
                ))
            }
        }
        SideFx::Shell => {
            if policy.allow_shell {
                Ok(())
            } else {
                Err((
                    ExecErrorName::PolicyDenied,
                    "sidefx=shell requires `allow_shell`".to_string(),
                ))
            }
        }
    }
}
