//! `woof clean`: removes cached results.

use std::path::Path;

use anyhow::{Context, Result};

use crate::cache::{self, Cache};
use crate::commands::sidecar_path_for;
use crate::orchestrator::ExitStatus;

fn remove_if_present(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("failed to remove `{}`", path.display())),
    }
}

pub fn run(path: &Path, all: bool) -> Result<ExitStatus> {
    if all {
        let root = path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(".woof-cache");
        cache::clean_all(&root)
            .with_context(|| format!("failed to remove `{}`", root.display()))?;
        println!("removed {}", root.display());
        return Ok(ExitStatus::Success);
    }

    let dir = cache::resolve_dir(path);
    Cache::new(dir.clone())
        .clean()
        .with_context(|| format!("failed to remove `{}`", dir.display()))?;
    println!("removed {}", dir.display());

    let sidecar = sidecar_path_for(path);
    remove_if_present(&sidecar)?;
    println!("removed {}", sidecar.display());

    Ok(ExitStatus::Success)
}
