//! JSON-Lines sidecar writer: one line per executed cell, appended as the
//! run progresses so a killed process still leaves a readable partial
//! record. Line-atomic rather than whole-file-atomic, since this file is
//! append-only — and across runs, not just within one: prior content is
//! preserved unless `woof clean` removes it.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;

use crate::model::Output;

/// One line of `<notebook>.woofnb.out`: the per-cell result schema defined
/// for the sidecar file, distinct from [`crate::model::CacheEntry`] (which
/// additionally carries the cache key and is keyed by digest, not append
/// order).
#[derive(Debug, Clone, Serialize)]
pub struct SidecarRecord {
    pub cell: String,
    pub timestamp: String,
    pub elapsed_ms: u64,
    pub status: String,
    pub outputs: Vec<Output>,
}

pub struct Sidecar {
    file: File,
}

impl Sidecar {
    /// Opens (creating if necessary) the JSON-Lines file at `path` for
    /// appending. A previous run's entries are never truncated; only `woof
    /// clean` removes them.
    pub fn create(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file })
    }

    /// Appends `record` as a single JSON line, flushing immediately so the
    /// record survives a crash in the next cell.
    pub fn append(&mut self, record: &SidecarRecord) -> io::Result<()> {
        let line = serde_json::to_string(record)?;
        writeln!(self.file, "{line}")?;
        self.file.flush()
    }
}
