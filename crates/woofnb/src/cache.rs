//! On-disk result cache: one JSON file per cell, keyed by a
//! content-addressed digest, written atomically — a temp file in the
//! same directory, then rename over the target.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use woofnb_cache::{to_hex, CacheKeyHasher};

use crate::model::{Cell, CacheEntry, Notebook};

/// Resolves the cache directory for a notebook at `notebook_path`: the
/// `WOOF_CACHE_DIR` environment variable if set, else `.woof-cache/<stem>`
/// next to the notebook.
#[must_use]
pub fn resolve_dir(notebook_path: &Path) -> PathBuf {
    if let Ok(dir) = std::env::var("WOOF_CACHE_DIR") {
        return PathBuf::from(dir);
    }
    let stem = notebook_path
        .file_stem()
        .map_or_else(|| "notebook".to_string(), |s| s.to_string_lossy().into_owned());
    notebook_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(".woof-cache")
        .join(stem)
}

pub struct Cache {
    dir: PathBuf,
}

impl Cache {
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn entry_path(&self, cell_id: &str) -> PathBuf {
        self.dir.join(format!("{cell_id}.json"))
    }

    /// Looks up a cached entry for `cell_id`, returning `None` if absent,
    /// unreadable, unparseable, or stale (digest mismatch). A corrupt cache
    /// file is treated as a miss, never a hard error.
    #[must_use]
    pub fn get(&self, cell_id: &str, digest_hex: &str) -> Option<CacheEntry> {
        let bytes = fs::read(self.entry_path(cell_id)).ok()?;
        let entry: CacheEntry = serde_json::from_slice(&bytes).ok()?;
        if entry.key == digest_hex {
            Some(entry)
        } else {
            None
        }
    }

    /// Writes `entry` atomically: a temp file in the cache directory,
    /// flushed and renamed into place so a crash mid-write never leaves a
    /// half-written cache file visible to a concurrent reader.
    pub fn put(&self, entry: &CacheEntry) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer(&mut tmp, entry)?;
        tmp.persist(self.entry_path(&entry.cell_id))
            .map_err(|e| e.error)?;
        Ok(())
    }

    /// Removes this notebook's cache directory (`woof clean`).
    pub fn clean(&self) -> io::Result<()> {
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Removes every per-notebook cache directory under `root` (`woof clean
/// --all`).
pub fn clean_all(root: &Path) -> io::Result<()> {
    match fs::remove_dir_all(root) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Computes the content-addressed cache key for `cell`: a fixed version
/// prefix, the runner version, the cell's own type/lang/body, the bodies of
/// its transitive dependencies in topological order (so the key reflects the
/// order the dependencies actually execute in, and is still independent of
/// where they sit in the file), and the notebook's canonical `env` and
/// `parameters` JSON.
#[must_use]
pub fn digest(notebook: &Notebook, cell: &Cell, runner_version: &str) -> String {
    let mut hasher = CacheKeyHasher::new();
    hasher.update_str("woofnb-cache-v1");
    hasher.update_str(runner_version);
    hasher.update_str(cell.cell_type.as_str());
    hasher.update_str(cell.effective_lang(notebook.language()));
    hasher.update_str(&cell.body);

    for dep_id in transitive_deps_topological(notebook, cell) {
        if let Some(dep) = notebook.cell(&dep_id) {
            hasher.update_str(&dep.id);
            hasher.update_str(&dep.body);
        }
    }

    hasher.update_str(&notebook.header.view.env_canonical_json());
    hasher.update_str(&notebook.header.view.parameters_canonical_json());

    to_hex(&hasher.finish())
}

/// Every id `cell` transitively depends on, in topological order (a dep
/// always precedes anything that depends on it), with ties among
/// simultaneously-ready deps broken alphabetically by id for determinism.
fn transitive_deps_topological(notebook: &Notebook, cell: &Cell) -> Vec<String> {
    let mut seen = rustc_hash::FxHashSet::default();
    let mut stack = cell.deps.clone();
    while let Some(id) = stack.pop() {
        if !seen.insert(id.clone()) {
            continue;
        }
        if let Some(dep) = notebook.cell(&id) {
            stack.extend(dep.deps.iter().cloned());
        }
    }

    let mut ids: Vec<String> = seen.into_iter().collect();
    ids.sort_unstable();
    let index_of: rustc_hash::FxHashMap<&str, usize> =
        ids.iter().enumerate().map(|(i, id)| (id.as_str(), i)).collect();

    let mut indegree = vec![0usize; ids.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); ids.len()];
    for (i, id) in ids.iter().enumerate() {
        let Some(dep_cell) = notebook.cell(id) else {
            continue;
        };
        for d in &dep_cell.deps {
            if let Some(&d_idx) = index_of.get(d.as_str()) {
                dependents[d_idx].push(i);
                indegree[i] += 1;
            }
        }
    }

    let mut ready: Vec<usize> = (0..ids.len()).filter(|&i| indegree[i] == 0).collect();
    let mut order = Vec::with_capacity(ids.len());
    let mut emitted = vec![false; ids.len()];

    while !ready.is_empty() {
        ready.sort_unstable();
        let next = ready.remove(0);
        order.push(ids[next].clone());
        emitted[next] = true;

        for &dep_idx in &dependents[next] {
            indegree[dep_idx] -= 1;
            if indegree[dep_idx] == 0 {
                ready.push(dep_idx);
            }
        }
    }

    // A cycle here would already have been caught by the linter/planner
    // before digest() is ever reached; emit any stragglers in sorted order
    // rather than silently dropping them.
    for (i, id) in ids.into_iter().enumerate() {
        if !emitted[i] {
            order.push(id);
        }
    }

    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Output;
    use crate::parser::parse;

    fn sample() -> Notebook {
        parse("%WOOFNB 1.0\nname: rt\nlanguage: python\n```cell id=a type=code\n1+1\n```\n").unwrap()
    }

    #[test]
    fn digest_is_deterministic() {
        let nb = sample();
        let cell = nb.cell("a").unwrap();
        assert_eq!(digest(&nb, cell, "1.0.0"), digest(&nb, cell, "1.0.0"));
    }

    #[test]
    fn digest_changes_with_body() {
        let nb = sample();
        let cell = nb.cell("a").unwrap();
        let mut other = cell.clone();
        other.body = "2+2".to_string();
        assert_ne!(digest(&nb, cell, "1.0.0"), digest(&nb, &other, "1.0.0"));
    }

    #[test]
    fn digest_changes_with_runner_version() {
        let nb = sample();
        let cell = nb.cell("a").unwrap();
        assert_ne!(digest(&nb, cell, "1.0.0"), digest(&nb, cell, "2.0.0"));
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path().to_path_buf());
        let entry = CacheEntry {
            key: "abc123".to_string(),
            cell_id: "a".to_string(),
            outputs: vec![Output::ExecuteResult { repr: "2".to_string() }],
            elapsed_ms: 5,
            runner_version: "1.0.0".to_string(),
        };
        cache.put(&entry).unwrap();
        let loaded = cache.get("a", "abc123").unwrap();
        assert_eq!(loaded.cell_id, "a");
        assert_eq!(loaded.outputs.len(), 1);
    }

    #[test]
    fn stale_digest_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path().to_path_buf());
        let entry = CacheEntry {
            key: "abc123".to_string(),
            cell_id: "a".to_string(),
            outputs: vec![],
            elapsed_ms: 0,
            runner_version: "1.0.0".to_string(),
        };
        cache.put(&entry).unwrap();
        assert!(cache.get("a", "different").is_none());
    }

    #[test]
    fn transitive_dep_order_is_topological_not_alphabetical() {
        // `a` depends on `z`, `z` depends on `b` — alphabetically `b` sorts
        // before `z`, but `b` must execute before `z`, so it must appear
        // first in the digest's dependency order too.
        let nb = parse(
            "%WOOFNB 1.0\nname: rt\nlanguage: python\n\
             ```cell id=b type=code\n1\n```\n\
             ```cell id=z type=code deps=b\n2\n```\n\
             ```cell id=a type=code deps=z\n3\n```\n",
        )
        .unwrap();
        let cell = nb.cell("a").unwrap();
        assert_eq!(
            transitive_deps_topological(&nb, cell),
            vec!["b".to_string(), "z".to_string()]
        );
    }

    #[test]
    fn corrupt_cache_file_is_a_miss_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path().to_path_buf());
        fs::create_dir_all(dir.path()).unwrap();
        fs::write(dir.path().join("a.json"), b"not json").unwrap();
        assert!(cache.get("a", "abc123").is_none());
    }
}
