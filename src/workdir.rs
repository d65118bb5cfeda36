// Copyright 2023 - 2025 Unleash Mutants Contributors

//! Workdir Dealer (§4.3): hands each worker a private full-copy of the
//! source tree so mutants can be applied in isolation.
//!
//! Grounded in the teacher's `copy_tree.rs` (`ignore::WalkBuilder`-based
//! tree walk), adapted to always copy by full file content (never a
//! symlink or hard link: §4.3 requires mutation isolation), and to cache
//! the resulting directory per worker id rather than creating one ad hoc
//! copy per run.

use std::collections::HashMap;
use std::fs;
use std::sync::RwLock;

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use ignore::WalkBuilder;
use tempfile::TempDir;

use crate::error::EngineError;

/// Hands out, and caches, one private copy of the source tree per worker id
/// (§4.3). Safe for concurrent `get` calls; identical ids coalesce under
/// the read/write lock.
pub struct WorkdirDealer {
    source_root: Utf8PathBuf,
    name_base: String,
    dirs: RwLock<HashMap<usize, (TempDir, Utf8PathBuf)>>,
}

impl WorkdirDealer {
    pub fn new(source_root: Utf8PathBuf, name_base: &str) -> WorkdirDealer {
        WorkdirDealer {
            source_root,
            name_base: name_base.to_owned(),
            dirs: RwLock::new(HashMap::new()),
        }
    }

    /// Return the workdir path for `worker_id`, creating and populating it
    /// on first request.
    pub fn get(&self, worker_id: usize) -> Result<Utf8PathBuf, EngineError> {
        if let Some((_, path)) = self.dirs.read().expect("workdir cache poisoned").get(&worker_id) {
            return Ok(path.clone());
        }
        let mut dirs = self.dirs.write().expect("workdir cache poisoned");
        if let Some((_, path)) = dirs.get(&worker_id) {
            return Ok(path.clone());
        }
        let (temp_dir, path) = copy_tree(&self.source_root, &self.name_base)
            .map_err(|e| EngineError::WorkdirCreate(e.to_string()))?;
        dirs.insert(worker_id, (temp_dir, path.clone()));
        Ok(path)
    }

    /// Remove every cached workdir and empty the cache.
    pub fn clean(&self) {
        self.dirs.write().expect("workdir cache poisoned").clear();
    }
}

/// Copy `from_path` by full file content into a fresh temp directory,
/// preserving directory structure and regular-file permissions, skipping
/// symlinks and other special files (§4.3).
fn copy_tree(from_path: &Utf8Path, name_base: &str) -> anyhow::Result<(TempDir, Utf8PathBuf)> {
    let temp_dir = tempfile::Builder::new()
        .prefix(name_base)
        .suffix(".tmp")
        .tempdir()
        .context("create workdir")?;
    let dest: Utf8PathBuf = temp_dir.path().to_owned().try_into().context("convert path to UTF-8")?;
    for entry in WalkBuilder::new(from_path).hidden(false).ignore(false).build() {
        let entry = entry.context("walk source tree")?;
        let relative = entry.path().strip_prefix(from_path).expect("entry path is in from_path");
        let dest_path = dest.as_std_path().join(relative);
        let file_type = entry
            .file_type()
            .with_context(|| format!("file type of {:?}", entry.path()))?;
        if file_type.is_dir() {
            fs::create_dir_all(&dest_path).with_context(|| format!("create dir {dest_path:?}"))?;
        } else if file_type.is_file() {
            fs::copy(entry.path(), &dest_path)
                .with_context(|| format!("copy {:?} to {dest_path:?}", entry.path()))?;
        }
        // Symlinks and other special files are silently skipped (§4.3).
    }
    Ok((temp_dir, dest))
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs::{create_dir, write};

    #[test]
    fn same_worker_id_returns_cached_path() {
        let src = tempfile::tempdir().unwrap();
        write(src.path().join("lib.rs"), "fn f() {}").unwrap();
        let root = Utf8PathBuf::try_from(src.path().to_owned()).unwrap();
        let dealer = WorkdirDealer::new(root, "test");
        let a = dealer.get(0).unwrap();
        let b = dealer.get(0).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_worker_ids_get_distinct_copies() {
        let src = tempfile::tempdir().unwrap();
        write(src.path().join("lib.rs"), "fn f() {}").unwrap();
        let root = Utf8PathBuf::try_from(src.path().to_owned()).unwrap();
        let dealer = WorkdirDealer::new(root, "test");
        let a = dealer.get(0).unwrap();
        let b = dealer.get(1).unwrap();
        assert_ne!(a, b);
        assert!(a.join("lib.rs").is_file());
        assert!(b.join("lib.rs").is_file());
    }

    #[test]
    fn copy_preserves_directory_structure() {
        let src = tempfile::tempdir().unwrap();
        create_dir(src.path().join("src")).unwrap();
        write(src.path().join("src/lib.rs"), "fn f() {}").unwrap();
        let root = Utf8PathBuf::try_from(src.path().to_owned()).unwrap();
        let dealer = WorkdirDealer::new(root, "test");
        let dest = dealer.get(0).unwrap();
        assert!(dest.join("src").join("lib.rs").is_file());
    }

    #[test]
    fn clean_empties_the_cache() {
        let src = tempfile::tempdir().unwrap();
        write(src.path().join("lib.rs"), "fn f() {}").unwrap();
        let root = Utf8PathBuf::try_from(src.path().to_owned()).unwrap();
        let dealer = WorkdirDealer::new(root, "test");
        let before = dealer.get(0).unwrap();
        dealer.clean();
        let after = dealer.get(0).unwrap();
        assert_ne!(before, after);
    }
}
