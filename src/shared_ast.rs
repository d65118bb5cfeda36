// Copyright 2021 - 2025 Unleash Mutants Contributors

//! Per-file lock table guarding exclusive "applied" access to a source
//! file's shared AST (§3, §5, §9).
//!
//! Every mutant derived from a given source file shares one parsed
//! [`syn::File`]; the global, lazily-populated lock table below serialises
//! apply/write so that at most one mutant per original file is ever in the
//! "applied" state at a time, matching the invariant in §3 even though our
//! `apply`/`rollback` (see `mutant.rs`) only ever touches a worker-private
//! workdir copy via span-based text splice rather than re-printing the AST.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, RwLock};

use camino::Utf8PathBuf;

type LockMap = RwLock<HashMap<Utf8PathBuf, Arc<Mutex<()>>>>;

static LOCKS: OnceLock<LockMap> = OnceLock::new();

fn locks() -> &'static LockMap {
    LOCKS.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Return the mutex guarding `path`, creating it if this is the first
/// mutant seen for that file.
///
/// Lazy insertion with double-checked locking (§9): a read lock first, and
/// only on miss do we take the write lock and re-check before inserting.
pub fn lock_for(path: &Utf8PathBuf) -> Arc<Mutex<()>> {
    if let Some(lock) = locks().read().expect("lock table poisoned").get(path) {
        return Arc::clone(lock);
    }
    let mut table = locks().write().expect("lock table poisoned");
    Arc::clone(
        table
            .entry(path.clone())
            .or_insert_with(|| Arc::new(Mutex::new(()))),
    )
}

/// A parsed source file, shared by every mutant discovered within it.
///
/// Held read-only after discovery: mutation of the on-disk copy is done by
/// span-based text splice (`mutant.rs`), so the parsed tree here is never
/// mutated in place, only consulted.
pub struct SharedAst {
    pub path: Utf8PathBuf,
    pub file: syn::File,
}

impl SharedAst {
    pub fn parse(path: Utf8PathBuf, code: &str) -> syn::Result<SharedAst> {
        Ok(SharedAst {
            path,
            file: syn::parse_str(code)?,
        })
    }
}
