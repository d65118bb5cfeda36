// Copyright 2021 - 2025 Unleash Mutants Contributors

//! A Rust source file within a tree, and discovery of the files eligible
//! for mutation (§4.1 emission rules: test-file suffix, exclusion rules,
//! non-source extensions).

use std::fs;
use std::sync::Arc;

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use ignore::WalkBuilder;
use path_slash::PathExt;

use crate::exclude::ExclusionRules;
use crate::Result;

/// The suffix (before `.rs`) that marks a file as test-only and therefore
/// exempt from mutation (§4.1).
pub const TEST_FILE_SUFFIX: &str = "_test";

/// A Rust source file, eagerly loaded and normalised to Unix line endings.
#[derive(Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path relative to the tree root, forward-slash separated.
    pub tree_relative: Utf8PathBuf,
    pub package: Arc<String>,
    code: Arc<String>,
}

impl SourceFile {
    pub fn new(tree_path: &Utf8Path, tree_relative: &Utf8Path, package: Arc<String>) -> Result<SourceFile> {
        let full_path = tree_path.join(tree_relative);
        let code = fs::read_to_string(&full_path)
            .with_context(|| format!("read source {full_path}"))?
            .replace("\r\n", "\n");
        Ok(SourceFile {
            tree_relative: tree_relative.to_owned(),
            package,
            code: Arc::new(code),
        })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Build a `SourceFile` directly from in-memory text, for unit tests
    /// that don't need a real tree on disk.
    #[cfg(test)]
    pub fn new_for_test(tree_relative: &str, code: &str) -> SourceFile {
        SourceFile {
            tree_relative: Utf8PathBuf::from(tree_relative),
            package: Arc::new("test-package".into()),
            code: Arc::new(code.to_string()),
        }
    }

    pub fn tree_relative_slashes(&self) -> String {
        self.tree_relative.as_std_path().to_slash_lossy().into_owned()
    }

    pub fn is_test_file(&self) -> bool {
        self.tree_relative
            .file_stem()
            .is_some_and(|stem| stem.ends_with(TEST_FILE_SUFFIX))
    }
}

/// Walk `root` and return every `.rs` file not excluded by `rules`, skipping
/// the target/build directory and anything `.gitignore`'d, mirroring the
/// teacher's `ignore`-crate-based tree walk in `copy_tree.rs`.
pub fn discover_source_files(root: &Utf8Path, rules: &ExclusionRules) -> Result<Vec<Utf8PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkBuilder::new(root).hidden(false).build() {
        let entry = entry.context("walk source tree")?;
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let path = Utf8Path::from_path(entry.path()).context("non-utf8 path")?;
        if path.extension() != Some("rs") {
            continue;
        }
        let relative = path.strip_prefix(root).unwrap_or(path).to_owned();
        if rules.is_excluded(&relative) {
            continue;
        }
        files.push(relative);
    }
    files.sort();
    Ok(files)
}
