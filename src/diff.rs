// Copyright 2021 - 2025 Unleash Mutants Contributors

//! Filter mutants to those intersecting a diff on the file tree, for
//! example uncommitted or unmerged changes, per the `--in-diff` option.

use std::collections::HashMap;
use std::fmt::Display;
use std::fs::File;
use std::io::Read;

use anyhow::bail;
use camino::Utf8Path;
use itertools::Itertools;
use patch::{Line, Patch};
use tracing::{error, trace, warn};

use crate::exit_code;
use crate::mutant::Mutant;

/// An error produced while filtering mutants against a diff (§6).
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum DiffFilterError {
    /// The diff file is empty.
    EmptyDiff,
    /// The diff's new-side text doesn't match the source tree.
    MismatchedDiff(String),
    /// The diff is not empty but intersects no mutants.
    NoMutants,
    /// The diff changes no Rust source files.
    NoSourceFiles,
    /// The diff text could not be parsed.
    InvalidDiff(String),
    /// The diff file could not be opened or read.
    File(String),
}

impl DiffFilterError {
    pub fn exit_code(&self) -> i32 {
        match self {
            DiffFilterError::EmptyDiff | DiffFilterError::NoSourceFiles | DiffFilterError::NoMutants => {
                exit_code::SUCCESS
            }
            DiffFilterError::MismatchedDiff(_) => exit_code::FILTER_DIFF_MISMATCH,
            DiffFilterError::File(_) | DiffFilterError::InvalidDiff(_) => exit_code::FILTER_DIFF_INVALID,
        }
    }
}

impl Display for DiffFilterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiffFilterError::EmptyDiff => write!(f, "Diff file is empty"),
            DiffFilterError::NoSourceFiles => write!(f, "Diff changes no Rust source files"),
            DiffFilterError::NoMutants => write!(f, "No mutants to filter"),
            DiffFilterError::MismatchedDiff(msg) => write!(f, "{msg}"),
            DiffFilterError::InvalidDiff(msg) => write!(f, "Failed to parse diff: {msg}"),
            DiffFilterError::File(msg) => write!(f, "Failed to read diff file: {msg}"),
        }
    }
}

impl std::error::Error for DiffFilterError {}

pub fn diff_filter_file(mutants: Vec<Mutant>, diff_path: &Utf8Path) -> Result<Vec<Mutant>, DiffFilterError> {
    let mut diff_file = File::open(diff_path).map_err(|err| {
        error!("Failed to open diff file: {err}");
        DiffFilterError::File(err.to_string())
    })?;
    let mut diff_bytes = Vec::new();
    diff_file.read_to_end(&mut diff_bytes).map_err(|err| {
        error!("Failed to read diff file: {err}");
        DiffFilterError::File(err.to_string())
    })?;
    let diff_text = String::from_utf8_lossy(&diff_bytes);
    diff_filter(mutants, &diff_text)
}

/// The set of source lines touched by a diff, keyed by tree-relative path
/// with the `b/` prefix stripped (§3 Diff data model: `file -> line ranges`,
/// represented here as a flat sorted line-number list per file).
///
/// An empty map means "no diff scope": every position counts as in-diff.
#[derive(Debug, Clone, Default)]
pub struct DiffScope {
    lines_by_path: HashMap<camino::Utf8PathBuf, Vec<usize>>,
}

impl DiffScope {
    /// Parse a unified diff into a line-scope index, for use by the walker's
    /// `NotCovered -> Runnable -> Skipped` status assignment (§4.1), as
    /// opposed to [`diff_filter`]'s whole-mutant removal used by `--in-diff`.
    pub fn parse(diff_text: &str) -> Result<DiffScope, DiffFilterError> {
        if diff_text.trim().is_empty() {
            return Ok(DiffScope::default());
        }
        let patches =
            Patch::from_multiple(diff_text).map_err(|err| DiffFilterError::InvalidDiff(err.to_string()))?;
        let mut lines_by_path: HashMap<camino::Utf8PathBuf, Vec<usize>> = HashMap::new();
        for patch in &patches {
            let path = strip_patch_path(&patch.new.path);
            if path != "/dev/null" && path.extension() == Some("rs") {
                lines_by_path
                    .entry(path.to_owned())
                    .or_default()
                    .extend(affected_lines(patch));
            }
        }
        Ok(DiffScope { lines_by_path })
    }

    /// Whether `line` of `path` falls inside the diff, per §3: empty scope
    /// counts everything as in-diff.
    pub fn is_in_diff(&self, path: &Utf8Path, line: usize) -> bool {
        if self.lines_by_path.is_empty() {
            return true;
        }
        self.lines_by_path
            .get(path)
            .is_some_and(|lines| lines.binary_search(&line).is_ok())
    }
}

/// Filter a list of mutants to those intersecting a diff on the file tree.
pub fn diff_filter(mutants: Vec<Mutant>, diff_text: &str) -> Result<Vec<Mutant>, DiffFilterError> {
    if diff_text.trim().is_empty() {
        return Err(DiffFilterError::EmptyDiff);
    }
    let patches = match Patch::from_multiple(diff_text) {
        Ok(patches) => patches,
        Err(err) => return Err(DiffFilterError::InvalidDiff(err.to_string())),
    };
    if patches.is_empty() {
        return Err(DiffFilterError::NoSourceFiles);
    }
    if let Err(err) = check_diff_new_text_matches(&patches, &mutants) {
        return Err(DiffFilterError::MismatchedDiff(err.to_string()));
    }
    let mut lines_changed_by_path: HashMap<&Utf8Path, Vec<usize>> = HashMap::new();
    let mut changed_rs_file = false;
    for patch in &patches {
        let path = strip_patch_path(&patch.new.path);
        if path != "/dev/null" && path.extension() == Some("rs") {
            changed_rs_file = true;
            lines_changed_by_path
                .entry(path)
                .or_default()
                .extend(affected_lines(patch));
        }
    }
    let mut matched: Vec<Mutant> = Vec::with_capacity(mutants.len());
    'mutant: for mutant in mutants {
        let path = mutant.source_path();
        if let Some(lines_changed) = lines_changed_by_path.get(path) {
            for line in mutant.span.start.line..=mutant.span.end.line {
                if lines_changed.binary_search(&line).is_ok() {
                    trace!(?path, line, mutant = %mutant.describe(), "diff matched mutant");
                    matched.push(mutant);
                    continue 'mutant;
                }
            }
        }
    }
    if matched.is_empty() {
        if changed_rs_file {
            trace!("diff matched no mutants");
            Err(DiffFilterError::NoMutants)
        } else {
            Err(DiffFilterError::NoSourceFiles)
        }
    } else {
        Ok(matched)
    }
}

fn check_diff_new_text_matches(patches: &[Patch], mutants: &[Mutant]) -> anyhow::Result<()> {
    let mut source_by_path: HashMap<&Utf8Path, &str> = HashMap::new();
    for mutant in mutants {
        source_by_path
            .entry(mutant.source_path())
            .or_insert_with(|| mutant.original_file_text());
    }
    for patch in patches {
        let path = strip_patch_path(&patch.new.path);
        if let Some(code) = source_by_path.get(&path) {
            let reconstructed = partial_new_file(patch);
            let lines = code.lines().collect_vec();
            for (lineno, diff_content) in reconstructed {
                let source_content = lines.get(lineno - 1).unwrap_or(&"");
                if diff_content != *source_content {
                    warn!(?path, lineno, ?diff_content, ?source_content, "diff content doesn't match source");
                    bail!(
                        "Diff content doesn't match source file: {path} line {lineno}\n\
                         diff has:   {diff_content:?}\n\
                         source has: {source_content:?}\n\
                         The diff might be out of date with this source tree."
                    );
                }
            }
        }
    }
    Ok(())
}

fn strip_patch_path(path: &str) -> &Utf8Path {
    let path = Utf8Path::new(path);
    path.strip_prefix("b").unwrap_or(path)
}

/// Lines actually changed by a patch (additions, and the context line
/// adjacent to a deletion), ignoring pure context.
fn affected_lines(patch: &Patch) -> Vec<usize> {
    let mut affected_lines = Vec::new();
    for hunk in &patch.hunks {
        let mut lineno: usize = hunk.new_range.start.try_into().unwrap();
        let mut prev_removed = false;
        for line in &hunk.lines {
            match line {
                Line::Remove(_) => prev_removed = true,
                Line::Add(_) | Line::Context(_) => {
                    if prev_removed {
                        affected_lines.push(lineno);
                        prev_removed = false;
                    }
                }
            }
            match line {
                Line::Context(_) => lineno += 1,
                Line::Add(_) => {
                    if affected_lines.last().map_or(true, |last| *last != lineno) {
                        affected_lines.push(lineno);
                    }
                    lineno += 1;
                }
                Line::Remove(_) => {
                    if lineno > 1 && affected_lines.last().map_or(true, |last| *last != (lineno - 1)) {
                        affected_lines.push(lineno - 1);
                    }
                }
            }
        }
    }
    affected_lines
}

/// Reconstruct a partial view of the new file from a patch: for every
/// context or added line, its line number in the new file and its text.
fn partial_new_file<'d>(patch: &Patch<'d>) -> Vec<(usize, &'d str)> {
    let mut r: Vec<(usize, &'d str)> = Vec::new();
    for hunk in &patch.hunks {
        let mut lineno: usize = hunk.new_range.start.try_into().unwrap();
        for line in &hunk.lines {
            match line {
                Line::Context(text) | Line::Add(text) => {
                    r.push((lineno, text));
                    lineno += 1;
                }
                Line::Remove(_) => {}
            }
        }
    }
    r
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_diff_is_rejected() {
        assert_eq!(diff_filter(Vec::new(), ""), Err(DiffFilterError::EmptyDiff));
    }

    #[test]
    fn diff_touching_no_source_is_rejected() {
        let diff = "\
diff --git a/README.md b/README.md
index cc3ce8c..8fe9aa0 100644
--- a/README.md
+++ b/README.md
@@ -1,2 +1,2 @@
 # Title
-old
+new
";
        assert_eq!(diff_filter(Vec::new(), diff), Err(DiffFilterError::NoSourceFiles));
    }

    #[test]
    fn unparsable_diff_reports_invalid() {
        let err = diff_filter(Vec::new(), "not really a diff\n").unwrap_err();
        assert!(matches!(err, DiffFilterError::InvalidDiff(_)));
    }

    #[test]
    fn strip_patch_path_prefix() {
        assert_eq!(strip_patch_path("b/src/mutate.rs"), "src/mutate.rs");
    }

    #[test]
    fn empty_diff_scope_counts_everything_as_in_diff() {
        let scope = DiffScope::parse("").unwrap();
        assert!(scope.is_in_diff(Utf8Path::new("src/lib.rs"), 1));
    }

    #[test]
    fn diff_scope_only_counts_changed_lines() {
        let diff = "\
diff --git a/src/lib.rs b/src/lib.rs
index cc3ce8c..8fe9aa0 100644
--- a/src/lib.rs
+++ b/src/lib.rs
@@ -1,3 +1,3 @@
 fn f() {
-    1 + 1
+    1 - 1
 }
";
        let scope = DiffScope::parse(diff).unwrap();
        assert!(scope.is_in_diff(Utf8Path::new("src/lib.rs"), 2));
        assert!(!scope.is_in_diff(Utf8Path::new("src/lib.rs"), 1));
        assert!(!scope.is_in_diff(Utf8Path::new("src/other.rs"), 2));
    }
}
