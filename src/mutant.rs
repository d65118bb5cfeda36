// Copyright 2021 - 2025 Unleash Mutants Contributors

//! The Mutant: a polymorphic unit with apply/rollback, position, and status
//! (§2, §3, §4.2).
//!
//! `apply`/`rollback` are span-based text splices against a worker's workdir
//! copy (grounded in the teacher's `span.rs`/`mutant.rs` `extract`/`replace`
//! pair), not a full-AST reprint: see `DESIGN.md` Open Question 1. The
//! per-file lock in `shared_ast.rs` still serialises every apply, matching
//! the "exactly one mutant applied per file" invariant in §3.

use std::fmt;
use std::fs;
use std::sync::Arc;

use anyhow::Context;
use camino::Utf8Path;
use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;

use crate::error::EngineError;
use crate::mutation_kind::{rewrite_for, MutationKind, TokenKind};
use crate::position::Position;
use crate::shared_ast;
use crate::source::SourceFile;
use crate::span::Span;
use crate::status::Status;

/// How a mutant rewrites its span: a single-token swap, or a structural
/// expression replacement (§3, §4.1). `InvertLogicalNot` is the only
/// expression-rewrite kind.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Rewrite {
    /// Swap `from` for `to`, or delete the token if `to` is `None`
    /// (`InvertNegatives` deletes rather than swaps).
    TokenSwap { from: TokenKind, to: Option<TokenKind> },
    /// Replace the captured original text with `replacement` directly, e.g.
    /// wrapping `!x` as `!(!x)`.
    ExpressionRewrite { replacement: String },
}

impl Rewrite {
    /// The literal text to splice in at the mutant's span.
    pub fn replacement_text(&self, original: &str) -> String {
        match self {
            Rewrite::TokenSwap { to: Some(to), .. } => to.text().to_string(),
            Rewrite::TokenSwap { to: None, .. } => String::new(),
            Rewrite::ExpressionRewrite { replacement } => {
                let _ = original;
                replacement.clone()
            }
        }
    }
}

/// Build the token-swap rewrite for a candidate `(kind, token)` pair, per
/// the `MutationKind -> (TokenKind -> TokenKind)` rewrite table.
///
/// `InvertNegatives` has no destination token in the table, so unary minus
/// is deleted rather than swapped, matching `spec.md` §4.1's description of
/// the walker disambiguating SUBTRACT by arity.
pub fn token_swap_rewrite(kind: MutationKind, token: TokenKind) -> Rewrite {
    Rewrite::TokenSwap {
        from: token,
        to: rewrite_for(kind, token),
    }
}

/// A specific syntactic change at a specific position (§3).
#[derive(Clone)]
pub struct Mutant {
    pub kind: MutationKind,
    pub package: Arc<String>,
    pub source_file: Arc<SourceFile>,
    pub span: Span,
    pub rewrite: Rewrite,
    pub initial_status: Status,
}

/// The retained original bytes needed to roll a mutant back, returned by
/// [`Mutant::apply`].
pub struct RollbackHandle {
    path: camino::Utf8PathBuf,
    original_bytes: Vec<u8>,
}

impl Mutant {
    pub fn position(&self) -> Position {
        Position::from_span_start(self.source_file.tree_relative.clone(), &self.span)
    }

    pub fn source_path(&self) -> &Utf8Path {
        &self.source_file.tree_relative
    }

    pub fn original_file_text(&self) -> &str {
        self.source_file.code()
    }

    /// Text of the mutated span, without touching disk.
    pub fn mutated_code(&self) -> String {
        let original = self.span.extract(self.source_file.code());
        let replacement = self.rewrite.replacement_text(&original);
        self.span.replace(self.source_file.code(), &replacement)
    }

    /// `apply` contract (§4.2), token-swap and expression-rewrite alike:
    /// 1. acquire the per-file lock
    /// 2. read and retain the original bytes from the workdir copy
    /// 3-4. compute the mutated text and write it, removing the existing
    ///    file first so a hard-linked inode is never written through
    /// 5. nothing to restore (no shared mutable AST touched, see module doc)
    /// 6. release the lock (dropped with the guard)
    pub fn apply(&self, workdir: &Utf8Path) -> Result<RollbackHandle, EngineError> {
        let lock = shared_ast::lock_for(&self.source_file.tree_relative);
        let _guard = lock.lock().expect("per-file lock poisoned");
        let path = workdir.join(&self.source_file.tree_relative);
        let original_bytes = fs::read(&path)
            .with_context(|| format!("read {path} before apply"))
            .map_err(|e| EngineError::ApplyFailed(e.to_string()))?;
        let mutated = self.mutated_code();
        fs::remove_file(&path).map_err(|e| EngineError::ApplyFailed(e.to_string()))?;
        fs::write(&path, mutated.as_bytes()).map_err(|e| EngineError::ApplyFailed(e.to_string()))?;
        Ok(RollbackHandle { path, original_bytes })
    }

    /// `rollback` contract (§4.2): write the retained bytes back. No lock is
    /// needed; the file is a plain file by this point.
    pub fn rollback(&self, handle: RollbackHandle) -> Result<(), EngineError> {
        fs::write(&handle.path, &handle.original_bytes)
            .map_err(|e| EngineError::RollbackFailed(e.to_string()))
    }

    pub fn describe(&self) -> String {
        let original = self.span.extract(self.source_file.code());
        let replacement = self.rewrite.replacement_text(&original);
        if replacement.is_empty() {
            format!("delete `{original}` ({:?}) in {}", self.kind, self.source_file.tree_relative_slashes())
        } else {
            format!(
                "replace `{original}` with `{replacement}` ({:?}) in {}",
                self.kind,
                self.source_file.tree_relative_slashes()
            )
        }
    }
}

impl fmt::Debug for Mutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mutant")
            .field("kind", &self.kind)
            .field("package", &self.package)
            .field("file", &self.source_file.tree_relative_slashes())
            .field("span", &self.span)
            .field("initial_status", &self.initial_status)
            .finish()
    }
}

impl Serialize for Mutant {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut ss = serializer.serialize_struct("Mutant", 5)?;
        ss.serialize_field("package", self.package.as_str())?;
        ss.serialize_field("file", &self.source_file.tree_relative_slashes())?;
        ss.serialize_field("kind", &self.kind.slug())?;
        ss.serialize_field("span", &self.span)?;
        ss.serialize_field("status", &self.initial_status)?;
        ss.end()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::span::LineColumn;

    fn make_mutant(code: &str, span: Span, kind: MutationKind, rewrite: Rewrite) -> Mutant {
        let source_file = Arc::new(SourceFile::new_for_test("src/lib.rs", code));
        Mutant {
            kind,
            package: Arc::new("demo".into()),
            source_file,
            span,
            rewrite,
            initial_status: Status::Runnable,
        }
    }

    #[test]
    fn token_swap_produces_replaced_text() {
        let span = Span {
            start: LineColumn { line: 1, column: 12 },
            end: LineColumn { line: 1, column: 13 },
        };
        let mutant = make_mutant(
            "fn f(a: i32, b: i32) -> bool { a > b }\n",
            span,
            MutationKind::ConditionalsBoundary,
            token_swap_rewrite(MutationKind::ConditionalsBoundary, TokenKind::Gt),
        );
        assert!(mutant.mutated_code().contains("a >= b"));
    }

    #[test]
    fn invert_negatives_deletes_the_token() {
        let span = Span {
            start: LineColumn { line: 1, column: 8 },
            end: LineColumn { line: 1, column: 9 },
        };
        let mutant = make_mutant(
            "fn f(x: i32) -> i32 { -x }\n",
            span,
            MutationKind::InvertNegatives,
            token_swap_rewrite(MutationKind::InvertNegatives, TokenKind::Neg),
        );
        assert_eq!(mutant.mutated_code(), "fn f(x: i32) -> i32 { x }\n");
    }

    #[test]
    fn apply_then_rollback_restores_byte_identical_file() {
        let dir = tempfile::tempdir().unwrap();
        let rel = camino::Utf8PathBuf::from("src/lib.rs");
        fs::create_dir_all(dir.path().join("src")).unwrap();
        let workdir = camino::Utf8Path::from_path(dir.path()).unwrap();
        let original = "fn f(a: i32, b: i32) -> bool { a > b }\n";
        fs::write(workdir.join(&rel), original).unwrap();

        let span = Span {
            start: LineColumn { line: 1, column: 32 },
            end: LineColumn { line: 1, column: 33 },
        };
        let mutant = make_mutant(
            original,
            span,
            MutationKind::ConditionalsBoundary,
            token_swap_rewrite(MutationKind::ConditionalsBoundary, TokenKind::Gt),
        );
        let handle = mutant.apply(workdir).unwrap();
        let mutated_on_disk = fs::read_to_string(workdir.join(&rel)).unwrap();
        assert!(mutated_on_disk.contains(">="));
        mutant.rollback(handle).unwrap();
        let restored = fs::read_to_string(workdir.join(&rel)).unwrap();
        assert_eq!(restored, original);
    }
}
