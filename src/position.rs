// Copyright 2021 - 2025 Unleash Mutants Contributors

//! A source position, identifying a location in the *original* source tree.
//!
//! Unlike [`crate::span::Span`], which describes a region to be rewritten,
//! a [`Position`] identifies a single point and is what coverage profiles,
//! diffs, and reported mutants key off.

use std::fmt;

use camino::Utf8PathBuf;
use serde::Serialize;

use crate::span::Span;

/// A single point in a source file, keyed to the original (unmutated) tree.
#[derive(Clone, Eq, PartialEq, Hash, Serialize)]
pub struct Position {
    /// Path of the file, relative to the tree root, with forward slashes.
    pub file: Utf8PathBuf,
    /// 1-based line number.
    pub line: usize,
    /// 1-based column, measured in chars.
    pub column: usize,
}

impl Position {
    pub fn new(file: Utf8PathBuf, line: usize, column: usize) -> Position {
        debug_assert!(line >= 1);
        debug_assert!(column >= 1);
        Position { file, line, column }
    }

    /// The position at the start of a span within `file`.
    pub fn from_span_start(file: Utf8PathBuf, span: &Span) -> Position {
        Position::new(file, span.start.line, span.start.column)
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn equality_is_structural() {
        let a = Position::new("src/lib.rs".into(), 3, 4);
        let b = Position::new("src/lib.rs".into(), 3, 4);
        let c = Position::new("src/lib.rs".into(), 3, 5);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn display_form() {
        let p = Position::new("src/lib.rs".into(), 3, 4);
        assert_eq!(p.to_string(), "src/lib.rs:3:4");
    }
}
