// Copyright 2021 - 2025 Unleash Mutants Contributors

//! Coverage Profile: positions known to be exercised by at least one test
//! (§2, §3, §6).
//!
//! Consumed from a JSON file shaped like
//! `{ "elapsed_secs": 12.5, "blocks": { "file/path.rs": [[start_line,
//! start_col, end_line, end_col], ...] } }` **(added: concrete wire shape
//! for the otherwise-external coverage collaborator)**, mirroring the
//! teacher's use of `serde_json` for similar small data files.
//!
//! `elapsed_secs` is the coverage run's own wall-clock time, used to seed
//! the [Adaptive Timeout Registry](crate::timeouts::TimeoutRegistry) (§4.6):
//! a package's initial test timeout is this value multiplied by the
//! configured coefficient, before any mutant's test run has actually been
//! observed.

use std::collections::HashMap;
use std::fs;
use std::time::Duration;

use anyhow::Context;
use camino::Utf8Path;
use serde::Deserialize;

use crate::position::Position;
use crate::Result;

/// A covered block: `{start_line, start_col, end_line, end_col}` (§3).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize)]
pub struct CoveredBlock {
    pub start_line: usize,
    pub start_col: usize,
    pub end_line: usize,
    pub end_col: usize,
}

impl From<[usize; 4]> for CoveredBlock {
    fn from(q: [usize; 4]) -> Self {
        CoveredBlock {
            start_line: q[0],
            start_col: q[1],
            end_line: q[2],
            end_col: q[3],
        }
    }
}

/// `file -> ordered list of covered blocks` (§3).
#[derive(Debug, Clone, Default)]
pub struct CoverageProfile {
    blocks: HashMap<String, Vec<CoveredBlock>>,
}

#[derive(Deserialize)]
#[serde(default)]
struct RawProfile {
    elapsed_secs: f64,
    blocks: HashMap<String, Vec<[usize; 4]>>,
}

impl Default for RawProfile {
    fn default() -> Self {
        RawProfile { elapsed_secs: 0.0, blocks: HashMap::new() }
    }
}

impl CoverageProfile {
    pub fn empty() -> CoverageProfile {
        CoverageProfile::default()
    }

    pub fn parse(json: &str) -> Result<CoverageProfile> {
        Ok(CoverageResult::parse(json)?.profile)
    }

    /// Whether `position` is covered (§3 lookup rule):
    /// * some block for its file strictly spans the line, or
    /// * is single-line and the column is within `[start_col, end_col]`, or
    /// * is multiline and either (first line, column ≥ start_col) or
    ///   (last line, column ≤ end_col).
    pub fn is_covered(&self, position: &Position) -> bool {
        let Some(blocks) = self.blocks.get(position.file.as_str()) else {
            return false;
        };
        let line = position.line;
        let column = position.column;
        blocks.iter().any(|b| {
            if b.start_line == b.end_line {
                line == b.start_line && (b.start_col..=b.end_col).contains(&column)
            } else if line > b.start_line && line < b.end_line {
                true
            } else if line == b.start_line {
                column >= b.start_col
            } else if line == b.end_line {
                column <= b.end_col
            } else {
                false
            }
        })
    }
}

/// A coverage result `{profile, elapsed_duration}` (§6).
#[derive(Debug, Clone)]
pub struct CoverageResult {
    pub profile: CoverageProfile,
    pub elapsed: Duration,
}

impl CoverageResult {
    /// An empty profile with no elapsed time, used when `--coverage` is not
    /// given (§6): the timeout registry is then only ever seeded from
    /// observed test-run durations.
    pub fn empty() -> CoverageResult {
        CoverageResult { profile: CoverageProfile::empty(), elapsed: Duration::ZERO }
    }

    /// Parse the JSON wire shape from a file.
    pub fn read_file(path: &Utf8Path) -> Result<CoverageResult> {
        let text = fs::read_to_string(path).with_context(|| format!("read coverage profile {path}"))?;
        Self::parse(&text)
    }

    pub fn parse(json: &str) -> Result<CoverageResult> {
        let raw: RawProfile = serde_json::from_str(json).context("parse coverage profile json")?;
        let blocks = raw
            .blocks
            .into_iter()
            .map(|(file, quads)| (file, quads.into_iter().map(CoveredBlock::from).collect()))
            .collect();
        Ok(CoverageResult {
            profile: CoverageProfile { blocks },
            elapsed: Duration::from_secs_f64(raw.elapsed_secs.max(0.0)),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn pos(file: &str, line: usize, column: usize) -> Position {
        Position::new(file.into(), line, column)
    }

    #[test]
    fn single_line_block_covers_inside_columns_only() {
        let profile = CoverageProfile::parse(r#"{"blocks": {"a.rs": [[3, 5, 3, 10]]}}"#).unwrap();
        assert!(profile.is_covered(&pos("a.rs", 3, 5)));
        assert!(profile.is_covered(&pos("a.rs", 3, 10)));
        assert!(!profile.is_covered(&pos("a.rs", 3, 11)));
        assert!(!profile.is_covered(&pos("a.rs", 2, 5)));
    }

    #[test]
    fn multiline_block_covers_middle_lines_fully() {
        let profile = CoverageProfile::parse(r#"{"blocks": {"a.rs": [[2, 10, 5, 3]]}}"#).unwrap();
        assert!(profile.is_covered(&pos("a.rs", 3, 1)));
        assert!(profile.is_covered(&pos("a.rs", 2, 10)));
        assert!(!profile.is_covered(&pos("a.rs", 2, 1)));
        assert!(profile.is_covered(&pos("a.rs", 5, 3)));
        assert!(!profile.is_covered(&pos("a.rs", 5, 4)));
    }

    #[test]
    fn unlisted_file_is_not_covered() {
        let profile = CoverageProfile::parse(r#"{"blocks": {"a.rs": [[1, 1, 1, 5]]}}"#).unwrap();
        assert!(!profile.is_covered(&pos("b.rs", 1, 1)));
    }

    #[test]
    fn empty_profile_covers_nothing() {
        assert!(!CoverageProfile::empty().is_covered(&pos("a.rs", 1, 1)));
    }

    #[test]
    fn elapsed_secs_is_parsed_into_a_duration() {
        let result = CoverageResult::parse(r#"{"elapsed_secs": 12.5, "blocks": {"a.rs": [[1, 1, 1, 5]]}}"#).unwrap();
        assert_eq!(result.elapsed, Duration::from_secs_f64(12.5));
        assert!(result.profile.is_covered(&pos("a.rs", 1, 1)));
    }

    #[test]
    fn missing_elapsed_secs_defaults_to_zero() {
        let result = CoverageResult::parse(r#"{"blocks": {"a.rs": [[1, 1, 1, 5]]}}"#).unwrap();
        assert_eq!(result.elapsed, Duration::ZERO);
    }
}
