// Copyright 2024 - 2025 Unleash Mutants Contributors

//! Aggregator & Thresholds (§4.7): accumulates the executor's emitted
//! stream into a `Results` record, computes efficacy/coverage, and
//! serialises the documented JSON shape (§6).
//!
//! Grounded in the teacher's `outcome.rs` `LabOutcome` (a status-keyed
//! counter with an `add`/`count` accumulation API), generalised from the
//! teacher's 5-status enum to this crate's 7-status [`Status`] and from a
//! single derived exit code to the two threshold-gated [`EngineError`]
//! kinds.

use std::collections::BTreeMap;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::Serialize;

use crate::error::EngineError;
use crate::executor::ExecutedMutant;
use crate::mutation_kind::MutationKind;
use crate::status::Status;

/// Accumulates executed mutants by status and by file, for later
/// serialisation into a `Results` record.
#[derive(Default)]
pub struct Aggregator {
    count_by_status: BTreeMap<&'static str, usize>,
    count_by_kind: BTreeMap<String, usize>,
    by_file: BTreeMap<Utf8PathBuf, Vec<MutationEntry>>,
    total: usize,
}

impl Aggregator {
    pub fn new() -> Aggregator {
        Aggregator::default()
    }

    /// Record one executed (or skipped) mutant (§4.7 "consumes the emitted
    /// stream until closed").
    pub fn add(&mut self, executed: &ExecutedMutant) {
        self.total += 1;
        *self.count_by_status.entry(status_key(executed.status)).or_default() += 1;
        *self.count_by_kind.entry(executed.mutant.kind.slug()).or_default() += 1;
        let position = executed.mutant.position();
        self.by_file.entry(position.file.clone()).or_default().push(MutationEntry {
            kind: executed.mutant.kind.slug(),
            status: executed.status,
            line: position.line,
            column: position.column,
        });
    }

    fn count(&self, key: &str) -> usize {
        self.count_by_status.get(key).copied().unwrap_or(0)
    }

    /// Finish accumulating and compute the final [`Results`] record,
    /// including the derived metrics (§4.7).
    pub fn finish(self, module: String, elapsed: Duration, dry_run: bool) -> Results {
        let killed = self.count("killed");
        let lived = self.count("lived");
        let not_covered = self.count("not_covered");
        let runnable = self.count("runnable");

        let efficacy = percentage(killed, killed + lived);
        let mutant_coverage = if dry_run {
            percentage(runnable, runnable + not_covered)
        } else {
            percentage(killed + lived, killed + lived + not_covered)
        };

        Results {
            module,
            elapsed,
            total: self.total,
            killed,
            lived,
            not_viable: self.count("not_viable"),
            not_covered,
            efficacy,
            mutant_coverage,
            mutator_statistics: self.count_by_kind.into_iter().filter(|&(_, n)| n > 0).collect(),
            files: self
                .by_file
                .into_iter()
                .map(|(file_name, mutations)| FileEntry { file_name, mutations })
                .collect(),
        }
    }
}

fn status_key(status: Status) -> &'static str {
    match status {
        Status::NotCovered => "not_covered",
        Status::Runnable => "runnable",
        Status::Skipped => "skipped",
        Status::Lived => "lived",
        Status::Killed => "killed",
        Status::TimedOut => "timed_out",
        Status::NotViable => "not_viable",
    }
}

/// `killed / (killed + lived) * 100` and friends: zero-protected, the
/// documented denominator check before division (§4.7).
fn percentage(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        (numerator as f64 / denominator as f64) * 100.0
    }
}

/// One mutation within a file, in the shape documented for `files[]`
/// entries in §6.
#[derive(Debug, Clone, Serialize)]
pub struct MutationEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub status: Status,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileEntry {
    pub file_name: Utf8PathBuf,
    pub mutations: Vec<MutationEntry>,
}

/// The run-level record returned from `run` (§6): `{ module, elapsed,
/// mutants: [...] }`, generalised here to carry everything needed for both
/// the in-process caller and the JSON output file.
#[derive(Debug, Clone)]
pub struct Results {
    pub module: String,
    pub elapsed: Duration,
    pub total: usize,
    pub killed: usize,
    pub lived: usize,
    pub not_viable: usize,
    pub not_covered: usize,
    pub efficacy: f64,
    pub mutant_coverage: f64,
    pub mutator_statistics: BTreeMap<String, usize>,
    pub files: Vec<FileEntry>,
}

impl Results {
    /// Check the run against configured thresholds (§4.7): thresholds of
    /// zero are disabled, dry runs never fail thresholds, and a measured
    /// value *at or below* (`<=`) the threshold fails the run.
    pub fn check_thresholds(
        &self,
        threshold_efficacy: f64,
        threshold_mcover: f64,
        dry_run: bool,
    ) -> Result<(), EngineError> {
        if dry_run {
            return Ok(());
        }
        if threshold_efficacy > 0.0 && self.efficacy <= threshold_efficacy {
            return Err(EngineError::EfficacyBelowThreshold {
                measured: self.efficacy,
                threshold: threshold_efficacy,
            });
        }
        if threshold_mcover > 0.0 && self.mutant_coverage <= threshold_mcover {
            return Err(EngineError::CoverageBelowThreshold {
                measured: self.mutant_coverage,
                threshold: threshold_mcover,
            });
        }
        Ok(())
    }

    /// Serialise into the exact JSON shape documented in §6.
    pub fn to_json_document(&self) -> JsonResults {
        JsonResults {
            go_module: self.module.clone(),
            files: self.files.clone(),
            test_efficacy: self.efficacy,
            mutations_coverage: self.mutant_coverage,
            mutants_total: self.total,
            mutants_killed: self.killed,
            mutants_lived: self.lived,
            mutants_not_viable: self.not_viable,
            mutants_not_covered: self.not_covered,
            elapsed_time: self.elapsed.as_secs_f64(),
            mutator_statistics: self.mutator_statistics.clone(),
        }
    }
}

/// The literal wire shape of the output JSON file (§6). `go_module` keeps
/// the name the specification documents verbatim, rather than being
/// renamed to fit this crate's own vocabulary.
#[derive(Debug, Clone, Serialize)]
pub struct JsonResults {
    pub go_module: String,
    pub files: Vec<FileEntry>,
    pub test_efficacy: f64,
    pub mutations_coverage: f64,
    pub mutants_total: usize,
    pub mutants_killed: usize,
    pub mutants_lived: usize,
    pub mutants_not_viable: usize,
    pub mutants_not_covered: usize,
    pub elapsed_time: f64,
    pub mutator_statistics: BTreeMap<String, usize>,
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mutant::{token_swap_rewrite, Mutant};
    use crate::mutation_kind::TokenKind;
    use crate::source::SourceFile;
    use crate::span::{LineColumn, Span};
    use std::sync::Arc;

    fn executed(status: Status, kind: MutationKind) -> ExecutedMutant {
        let source_file = Arc::new(SourceFile::new_for_test("src/lib.rs", "fn f() { a > b }\n"));
        let span = Span { start: LineColumn { line: 1, column: 11 }, end: LineColumn { line: 1, column: 12 } };
        let mutant = Mutant {
            kind,
            package: Arc::new("demo".into()),
            source_file,
            span,
            rewrite: token_swap_rewrite(kind, TokenKind::Gt),
            initial_status: status,
        };
        ExecutedMutant { mutant, status, duration: Duration::from_millis(1) }
    }

    #[test]
    fn efficacy_and_coverage_are_zero_protected_when_empty() {
        let aggregator = Aggregator::new();
        let results = aggregator.finish("demo".into(), Duration::ZERO, false);
        assert_eq!(results.efficacy, 0.0);
        assert_eq!(results.mutant_coverage, 0.0);
    }

    #[test]
    fn efficacy_counts_killed_over_killed_plus_lived() {
        let mut aggregator = Aggregator::new();
        aggregator.add(&executed(Status::Killed, MutationKind::ConditionalsBoundary));
        aggregator.add(&executed(Status::Lived, MutationKind::ConditionalsNegation));
        let results = aggregator.finish("demo".into(), Duration::ZERO, false);
        assert_eq!(results.efficacy, 50.0);
    }

    #[test]
    fn timed_out_is_excluded_from_efficacy_and_coverage() {
        let mut aggregator = Aggregator::new();
        aggregator.add(&executed(Status::Killed, MutationKind::ConditionalsBoundary));
        aggregator.add(&executed(Status::TimedOut, MutationKind::ConditionalsNegation));
        let results = aggregator.finish("demo".into(), Duration::ZERO, false);
        assert_eq!(results.efficacy, 100.0);
        assert_eq!(results.total, 2);
    }

    #[test]
    fn dry_run_coverage_uses_runnable_over_runnable_plus_not_covered() {
        let mut aggregator = Aggregator::new();
        aggregator.add(&executed(Status::Runnable, MutationKind::ConditionalsBoundary));
        aggregator.add(&executed(Status::NotCovered, MutationKind::ConditionalsNegation));
        let results = aggregator.finish("demo".into(), Duration::ZERO, true);
        assert_eq!(results.mutant_coverage, 50.0);
    }

    #[test]
    fn mutator_statistics_omit_zero_counts() {
        let mut aggregator = Aggregator::new();
        aggregator.add(&executed(Status::Killed, MutationKind::ConditionalsBoundary));
        let results = aggregator.finish("demo".into(), Duration::ZERO, false);
        assert_eq!(results.mutator_statistics.len(), 1);
        assert!(results.mutator_statistics.contains_key(&MutationKind::ConditionalsBoundary.slug()));
    }

    #[test]
    fn threshold_at_or_below_fails_the_run() {
        let mut aggregator = Aggregator::new();
        aggregator.add(&executed(Status::Killed, MutationKind::ConditionalsBoundary));
        aggregator.add(&executed(Status::Lived, MutationKind::ConditionalsNegation));
        let results = aggregator.finish("demo".into(), Duration::ZERO, false);
        assert_eq!(results.efficacy, 50.0);
        assert!(results.check_thresholds(50.0, 0.0, false).is_err());
        assert!(results.check_thresholds(49.0, 0.0, false).is_ok());
    }

    #[test]
    fn dry_run_never_fails_thresholds() {
        let aggregator = Aggregator::new();
        let results = aggregator.finish("demo".into(), Duration::ZERO, true);
        assert!(results.check_thresholds(100.0, 100.0, true).is_ok());
    }

    #[test]
    fn not_viable_is_counted_and_excluded_from_efficacy() {
        let mut aggregator = Aggregator::new();
        aggregator.add(&executed(Status::Killed, MutationKind::ConditionalsBoundary));
        aggregator.add(&executed(Status::NotViable, MutationKind::ConditionalsNegation));
        let results = aggregator.finish("demo".into(), Duration::ZERO, false);
        assert_eq!(results.not_viable, 1);
        assert_eq!(results.efficacy, 100.0);
        assert_eq!(results.to_json_document().mutants_not_viable, 1);
    }
}
