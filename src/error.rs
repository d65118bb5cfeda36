// Copyright 2021 - 2025 Unleash Mutants Contributors

//! `EngineError`: the closed set of error kinds in §7, with manual
//! `Display`/`std::error::Error` impls, mirroring the teacher's
//! `DiffFilterError` pattern in `in_diff.rs`.

use std::fmt;

use crate::exit_code;

/// An error produced by the engine, with an associated §7 policy.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum EngineError {
    /// Configuration failed to parse or validate. Fatal; returned to the caller.
    ConfigInvalid(String),
    /// The module descriptor could not be resolved. Fatal; returned to the caller.
    ModuleNotFound(String),
    /// The Workdir Dealer could not create a worker's tree copy. Fatal for
    /// that worker; there is no sane continuation.
    WorkdirCreate(String),
    /// A mutant failed to apply. Logged and skipped; the mutant is not emitted.
    ApplyFailed(String),
    /// A mutant failed to roll back. Logged; the mutant is still emitted
    /// with its computed status.
    RollbackFailed(String),
    /// The test process could not be launched or its exit status could not
    /// be classified.
    TestLaunchFailed(String),
    /// The JSON output file could not be written. Logged; the run does not fail.
    OutputWriteFailed(String),
    /// Measured efficacy fell at or below `threshold_efficacy`.
    EfficacyBelowThreshold { measured: f64, threshold: f64 },
    /// Measured mutant coverage fell at or below `threshold_mcover`.
    CoverageBelowThreshold { measured: f64, threshold: f64 },
}

impl EngineError {
    /// Whether this error should abort the whole run (§7 "fatal" kinds).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EngineError::ConfigInvalid(_) | EngineError::ModuleNotFound(_) | EngineError::WorkdirCreate(_)
        )
    }

    /// The process exit code this error should surface as, for the kinds
    /// that are meant to reach the CLI boundary (§6, §7).
    pub fn exit_code(&self) -> i32 {
        match self {
            EngineError::ConfigInvalid(_) | EngineError::ModuleNotFound(_) => exit_code::USAGE,
            EngineError::WorkdirCreate(_) | EngineError::TestLaunchFailed(_) => exit_code::SOFTWARE,
            EngineError::ApplyFailed(_) | EngineError::RollbackFailed(_) | EngineError::OutputWriteFailed(_) => {
                exit_code::SUCCESS
            }
            EngineError::EfficacyBelowThreshold { .. } => exit_code::EFFICACY_BELOW_THRESHOLD,
            EngineError::CoverageBelowThreshold { .. } => exit_code::COVERAGE_BELOW_THRESHOLD,
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::ConfigInvalid(msg) => write!(f, "invalid configuration: {msg}"),
            EngineError::ModuleNotFound(msg) => write!(f, "module not found: {msg}"),
            EngineError::WorkdirCreate(msg) => write!(f, "failed to create workdir: {msg}"),
            EngineError::ApplyFailed(msg) => write!(f, "failed to apply mutant: {msg}"),
            EngineError::RollbackFailed(msg) => write!(f, "failed to roll back mutant: {msg}"),
            EngineError::TestLaunchFailed(msg) => write!(f, "failed to launch test process: {msg}"),
            EngineError::OutputWriteFailed(msg) => write!(f, "failed to write output: {msg}"),
            EngineError::EfficacyBelowThreshold { measured, threshold } => write!(
                f,
                "efficacy {measured:.2}% is at or below the threshold of {threshold:.2}%"
            ),
            EngineError::CoverageBelowThreshold { measured, threshold } => write!(
                f,
                "mutant coverage {measured:.2}% is at or below the threshold of {threshold:.2}%"
            ),
        }
    }
}

impl std::error::Error for EngineError {}
