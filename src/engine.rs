// Copyright 2024 - 2025 Unleash Mutants Contributors

//! Top-level orchestration: discovery streams mutants, the worker pool
//! dispatches them to the executor, and the aggregator folds the results
//! into a `Results` record (§2 "Control flow").
//!
//! The `unleash.out/log` directory and its rotate-on-rerun behaviour are
//! adapted from the teacher's `output.rs` `OutputDir::new`.

use std::fs;
use std::sync::Arc;
use std::time::Instant;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{info, warn};

use crate::aggregator::{Aggregator, Results};
use crate::config::Config;
use crate::coverage::CoverageResult;
use crate::diff::DiffScope;
use crate::error::EngineError;
use crate::exclude::ExclusionRules;
use crate::executor;
use crate::interrupt::check_interrupted;
use crate::log_file::LogFile;
use crate::module::ModuleDescriptor;
use crate::source::{discover_source_files, SourceFile};
use crate::status::Status;
use crate::timeouts::TimeoutRegistry;
use crate::visitor::{derive_package_name, discover_file};
use crate::worker_pool::{run_pool, worker_count};
use crate::workdir::WorkdirDealer;

const OUTDIR_NAME: &str = "unleash.out";
const ROTATED_NAME: &str = "unleash.out.old";

/// Run a full mutation-testing pass over `module` under `config`.
pub fn run(module: &ModuleDescriptor, config: &Config) -> Result<Results, EngineError> {
    let start = Instant::now();
    let log_dir = prepare_output_dir(&module.root_dir)?;

    let rules = ExclusionRules::new(&config.exclude_globs)
        .map_err(|e| EngineError::ConfigInvalid(e.to_string()))?;
    let relative_paths =
        discover_source_files(&module.root_dir, &rules).map_err(|e| EngineError::ModuleNotFound(e.to_string()))?;

    let coverage = if config.coverage.is_empty() {
        CoverageResult::empty()
    } else {
        CoverageResult::read_file(Utf8Path::new(&config.coverage))
            .map_err(|e| EngineError::ConfigInvalid(e.to_string()))?
    };
    let diff_scope = if config.in_diff.is_empty() {
        DiffScope::default()
    } else {
        let text = fs::read_to_string(&config.in_diff).map_err(|e| EngineError::ConfigInvalid(e.to_string()))?;
        DiffScope::parse(&text).map_err(|e| EngineError::ConfigInvalid(e.to_string()))?
    };

    let workdir_dealer = WorkdirDealer::new(module.root_dir.clone(), &module.name);
    let timeout_registry = TimeoutRegistry::new(config.timeout_coefficient());

    let mut mutants = Vec::new();
    let mut seeded_packages = std::collections::HashSet::new();
    for relative in &relative_paths {
        check_interrupted().map_err(|e| EngineError::ModuleNotFound(e.to_string()))?;
        let package = Arc::new(derive_package_name(&module.name, relative));
        let source_file = Arc::new(
            SourceFile::new(&module.root_dir, relative, Arc::clone(&package))
                .map_err(|e| EngineError::ModuleNotFound(e.to_string()))?,
        );
        if source_file.is_test_file() {
            continue;
        }
        if !coverage.elapsed.is_zero() && seeded_packages.insert(Arc::clone(&package)) {
            timeout_registry.set(&package, coverage.elapsed.mul_f64(config.timeout_coefficient()));
        }
        match discover_file(Arc::clone(&source_file), config, &coverage.profile, &diff_scope) {
            Ok(found) => mutants.extend(found),
            Err(err) => warn!("failed to parse {}: {err}", source_file.tree_relative_slashes()),
        }
    }
    info!("discovered {} mutants", mutants.len());

    let n = worker_count(config.workers, config.integration);

    let executed = run_pool(n, mutants, |worker_id, mutant| {
        let mut log_file = match LogFile::create_in(&log_dir, &mutant.describe()) {
            Ok(log_file) => log_file,
            Err(err) => {
                warn!("failed to create log file: {err}");
                return executor::ExecutedMutant {
                    status: mutant.initial_status,
                    duration: std::time::Duration::ZERO,
                    mutant,
                };
            }
        };
        let executed = executor::execute(mutant, worker_id, &workdir_dealer, &timeout_registry, config, &mut log_file);
        if !output_selected(config, executed.status) {
            log_file.discard();
        }
        executed
    });

    let mut aggregator = Aggregator::new();
    for executed_mutant in &executed {
        aggregator.add(executed_mutant);
    }
    let results = aggregator.finish(module.name.clone(), start.elapsed(), config.dry_run);

    if !config.output.is_empty() {
        if let Err(err) = write_output(&module.root_dir, &config.output, &results) {
            warn!("failed to write output: {err}");
        }
    }

    results.check_thresholds(config.threshold_efficacy, config.threshold_mcover, config.dry_run)?;
    Ok(results)
}

/// Whether a mutant's log belongs in the `unleash.out/log` directory (§2,
/// §6 `output-statuses`): an empty `output_statuses` means "log everything";
/// otherwise only mutants whose [`Status::output_letter`] appears in the
/// configured string keep their log file.
fn output_selected(config: &Config, status: Status) -> bool {
    config.output_statuses.is_empty() || config.output_statuses.contains(status.output_letter())
}

/// Create (or rotate) `<root>/unleash.out/log`, mirroring the teacher's
/// `OutputDir::new` rotate-to-`.old` behaviour.
fn prepare_output_dir(root: &camino::Utf8Path) -> Result<Utf8PathBuf, EngineError> {
    let path = root.join(OUTDIR_NAME);
    if path.exists() {
        let rotated = root.join(ROTATED_NAME);
        if rotated.exists() {
            fs::remove_dir_all(&rotated).map_err(|e| EngineError::WorkdirCreate(e.to_string()))?;
        }
        fs::rename(&path, &rotated).map_err(|e| EngineError::WorkdirCreate(e.to_string()))?;
    }
    let log_dir = path.join("log");
    fs::create_dir_all(&log_dir).map_err(|e| EngineError::WorkdirCreate(e.to_string()))?;
    Ok(log_dir)
}

fn write_output(root: &camino::Utf8Path, output: &str, results: &Results) -> anyhow::Result<()> {
    let path = root.join(output);
    let json = serde_json::to_string_pretty(&results.to_json_document())?;
    fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_output_statuses_selects_everything() {
        let config = Config::default();
        assert!(output_selected(&config, Status::Lived));
        assert!(output_selected(&config, Status::Killed));
    }

    #[test]
    fn output_statuses_filters_to_the_configured_letters() {
        let mut config = Config::default();
        config.output_statuses = "lv".to_string();
        assert!(output_selected(&config, Status::Lived));
        assert!(output_selected(&config, Status::NotViable));
        assert!(!output_selected(&config, Status::Killed));
        assert!(!output_selected(&config, Status::TimedOut));
    }
}
