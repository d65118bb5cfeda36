// Copyright 2024 - 2025 Unleash Mutants Contributors

//! The Executor (§4.5): the per-mutant state machine that assigns a
//! workdir, applies the mutation, runs its package's tests, classifies the
//! outcome, and rolls back.
//!
//! `RUN_TESTS` composes a `cargo test` invocation as the Rust-idiomatic
//! analog of the specification's Go-test-flavored contract: `-tags` becomes
//! `--features`, `-cpu` becomes `--test-threads` (passed after `--`), and
//! omitting cargo's own `--no-fail-fast` flag reproduces "stop after the
//! first failing test binary", which is cargo's default and the closest
//! match to `-failfast`. There is no `cargo test --timeout` flag to carry
//! the command-line padding described in the spec, so [`Process::start`]'s
//! single timeout parameter stands in for both the external deadline and
//! the supervising kill: it is given `package_timeout`, which is already
//! enforced by process-group termination (`process.rs`), making the
//! `+2s` padding moot for this port.

use std::sync::Arc;
use std::thread::sleep;
use std::time::{Duration, Instant};

use tracing::warn;

use crate::config::Config;
use crate::log_file::LogFile;
use crate::mutant::Mutant;
use crate::process::{Process, ProcessStatus};
use crate::status::Status;
use crate::timeouts::TimeoutRegistry;
use crate::workdir::WorkdirDealer;

/// Used for a package's first test run, before any observed duration has
/// been recorded in the [`TimeoutRegistry`].
pub const FALLBACK_TEST_TIMEOUT: Duration = Duration::from_secs(300);

/// How frequently to poll the test process for completion, mirroring the
/// teacher's `cargo.rs` `WAIT_POLL_INTERVAL`.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// The outcome of running a single mutant through the executor.
pub struct ExecutedMutant {
    pub mutant: Mutant,
    pub status: Status,
    pub duration: Duration,
}

/// Run one mutant to completion: `ASSIGN_WD -> APPLY -> RUN_TESTS ->
/// classify -> ROLLBACK -> EMIT` (§4.5).
pub fn execute(
    mutant: Mutant,
    worker_id: usize,
    workdir_dealer: &WorkdirDealer,
    timeout_registry: &TimeoutRegistry,
    config: &Config,
    log_file: &mut LogFile,
) -> ExecutedMutant {
    let start = Instant::now();

    if matches!(mutant.initial_status, Status::NotCovered | Status::Skipped) || config.dry_run {
        let status = mutant.initial_status;
        return ExecutedMutant { mutant, status, duration: start.elapsed() };
    }

    let workdir = match workdir_dealer.get(worker_id) {
        Ok(path) => path,
        Err(err) => {
            warn!("failed to assign workdir for worker {worker_id}: {err}");
            return ExecutedMutant { mutant, status: Status::Lived, duration: start.elapsed() };
        }
    };

    let handle = match mutant.apply(&workdir) {
        Ok(handle) => handle,
        Err(err) => {
            warn!("failed to apply {}: {err}", mutant.describe());
            return ExecutedMutant { mutant, status: mutant.initial_status, duration: start.elapsed() };
        }
    };

    let (package_timeout, _present) = timeout_registry.of(&mutant.package);
    let package_timeout = if package_timeout.is_zero() { FALLBACK_TEST_TIMEOUT } else { package_timeout };

    let argv = test_argv(&mutant.package, config);
    let run_start = Instant::now();
    let result = Process::start(&argv, &[], &workdir, package_timeout, log_file).and_then(|mut process| loop {
        if let Some(status) = process.poll()? {
            break Ok(status);
        }
        sleep(WAIT_POLL_INTERVAL);
    });
    let status = match result {
        Ok(ProcessStatus::Exited(2)) => Status::NotViable,
        Ok(ProcessStatus::Exited(1)) => Status::Killed,
        Ok(ProcessStatus::Exited(_)) => Status::Lived,
        Ok(ProcessStatus::Timeout) => Status::TimedOut,
        Err(err) => {
            warn!("failed to run tests for {}: {err}", mutant.describe());
            Status::Lived
        }
    };
    if !matches!(status, Status::TimedOut) {
        timeout_registry.set(&mutant.package, run_start.elapsed());
    }

    if let Err(err) = mutant.rollback(handle) {
        warn!("failed to roll back {}: {err}", mutant.describe());
    }

    ExecutedMutant { mutant, status, duration: start.elapsed() }
}

/// Compose the `cargo test` argv for one package (§4.5 `RUN_TESTS`): the
/// package path by default, or `--workspace` in integration mode, plus
/// `--features` for tags and `--test-threads` for the configured test CPU.
fn test_argv(package: &Arc<String>, config: &Config) -> Vec<String> {
    let mut argv = vec!["cargo".to_string(), "test".to_string()];
    if config.integration {
        argv.push("--workspace".to_string());
    } else {
        argv.push("--package".to_string());
        argv.push(package.as_str().to_string());
    }
    if !config.tags.is_empty() {
        argv.push("--features".to_string());
        argv.push(config.tags.clone());
    }
    if config.test_cpu > 0 {
        argv.push("--".to_string());
        argv.push("--test-threads".to_string());
        argv.push(config.test_cpu.to_string());
    }
    argv
}

#[cfg(test)]
mod test {
    use super::*;

    fn config(integration: bool, tags: &str, test_cpu: usize) -> Config {
        let mut config = Config::default();
        config.integration = integration;
        config.tags = tags.to_string();
        config.test_cpu = test_cpu;
        config
    }

    #[test]
    fn package_mode_names_the_package() {
        let argv = test_argv(&Arc::new("demo".to_string()), &config(false, "", 0));
        assert_eq!(argv, vec!["cargo", "test", "--package", "demo"]);
    }

    #[test]
    fn integration_mode_uses_workspace() {
        let argv = test_argv(&Arc::new("demo".to_string()), &config(true, "", 0));
        assert_eq!(argv, vec!["cargo", "test", "--workspace"]);
    }

    #[test]
    fn tags_become_features() {
        let argv = test_argv(&Arc::new("demo".to_string()), &config(false, "slow", 0));
        assert_eq!(argv, vec!["cargo", "test", "--package", "demo", "--features", "slow"]);
    }

    #[test]
    fn cpu_becomes_test_threads_after_separator() {
        let argv = test_argv(&Arc::new("demo".to_string()), &config(false, "", 4));
        assert_eq!(argv, vec!["cargo", "test", "--package", "demo", "--", "--test-threads", "4"]);
    }
}
