// Copyright 2022 - 2025 Unleash Mutants Contributors

//! `.unleash/config.toml` configuration file, merged under CLI flags, and a
//! process-wide read/write-locked accessor so that the test harness and the
//! engine can both read and write configuration concurrently (§5, §9).

use std::fs::read_to_string;
use std::sync::{OnceLock, RwLock};

use anyhow::Context;
use camino::Utf8Path;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::mutation_kind::MutationKind;
use crate::Result;

/// Per-kind settings nested under `[mutants.<kind-slug>]`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct KindConfig {
    pub enabled: Option<bool>,
}

/// Configuration read from `.unleash/config.toml` (§6), merged under CLI
/// flags by [`Config::merge_cli`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub dry_run: bool,
    pub tags: String,
    pub integration: bool,
    pub workers: usize,
    pub test_cpu: usize,
    pub timeout_coefficient: f64,
    pub threshold_efficacy: f64,
    pub threshold_mcover: f64,
    pub output: String,
    pub output_statuses: String,
    pub examine_globs: Vec<String>,
    pub exclude_globs: Vec<String>,
    pub coverage: String,
    pub in_diff: String,
    #[serde(default)]
    pub mutants: BTreeMap<String, KindConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            dry_run: false,
            tags: String::new(),
            integration: false,
            workers: 0,
            test_cpu: 0,
            timeout_coefficient: 0.0,
            threshold_efficacy: 0.0,
            threshold_mcover: 0.0,
            output: String::new(),
            output_statuses: String::new(),
            examine_globs: Vec::new(),
            exclude_globs: Vec::new(),
            coverage: String::new(),
            in_diff: String::new(),
            mutants: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn read_file(path: &Utf8Path) -> Result<Config> {
        let toml = read_to_string(path).with_context(|| format!("read config {path:?}"))?;
        toml::de::from_str(&toml).with_context(|| format!("parse toml from {path:?}"))
    }

    /// Read `<root>/.unleash/config.toml`, defaulting if it does not exist.
    pub fn read_tree_config(root: &Utf8Path) -> Result<Config> {
        let path = root.join(".unleash").join("config.toml");
        if path.exists() {
            Config::read_file(&path)
        } else {
            Ok(Config::default())
        }
    }

    /// Whether a mutation kind is enabled: explicit per-kind config wins,
    /// otherwise [`MutationKind::default_enabled`].
    pub fn kind_enabled(&self, kind: MutationKind) -> bool {
        self.mutants
            .get(&kind.slug())
            .and_then(|k| k.enabled)
            .unwrap_or_else(|| kind.default_enabled())
    }

    /// The effective timeout coefficient: `0` in config means "use the
    /// default" (§6).
    pub fn timeout_coefficient(&self) -> f64 {
        if self.timeout_coefficient == 0.0 {
            crate::timeouts::DEFAULT_TIMEOUT_COEFFICIENT
        } else {
            self.timeout_coefficient
        }
    }

    /// Overlay non-default CLI values on top of a file-loaded config.
    pub fn merge_cli(mut self, cli: &crate::args::CliArgs) -> Config {
        if cli.dry_run {
            self.dry_run = true;
        }
        if let Some(tags) = &cli.tags {
            self.tags = tags.clone();
        }
        if cli.integration {
            self.integration = true;
        }
        if let Some(workers) = cli.workers {
            self.workers = workers;
        }
        if let Some(test_cpu) = cli.test_cpu {
            self.test_cpu = test_cpu;
        }
        if let Some(c) = cli.timeout_coefficient {
            self.timeout_coefficient = c;
        }
        if let Some(t) = cli.threshold_efficacy {
            self.threshold_efficacy = t;
        }
        if let Some(t) = cli.threshold_mcover {
            self.threshold_mcover = t;
        }
        if let Some(output) = &cli.output {
            self.output = output.clone();
        }
        if let Some(statuses) = &cli.output_statuses {
            self.output_statuses = statuses.clone();
        }
        self.exclude_globs.extend(cli.exclude.iter().cloned());
        if let Some(coverage) = &cli.coverage {
            self.coverage = coverage.to_string();
        }
        if let Some(in_diff) = &cli.in_diff {
            self.in_diff = in_diff.to_string();
        }
        for slug in &cli.disable {
            self.mutants.entry(slug.clone()).or_default().enabled = Some(false);
        }
        self
    }
}

static GLOBAL_CONFIG: OnceLock<RwLock<Config>> = OnceLock::new();

fn cell() -> &'static RwLock<Config> {
    GLOBAL_CONFIG.get_or_init(|| RwLock::new(Config::default()))
}

/// Install a new process-wide configuration, replacing any previous value.
pub fn install(config: Config) {
    *cell().write().expect("config lock poisoned") = config;
}

/// Read the process-wide configuration.
///
/// Returns a clone so the lock is not held across the call site; this is
/// the cheap generic accessor prescribed by §9 rather than a typed
/// single-field `get<T>`, since [`Config`] is already a small flat struct.
pub fn current() -> Config {
    cell().read().expect("config lock poisoned").clone()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_config_has_empty_overrides() {
        let config = Config::default();
        assert!(!config.dry_run);
        assert_eq!(config.workers, 0);
        assert_eq!(config.timeout_coefficient(), crate::timeouts::DEFAULT_TIMEOUT_COEFFICIENT);
    }

    #[test]
    fn kind_enabled_falls_back_to_default() {
        let config = Config::default();
        assert!(config.kind_enabled(MutationKind::ArithmeticBase));
        assert!(!config.kind_enabled(MutationKind::InvertLogical));
    }

    #[test]
    fn explicit_kind_config_overrides_default() {
        let mut config = Config::default();
        config.mutants.insert(
            MutationKind::InvertLogical.slug(),
            KindConfig { enabled: Some(true) },
        );
        assert!(config.kind_enabled(MutationKind::InvertLogical));
    }

    #[test]
    fn install_then_current_round_trips() {
        let mut config = Config::default();
        config.dry_run = true;
        install(config.clone());
        assert_eq!(current().dry_run, true);
        install(Config::default());
    }
}
