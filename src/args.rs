// Copyright 2024 - 2025 Unleash Mutants Contributors

//! Command-line interface (§6): `unleash [path]`, aliased `run`/`r`, with
//! flags mirroring the configuration keys, built with `clap`'s derive API
//! the way the rest of the pack builds CLIs (see `cli/args.rs` in the
//! package-manager example), rather than the teacher's own `argh`-based
//! `main.rs::Args`.

use camino::Utf8PathBuf;
use clap::Parser;

/// Inject small syntactic mutations into a Rust crate and see if the test
/// suite catches them.
#[derive(Parser, Debug)]
#[command(name = "cargo-unleash")]
#[command(bin_name = "cargo")]
#[command(version)]
pub enum Cargo {
    #[command(name = "unleash", visible_aliases = ["run", "r"])]
    Unleash(CliArgs),
}

#[derive(Parser, Debug, Default)]
pub struct CliArgs {
    /// Directory of the crate to examine; defaults to the current directory.
    #[arg(default_value = ".")]
    pub path: Utf8PathBuf,

    /// Only see whether each mutant builds and is covered; never run tests.
    #[arg(long)]
    pub dry_run: bool,

    /// Cargo feature flags to pass through to `cargo test --features`.
    #[arg(long)]
    pub tags: Option<String>,

    /// Test the whole workspace rather than one package at a time.
    #[arg(long)]
    pub integration: bool,

    /// Number of worker threads; 0 selects the CPU count.
    #[arg(long)]
    pub workers: Option<usize>,

    /// Passed to `cargo test -- --test-threads`; 0 leaves it unset.
    #[arg(long)]
    pub test_cpu: Option<usize>,

    /// Multiplier applied to a package's first observed test duration; 0
    /// selects the default of 4.0.
    #[arg(long)]
    pub timeout_coefficient: Option<f64>,

    /// Fail the run if efficacy is at or below this percentage.
    #[arg(long)]
    pub threshold_efficacy: Option<f64>,

    /// Fail the run if mutant coverage is at or below this percentage.
    #[arg(long)]
    pub threshold_mcover: Option<f64>,

    /// Write the JSON results document to this path.
    #[arg(long)]
    pub output: Option<String>,

    /// Restrict logged mutants to these status letters (`l,c,t,k,v,s,r`).
    #[arg(long)]
    pub output_statuses: Option<String>,

    /// Regular expressions for files or mutants to exclude; may repeat.
    #[arg(long)]
    pub exclude: Vec<String>,

    /// Mutation kind slugs to disable; may repeat.
    #[arg(long)]
    pub disable: Vec<String>,

    /// Only test mutants intersecting this unified diff file.
    #[arg(long)]
    pub in_diff: Option<Utf8PathBuf>,

    /// Coverage profile JSON file; without one every mutant starts out
    /// `NotCovered` and is never run.
    #[arg(long)]
    pub coverage: Option<Utf8PathBuf>,
}

#[cfg(test)]
mod test {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cargo::command().debug_assert();
    }

    #[test]
    fn run_and_r_are_recognised_aliases() {
        for argv in [
            ["cargo", "unleash"],
            ["cargo", "run"],
            ["cargo", "r"],
        ] {
            let Cargo::Unleash(args) = Cargo::try_parse_from(argv).unwrap();
            assert_eq!(args.path, Utf8PathBuf::from("."));
        }
    }

    #[test]
    fn flags_parse_into_optional_fields() {
        let Cargo::Unleash(args) = Cargo::try_parse_from([
            "cargo",
            "unleash",
            "some/crate",
            "--dry-run",
            "--workers",
            "4",
            "--threshold-efficacy",
            "80",
            "--exclude",
            "src/generated.rs",
        ])
        .unwrap();
        assert_eq!(args.path, Utf8PathBuf::from("some/crate"));
        assert!(args.dry_run);
        assert_eq!(args.workers, Some(4));
        assert_eq!(args.threshold_efficacy, Some(80.0));
        assert_eq!(args.exclude, vec!["src/generated.rs".to_string()]);
    }
}
