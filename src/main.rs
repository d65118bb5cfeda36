// Copyright 2021 - 2025 Unleash Mutants Contributors

//! `cargo-unleash`: inject small syntactic mutations into a Rust crate and
//! see if the test suite catches them.

mod aggregator;
mod args;
mod config;
mod coverage;
mod diff;
mod engine;
mod error;
mod exclude;
mod executor;
mod exit_code;
mod interrupt;
mod log_file;
mod module;
mod mutant;
mod mutation_kind;
mod position;
mod process;
mod shared_ast;
mod source;
mod span;
mod status;
mod timeouts;
mod visitor;
mod worker_pool;
mod workdir;

use std::process::exit;

use camino::Utf8PathBuf;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use args::Cargo;
use module::ModuleDescriptor;

/// The shared error type used across the engine; most functions propagate
/// with `?` and report context via `anyhow::Context`.
pub type Result<T> = anyhow::Result<T>;

fn main() {
    let Cargo::Unleash(cli_args) = Cargo::parse();
    interrupt::install_handler();

    let _log_guard = init_logging(&cli_args.path);

    let code = match run(&cli_args) {
        Ok(()) => exit_code::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            match err.downcast_ref::<error::EngineError>() {
                Some(engine_err) => engine_err.exit_code(),
                None => exit_code::USAGE,
            }
        }
    };
    exit(code);
}

fn run(cli_args: &args::CliArgs) -> anyhow::Result<()> {
    let file_config = config::Config::read_tree_config(&cli_args.path)?;
    let config = file_config.merge_cli(cli_args);
    config::install(config.clone());

    let module = ModuleDescriptor::discover(&cli_args.path)?;
    let results = engine::run(&module, &config)?;

    println!(
        "{}: {} mutants, efficacy {:.1}%, coverage {:.1}%",
        results.module, results.total, results.efficacy, results.mutant_coverage
    );
    Ok(())
}

/// Write structured logs both to stderr and to `<path>/unleash.out/unleash.log`,
/// mirroring the teacher's pervasive `tracing` instrumentation plus the
/// ambient `tracing-appender` non-blocking file sink named in the
/// specification's logging section.
fn init_logging(path: &Utf8PathBuf) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_dir = path.join("unleash.out");
    if std::fs::create_dir_all(&log_dir).is_err() {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(EnvFilter::from_default_env())
            .init();
        return None;
    }
    let file_appender = tracing_appender::rolling::never(log_dir, "unleash.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
        .with(EnvFilter::from_default_env())
        .init();
    Some(guard)
}
