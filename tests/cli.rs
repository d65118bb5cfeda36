// Copyright 2024 - 2025 Unleash Mutants Contributors

//! End-to-end CLI tests, in the style of the teacher's `tests/cli/main.rs`:
//! build a tiny fixture crate under a tempdir, run the real `cargo-unleash`
//! binary against it, and assert on its exit code and output.

use std::fs;

use assert_cmd::Command;
use indoc::indoc;
use predicates::prelude::*;
use tempfile::TempDir;

fn fixture_crate() -> TempDir {
    let dir = TempDir::new().expect("create tempdir");
    let root = dir.path();
    fs::write(
        root.join("Cargo.toml"),
        indoc! {r#"
            [package]
            name = "fixture"
            version = "0.1.0"
            edition = "2021"
        "#},
    )
    .unwrap();
    fs::create_dir(root.join("src")).unwrap();
    fs::write(
        root.join("src/lib.rs"),
        indoc! {r#"
            pub fn max(a: i32, b: i32) -> i32 {
                if a > b {
                    a
                } else {
                    b
                }
            }

            #[cfg(test)]
            mod tests {
                use super::*;

                #[test]
                fn picks_the_larger_value() {
                    assert_eq!(max(1, 2), 2);
                    assert_eq!(max(2, 1), 2);
                }
            }
        "#},
    )
    .unwrap();
    dir
}

fn generous_coverage(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("coverage.json");
    fs::write(&path, r#"{"elapsed_secs": 0.5, "blocks": {"src/lib.rs": [[1, 1, 100, 1]]}}"#).unwrap();
    path
}

#[test]
fn dry_run_reports_one_runnable_mutant() {
    let dir = fixture_crate();
    let coverage = generous_coverage(&dir);

    Command::cargo_bin("cargo-unleash")
        .unwrap()
        .arg("unleash")
        .arg(dir.path())
        .arg("--dry-run")
        .arg("--coverage")
        .arg(&coverage)
        .arg("--disable")
        .arg("invert-logical")
        .assert()
        .success()
        .stdout(predicate::str::contains("fixture"));
}

#[test]
fn run_and_r_aliases_are_accepted() {
    let dir = fixture_crate();
    let coverage = generous_coverage(&dir);

    for alias in ["run", "r"] {
        Command::cargo_bin("cargo-unleash")
            .unwrap()
            .arg(alias)
            .arg(dir.path())
            .arg("--dry-run")
            .arg("--coverage")
            .arg(&coverage)
            .assert()
            .success();
    }
}

#[test]
fn without_a_cargo_toml_reports_a_usage_error() {
    let dir = TempDir::new().unwrap();

    Command::cargo_bin("cargo-unleash")
        .unwrap()
        .arg("unleash")
        .arg(dir.path())
        .assert()
        .failure()
        .code(1);
}

#[test]
fn unknown_flag_is_rejected_by_clap() {
    Command::cargo_bin("cargo-unleash")
        .unwrap()
        .arg("unleash")
        .arg("--not-a-real-flag")
        .assert()
        .failure();
}
