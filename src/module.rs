// Copyright 2021 - 2025 Unleash Mutants Contributors

//! Module descriptor discovery: `{name, root_dir, calling_dir}` (§6).
//!
//! A minimal stand-in for the module-detection collaborator the
//! specification treats as external: it locates the nearest `Cargo.toml`
//! above the calling directory and reads the package name out of it with
//! `toml`, rather than shelling out to `cargo locate-project` the way the
//! teacher's `CargoSourceTree::open` does.

use std::fs;

use anyhow::{anyhow, Context};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;

use crate::Result;

/// `{name, root_dir, calling_dir}`: identifies which package is under test
/// and where its sources live.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ModuleDescriptor {
    pub name: String,
    pub root_dir: Utf8PathBuf,
    pub calling_dir: Utf8PathBuf,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    package: Option<PackageTable>,
}

#[derive(Debug, Deserialize)]
struct PackageTable {
    name: String,
}

impl ModuleDescriptor {
    /// Walk upward from `calling_dir` looking for the nearest `Cargo.toml`
    /// and read its package name.
    pub fn discover(calling_dir: &Utf8Path) -> Result<ModuleDescriptor> {
        let calling_dir = calling_dir
            .canonicalize_utf8()
            .with_context(|| format!("canonicalize {calling_dir:?}"))?;
        let mut probe = calling_dir.as_path();
        loop {
            let manifest_path = probe.join("Cargo.toml");
            if manifest_path.is_file() {
                let text = fs::read_to_string(&manifest_path)
                    .with_context(|| format!("read {manifest_path:?}"))?;
                let manifest: Manifest =
                    toml::de::from_str(&text).with_context(|| format!("parse {manifest_path:?}"))?;
                let name = manifest
                    .package
                    .map(|p| p.name)
                    .ok_or_else(|| anyhow!("{manifest_path:?} has no [package] table"))?;
                return Ok(ModuleDescriptor {
                    name,
                    root_dir: probe.to_owned(),
                    calling_dir,
                });
            }
            match probe.parent() {
                Some(parent) => probe = parent,
                None => return Err(anyhow!("no Cargo.toml found above {calling_dir:?}")),
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn discover_this_crate() {
        let descriptor = ModuleDescriptor::discover(Utf8Path::new(".")).unwrap();
        assert_eq!(descriptor.name, "cargo-unleash-mutants");
        assert!(descriptor.root_dir.join("Cargo.toml").is_file());
    }

    #[test]
    fn discover_from_subdirectory() {
        let descriptor = ModuleDescriptor::discover(Utf8Path::new("src")).unwrap();
        assert_eq!(descriptor.name, "cargo-unleash-mutants");
    }

    #[test]
    fn discover_outside_any_crate_fails() {
        assert!(ModuleDescriptor::discover(Utf8Path::new("/")).is_err());
    }
}
