// Copyright 2021 - 2025 Unleash Mutants Contributors

//! Exclusion Rules: compiled path patterns to skip (§2, §6).
//!
//! Configuration supplies these as a list of regular-expression strings;
//! we compile them once and match against forward-slash tree-relative
//! paths.

use camino::Utf8Path;
use regex::RegexSet;

use crate::Result;

/// A compiled set of path-exclusion regexes.
#[derive(Debug, Clone)]
pub struct ExclusionRules {
    patterns: RegexSet,
}

impl ExclusionRules {
    pub fn new(patterns: &[String]) -> Result<ExclusionRules> {
        Ok(ExclusionRules {
            patterns: RegexSet::new(patterns)?,
        })
    }

    pub fn is_excluded(&self, tree_relative: &Utf8Path) -> bool {
        self.patterns.is_match(tree_relative.as_str())
    }
}

impl Default for ExclusionRules {
    fn default() -> Self {
        ExclusionRules::new(&[]).expect("empty pattern set always compiles")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_rules_exclude_nothing() {
        let rules = ExclusionRules::default();
        assert!(!rules.is_excluded(Utf8Path::new("src/lib.rs")));
    }

    #[test]
    fn matching_pattern_excludes() {
        let rules = ExclusionRules::new(&[r"^src/generated/".to_string()]).unwrap();
        assert!(rules.is_excluded(Utf8Path::new("src/generated/foo.rs")));
        assert!(!rules.is_excluded(Utf8Path::new("src/foo.rs")));
    }

    #[test]
    fn multiple_patterns_are_ored() {
        let rules = ExclusionRules::new(&["^a/".to_string(), "^b/".to_string()]).unwrap();
        assert!(rules.is_excluded(Utf8Path::new("a/x.rs")));
        assert!(rules.is_excluded(Utf8Path::new("b/x.rs")));
        assert!(!rules.is_excluded(Utf8Path::new("c/x.rs")));
    }
}
