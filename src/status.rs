//! Mutant lifecycle status.

use serde::Serialize;

/// Where a mutant sits in its lifecycle, or the outcome of running it.
///
/// `NotCovered` and `Skipped` are assigned at discovery time and are already
/// terminal. `Runnable` is assigned at discovery and is not terminal: the
/// executor replaces it with one of `Lived`, `Killed`, `TimedOut`, or
/// `NotViable` once the mutant has actually been run.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// The position is not known to be exercised by any test.
    NotCovered,
    /// The position is covered and in scope; waiting to be executed.
    Runnable,
    /// Outside the diff filter; never executed.
    Skipped,
    /// Ran to completion and the test suite did not notice.
    Lived,
    /// Ran to completion and the test suite failed, so the mutant was caught.
    Killed,
    /// The test run exceeded the package timeout.
    TimedOut,
    /// The build itself failed under the mutation (exit code 2).
    NotViable,
}

impl Status {
    /// Whether this status is final, i.e. no further work will change it.
    pub fn is_terminal(self) -> bool {
        use Status::*;
        matches!(
            self,
            NotCovered | Skipped | Lived | Killed | TimedOut | NotViable
        )
    }

    /// Single-letter code, used by `output-statuses` filtering (§6):
    /// `l,c,t,k,v,s,r` for lived/caught(killed)/timeout/not-viable/skipped/runnable.
    ///
    /// `NotCovered` has no letter of its own in the documented set and is
    /// treated as `r` (not yet run) for filtering purposes, matching the
    /// intent that only executed-or-pending mutants are worth log filtering.
    pub fn output_letter(self) -> char {
        match self {
            Status::Lived => 'l',
            Status::Killed => 'k',
            Status::TimedOut => 't',
            Status::NotViable => 'v',
            Status::Skipped => 's',
            Status::Runnable | Status::NotCovered => 'r',
        }
    }

    /// Promote `NotCovered` to `Runnable` because the position is covered.
    ///
    /// No-op for every other status (covered-ness only matters before a
    /// diff-filter demotion or an execution result supersedes it).
    pub fn promote_covered(self) -> Status {
        match self {
            Status::NotCovered => Status::Runnable,
            other => other,
        }
    }

    /// Demote to `Skipped`, which dominates both `NotCovered` and `Runnable`.
    pub fn demote_skipped(self) -> Status {
        Status::Skipped
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn promote_then_demote_dominance() {
        let s = Status::NotCovered.promote_covered();
        assert_eq!(s, Status::Runnable);
        let s = s.demote_skipped();
        assert_eq!(s, Status::Skipped);
    }

    #[test]
    fn terminal_statuses() {
        assert!(Status::NotCovered.is_terminal());
        assert!(Status::Skipped.is_terminal());
        assert!(!Status::Runnable.is_terminal());
        assert!(Status::Lived.is_terminal());
        assert!(Status::Killed.is_terminal());
        assert!(Status::TimedOut.is_terminal());
        assert!(Status::NotViable.is_terminal());
    }

    #[test]
    fn output_letters() {
        assert_eq!(Status::Lived.output_letter(), 'l');
        assert_eq!(Status::Killed.output_letter(), 'k');
        assert_eq!(Status::TimedOut.output_letter(), 't');
        assert_eq!(Status::NotViable.output_letter(), 'v');
        assert_eq!(Status::Skipped.output_letter(), 's');
        assert_eq!(Status::Runnable.output_letter(), 'r');
        assert_eq!(Status::NotCovered.output_letter(), 'r');
    }
}
