#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// Which counter a JUnit console summary line reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JunitCount {
    /// `[ N tests found ]`
    Found,
    /// `[ N tests started ]`
    Started,
    /// `[ N tests successful ]`
    Successful,
    /// `[ N tests failed ]`
    Failed,
    /// `[ N tests aborted ]`
    Aborted,
    /// `[ N tests skipped ]`
    Skipped,
}

/// One `test result:` line printed by libtest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LibtestResult {
    /// `ok` versus `FAILED`.
    pub ok:      bool,
    /// Number of passing tests.
    pub passed:  u64,
    /// Number of failing tests.
    pub failed:  u64,
    /// Number of `#[ignore]`d tests.
    pub ignored: u64,
}

/// Counts from a Gradle `N tests completed, F failed, S skipped` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradleCounts {
    /// Tests that ran.
    pub completed: u64,
    /// Tests that failed.
    pub failed:    u64,
    /// Tests that were skipped.
    pub skipped:   u64,
}

peg::parser! {
    /// Grammars for the summary lines of JUnit, libtest and Gradle runs.
    pub grammar parser() for str {
        /// matches any sequence of 1 or more digits
        rule number() -> u64
            = n:$(['0'..='9']+) {? n.parse().or(Err("u64")) }

        /// matches any number of blanks
        rule ws() = quiet!{[' ' | '\t']*}

        /// matches whatever is left of the line
        rule rest() = [_]*

        /// matches "test" or "tests"
        rule tests() = "test" "s"?

        /// the counter word of a JUnit summary line
        rule junit_kind() -> JunitCount
            = "found" { JunitCount::Found }
            / "started" { JunitCount::Started }
            / "successful" { JunitCount::Successful }
            / "failed" { JunitCount::Failed }
            / "aborted" { JunitCount::Aborted }
            / "skipped" { JunitCount::Skipped }

        /// parses `[   3 tests successful   ]`
        pub rule junit_count() -> (JunitCount, u64)
            = "[" ws() n:number() ws() tests() ws() k:junit_kind() ws() "]" { (k, n) }

        /// `ok` or `FAILED`, true if ok
        rule verdict() -> bool
            = "ok" { true } / "FAILED" { false }

        /// parses `test result: ok. 3 passed; 0 failed; 1 ignored; ...`
        pub rule libtest_result() -> LibtestResult
            = "test result:" ws() ok:verdict() "." ws()
              passed:number() " passed;" ws()
              failed:number() " failed;" ws()
              ignored:number() " ignored;"
              rest()
            { LibtestResult { ok, passed, failed, ignored } }

        /// parses `5 tests completed, 1 failed, 2 skipped`
        pub rule gradle_counts() -> GradleCounts
            = completed:number() " " tests() " completed"
              failed:("," ws() n:number() " failed" { n })?
              skipped:("," ws() n:number() " skipped" { n })?
              rest()
            {
                GradleCounts {
                    completed,
                    failed: failed.unwrap_or(0),
                    skipped: skipped.unwrap_or(0),
                }
            }

        /// parses `BUILD SUCCESSFUL in 3s` / `BUILD FAILED in 1s`, true if successful
        pub rule gradle_build() -> bool
            = "BUILD " ok:("SUCCESSFUL" { true } / "FAILED" { false }) rest() { ok }
    }
}

/// Aggregated outcome of one test command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Tabled)]
pub struct RunSummary {
    /// Tests discovered.
    #[tabled(rename = "Found")]
    pub found:     u64,
    /// Tests that passed.
    #[tabled(rename = "Succeeded")]
    pub succeeded: u64,
    /// Tests that failed an assertion.
    #[tabled(rename = "Failed")]
    pub failed:    u64,
    /// Tests or runs that ended abnormally.
    #[tabled(rename = "Aborted")]
    pub aborted:   u64,
    /// Tests that were skipped or ignored.
    #[tabled(rename = "Skipped")]
    pub skipped:   u64,
}

impl RunSummary {
    /// Builds a summary from the combined output of a test command.
    ///
    /// Every recognized summary line is added up. When nothing is recognized
    /// the exit status stands in for a single test. A failing exit status is
    /// never green, even if the counts are clean.
    pub fn from_output(output: &str, exit_success: bool) -> Self {
        let mut summary = Self::default();
        let mut counted = false;
        let mut build_failed = false;
        let mut build_seen = false;

        for line in output.lines().map(str::trim) {
            if let Ok((kind, n)) = parser::junit_count(line) {
                counted = true;
                match kind {
                    JunitCount::Found => summary.found = summary.found.saturating_add(n),
                    JunitCount::Successful => {
                        summary.succeeded = summary.succeeded.saturating_add(n)
                    }
                    JunitCount::Failed => summary.failed = summary.failed.saturating_add(n),
                    JunitCount::Aborted => summary.aborted = summary.aborted.saturating_add(n),
                    JunitCount::Skipped => summary.skipped = summary.skipped.saturating_add(n),
                    JunitCount::Started => {}
                }
            } else if let Ok(result) = parser::libtest_result(line) {
                counted = true;
                summary.found = summary
                    .found
                    .saturating_add(result.passed)
                    .saturating_add(result.failed)
                    .saturating_add(result.ignored);
                summary.succeeded = summary.succeeded.saturating_add(result.passed);
                summary.failed = summary.failed.saturating_add(result.failed);
                summary.skipped = summary.skipped.saturating_add(result.ignored);
                if !result.ok && result.failed == 0 {
                    summary.aborted = summary.aborted.saturating_add(1);
                }
            } else if let Ok(counts) = parser::gradle_counts(line) {
                counted = true;
                summary.found = summary.found.saturating_add(counts.completed);
                summary.failed = summary.failed.saturating_add(counts.failed);
                summary.skipped = summary.skipped.saturating_add(counts.skipped);
                summary.succeeded = summary.succeeded.saturating_add(
                    counts
                        .completed
                        .saturating_sub(counts.failed)
                        .saturating_sub(counts.skipped),
                );
            } else if let Ok(ok) = parser::gradle_build(line) {
                build_seen = true;
                build_failed |= !ok;
            }
        }

        if !counted {
            // Gradle prints no counts for a passing build, only its verdict.
            let ok = exit_success && !build_failed;
            if !build_seen {
                tracing::debug!("no test summary recognized, using exit status");
            }
            return Self::from_status(ok);
        }

        if (!exit_success || build_failed) && summary.failed == 0 && summary.aborted == 0 {
            summary.aborted = 1;
        }
        summary
    }

    /// A summary for a run whose only evidence is its exit status.
    pub fn from_status(exit_success: bool) -> Self {
        Self {
            found: 1,
            succeeded: u64::from(exit_success),
            failed: u64::from(!exit_success),
            ..Self::default()
        }
    }

    /// At least one test ran and nothing failed or aborted. Skipped tests do
    /// not count against a run.
    pub fn is_green(&self) -> bool {
        self.found > 0 && self.failed == 0 && self.aborted == 0
    }
}

impl Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} found, {} succeeded, {} failed, {} aborted, {} skipped",
            self.found, self.succeeded, self.failed, self.aborted, self.skipped
        )
    }
}
