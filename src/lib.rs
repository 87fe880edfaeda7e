//! # greencently
//!
//! Optimize your pre-commit hook's test run. All tests green, recently?
//! Commit quickly and stay in flow.
//!
//! After a test run where every test passed, greencently records a marker
//! tied to a fingerprint of the working tree. The pre-commit hook checks that
//! marker: if it is recent and the tree is unchanged, the commit goes through
//! without running the tests again.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// The flag-controlled check
pub mod check;
/// Environment-driven configuration
pub mod config;
/// A module defining a bunch of constant values to be used throughout
pub mod constants;
/// Working tree fingerprints
pub mod fingerprint;
/// Deciding whether a commit may skip its tests
pub mod gate;
/// Locating and querying the git repository
pub mod git;
/// Installing the pre-commit hook
pub mod hook;
/// The green marker and where it is stored
pub mod marker;
/// Spawning subprocesses and collecting their output
pub mod process;
/// Running the test command
pub mod runner;
/// Parsers for test runner summaries
pub mod summary;
/// Utility functions for convenience
pub mod util;

pub use check::{CheckOutcome, FlagCheck};
pub use gate::Verdict;
pub use runner::{RunOptions, RunReport, run_tests};
pub use summary::RunSummary;
