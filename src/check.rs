#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! The flag-controlled check.
//!
//! A single synthetic test whose outcome is decided by one externally
//! supplied string. An empty or absent value passes, anything else fails. The
//! value is a toggle, not a payload: `"0"` and `"false"` fail just like
//! `"yes"` does.

use std::fmt::Display;

use thiserror::Error;

use crate::constants::FAIL_TEST_ONE_VAR;

/// Where a check is in its (very short) life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    /// Constructed, not yet evaluated.
    Pending,
    /// Terminal state reached on evaluation.
    Done(CheckOutcome),
}

/// Terminal result of evaluating a [`FlagCheck`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The flag was empty or absent.
    Passed,
    /// The flag was non-empty.
    Failed,
}

impl Display for CheckOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckOutcome::Passed => write!(f, "passed"),
            CheckOutcome::Failed => write!(f, "failed"),
        }
    }
}

/// Assertion signal raised by a failing check.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("assertion failed")]
pub struct CheckFailed;

/// A check toggled by an optional flag value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagCheck {
    /// The flag value as supplied, `None` when absent.
    value: Option<String>,
}

impl FlagCheck {
    /// Creates a check for an explicitly supplied flag value.
    pub fn new(value: Option<String>) -> Self {
        Self { value }
    }

    /// Creates a check from [`FAIL_TEST_ONE_VAR`] in the process
    /// environment. A value that is not valid unicode still counts as set.
    pub fn from_env() -> Self {
        Self::new(std::env::var_os(FAIL_TEST_ONE_VAR).map(|v| v.to_string_lossy().into_owned()))
    }

    /// Creates a check by looking up [`FAIL_TEST_ONE_VAR`] through `lookup`.
    pub fn from_lookup(lookup: impl FnOnce(&str) -> Option<String>) -> Self {
        Self::new(lookup(FAIL_TEST_ONE_VAR))
    }

    /// The supplied value, if any.
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// A fresh check has not been evaluated yet.
    pub fn state(&self) -> CheckState {
        CheckState::Pending
    }

    /// Decides the outcome. Absence is treated exactly like `""`.
    pub fn evaluate(&self) -> CheckOutcome {
        match self.value.as_deref().unwrap_or_default() {
            "" => CheckOutcome::Passed,
            _ => CheckOutcome::Failed,
        }
    }

    /// Evaluates and returns the terminal state.
    pub fn finish(&self) -> CheckState {
        CheckState::Done(self.evaluate())
    }

    /// Evaluates and surfaces a failure as [`CheckFailed`].
    pub fn run(&self) -> Result<(), CheckFailed> {
        match self.evaluate() {
            CheckOutcome::Passed => Ok(()),
            CheckOutcome::Failed => Err(CheckFailed),
        }
    }
}
