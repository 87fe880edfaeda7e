#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Deciding whether a commit may skip its test run.

use std::{fmt::Display, time::Duration};

use anyhow::Result;

use crate::{
    config,
    fingerprint::Fingerprint,
    git::Repo,
    marker::{Marker, MarkerError, MarkerStore},
    util::now_ms,
};

/// Why a commit may or may not skip its tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The last run was green, recent, and for this exact tree.
    Green {
        /// How long ago the green run finished.
        age: Duration,
    },
    /// No green run has been recorded.
    Missing,
    /// The green run is too old, or claims to be from the future.
    Stale {
        /// How long ago the green run finished; zero if in the future.
        age: Duration,
    },
    /// The green run was for a different test command.
    OtherCommand {
        /// The command the marker was recorded for.
        recorded: Vec<String>,
    },
    /// The working tree changed since the green run.
    Changed,
    /// A marker exists but could not be understood.
    Unreadable(String),
}

impl Verdict {
    /// Only a green verdict lets a commit skip its tests.
    pub fn is_green(&self) -> bool {
        matches!(self, Verdict::Green { .. })
    }
}

impl Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Green { age } => write!(f, "green {}s ago", age.as_secs()),
            Verdict::Missing => write!(f, "no green run recorded"),
            Verdict::Stale { age } => write!(f, "last green run is stale ({}s old)", age.as_secs()),
            Verdict::OtherCommand { recorded } => {
                write!(f, "last green run was for a different command ({})", recorded.join(" "))
            }
            Verdict::Changed => write!(f, "working tree changed since the last green run"),
            Verdict::Unreadable(reason) => write!(f, "{reason}"),
        }
    }
}

/// Judges a recorded marker against the current tree, test command and
/// clock.
///
/// A `max_age` of zero means no marker is ever fresh enough. When `command`
/// is `None` the recorded command is not compared.
pub fn evaluate(
    marker: Option<&Marker>,
    current: &Fingerprint,
    command: Option<&[String]>,
    now_ms: u64,
    max_age: Duration,
) -> Verdict {
    let Some(marker) = marker else {
        return Verdict::Missing;
    };

    let Some(age_ms) = now_ms.checked_sub(marker.recorded_at_ms) else {
        return Verdict::Stale { age: Duration::ZERO };
    };
    let age = Duration::from_millis(age_ms);

    if max_age.is_zero() || age > max_age {
        return Verdict::Stale { age };
    }

    if let Some(command) = command
        && marker.command != command
    {
        return Verdict::OtherCommand {
            recorded: marker.command.clone(),
        };
    }

    if &marker.fingerprint != current {
        return Verdict::Changed;
    }

    Verdict::Green { age }
}

/// Reads the marker of `repo` and judges it against the current tree and,
/// if given, the test command about to be skipped.
pub async fn check(repo: &Repo, command: Option<&[String]>) -> Result<(Verdict, Option<Marker>)> {
    let store = MarkerStore::for_repo(repo);
    let marker = match store.read().await {
        Ok(marker) => marker,
        Err(MarkerError::Unreadable { path, reason }) => {
            tracing::warn!("ignoring marker {}: {reason}", path.display());
            return Ok((Verdict::Unreadable(reason), None));
        }
        Err(e) => return Err(e.into()),
    };

    if marker.is_none() {
        return Ok((Verdict::Missing, None));
    }

    let current = Fingerprint::compute(repo).await?;
    let verdict = evaluate(marker.as_ref(), &current, command, now_ms(), config::max_age());
    tracing::debug!("verdict for {}: {verdict}", current.short());
    Ok((verdict, marker))
}
