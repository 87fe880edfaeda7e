#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{ffi::OsString, time::Duration};

use anyhow::{Result, bail};
use bon::Builder;

use crate::{
    constants::FAIL_TEST_ONE_VAR,
    fingerprint::Fingerprint,
    git::Repo,
    marker::{Marker, MarkerStore},
    process::{Echo, run_collect},
    summary::RunSummary,
    util::{now_ms, program_path},
};

/// How to run a test command.
#[derive(Debug, Clone, Default, Builder)]
pub struct RunOptions {
    /// Value passed to the test command as `SET_NON_EMPTY_TO_FAIL_TEST_ONE`.
    /// Left untouched when `None`.
    #[builder(into)]
    fail_test_one: Option<String>,
    /// The command is killed if it runs longer than this.
    timeout:       Option<Duration>,
    /// Whether to stream the command's output to the terminal.
    #[builder(default)]
    echo:          Echo,
}

/// What happened when a test command ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Counts parsed from the command's output.
    pub summary:        RunSummary,
    /// Exit code of the command, `None` if killed by a signal.
    pub exit_code:      Option<i32>,
    /// Whether a green marker was recorded.
    pub marker_written: bool,
}

impl RunReport {
    /// Whether every test passed.
    pub fn is_green(&self) -> bool {
        self.summary.is_green()
    }

    /// Exit code to report to whoever ran us: the command's own code, but
    /// never zero for a run that was not green.
    pub fn exit_code(&self) -> i32 {
        match (self.is_green(), self.exit_code) {
            (true, Some(code)) => code,
            (true, None) => 1,
            (false, Some(0) | None) => 1,
            (false, Some(code)) => code,
        }
    }
}

/// Runs `command` in the working tree of `repo` and records a green marker
/// if every test passed and the tree did not change while they ran.
///
/// Any previous marker is removed first, so an interrupted or failing run
/// never leaves an old green marker behind.
pub async fn run_tests(repo: &Repo, command: &[String], options: &RunOptions) -> Result<RunReport> {
    let Some((program, args)) = command.split_first() else {
        bail!("No test command given");
    };

    let store = MarkerStore::for_repo(repo);
    if store.clear().await? {
        tracing::debug!("cleared previous marker");
    }

    let before = Fingerprint::compute(repo).await?;

    let mut env: Vec<(OsString, OsString)> = Vec::new();
    if let Some(value) = options.fail_test_one.as_ref() {
        env.push((FAIL_TEST_ONE_VAR.into(), value.into()));
    }

    tracing::info!("running {}", command.join(" "));
    let args: Vec<OsString> = args.iter().map(OsString::from).collect();
    let collected = run_collect(
        program_path(program),
        &args,
        Some(repo.root()),
        &env,
        options.timeout,
        options.echo,
    )
    .await?;

    let summary = RunSummary::from_output(&collected.combined_text(), collected.success());
    let mut marker_written = false;

    if summary.is_green() {
        let after = Fingerprint::compute(repo).await?;
        if after == before {
            store
                .write(&Marker::new(after, command.to_vec(), summary, now_ms()))
                .await?;
            marker_written = true;
            tracing::info!("all green ({summary}), recorded for {}", before.short());
        } else {
            tracing::warn!("working tree changed during the test run, not recording it as green");
        }
    } else {
        tracing::info!("not green ({summary})");
    }

    Ok(RunReport {
        summary,
        exit_code: collected.code(),
        marker_written,
    })
}
