#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! # greencently
//!
//! Keeps a pre-commit hook from rerunning a test suite that just passed.
//!
//! Run your tests through `greencently run -- <test command>`. When every
//! test passes, a marker goes into the git directory. Install the hook with
//! `greencently install-hook -- <test command>`; at commit time it calls
//! `greencently gate`, which lets the commit through immediately if the
//! marker is recent and nothing changed, and runs the tests otherwise.

use std::process::ExitCode;

use anyhow::{Context, Result};
use bpaf::*;
use colored::Colorize;
use dotenvy::dotenv;
use greencently::{
    check::FlagCheck,
    config::{self, ConfigState},
    gate::{self, Verdict},
    git::Repo,
    hook::{self, Removal},
    marker::MarkerStore,
    process::Echo,
    runner::{RunOptions, run_tests},
    util::greencently_path,
};
use tabled::Table;
use tracing::{Level, metadata::LevelFilter};
use tracing_subscriber::{fmt, prelude::*, util::SubscriberInitExt};

/// Top-level CLI commands.
#[derive(Debug, Clone)]
enum Cmd {
    /// Run the flag-controlled check
    Flag,
    /// Run the tests and record a green marker if they all pass
    Run {
        /// Value for `SET_NON_EMPTY_TO_FAIL_TEST_ONE`
        fail_test_one: Option<String>,
        /// Test command
        command:       Vec<String>,
    },
    /// Exit zero only if a recent green marker matches the working tree and
    /// the test command
    Check(Vec<String>),
    /// Pre-commit entry point: check, and run the tests if that fails
    Gate(Vec<String>),
    /// Print the marker and the current verdict
    Status,
    /// Remove the marker
    Clear,
    /// Install the pre-commit hook
    InstallHook {
        /// Replace a hook greencently did not write
        force:   bool,
        /// Test command the hook falls back to
        command: Vec<String>,
    },
    /// Remove the pre-commit hook
    UninstallHook,
}

/// Parsed command line.
#[derive(Debug, Clone)]
struct Opts {
    /// Log at debug level
    verbose: bool,
    /// What to do
    cmd:     Cmd,
}

/// Parse the command line arguments and return an `Opts`
fn options() -> Opts {
    /// parses the test command
    fn c() -> impl Parser<Vec<String>> {
        positional("CMD")
            .help("Test command, after `--`; defaults to GREENCENTLY_TEST_COMMAND")
            .many()
    }

    let flag = pure(Cmd::Flag)
        .to_options()
        .command("flag")
        .help("Fail if SET_NON_EMPTY_TO_FAIL_TEST_ONE is non-empty");

    let run = {
        let fail_test_one = long("fail-test-one")
            .help("Pass VALUE to the tests as SET_NON_EMPTY_TO_FAIL_TEST_ONE")
            .argument::<String>("VALUE")
            .optional();
        let command = c();
        construct!(Cmd::Run {
            fail_test_one,
            command
        })
    }
    .to_options()
    .command("run")
    .help("Run the tests and record a green marker if they all pass");

    let check = construct!(Cmd::Check(c()))
        .to_options()
        .command("check")
        .help("Succeed only if this test command was green recently for this exact tree");

    let gate = construct!(Cmd::Gate(c()))
        .to_options()
        .command("gate")
        .help("Pre-commit entry point: skip the tests if green recently, run them otherwise");

    let status = pure(Cmd::Status)
        .to_options()
        .command("status")
        .help("Show the recorded marker and the current verdict");

    let clear = pure(Cmd::Clear)
        .to_options()
        .command("clear")
        .help("Forget the last green run");

    let install_hook = {
        let force = long("force")
            .help("Replace an existing hook not written by greencently")
            .switch();
        let command = c();
        construct!(Cmd::InstallHook { force, command })
    }
    .to_options()
    .command("install-hook")
    .help("Install the git pre-commit hook");

    let uninstall_hook = pure(Cmd::UninstallHook)
        .to_options()
        .command("uninstall-hook")
        .help("Remove the git pre-commit hook");

    let cmd = construct!([
        flag,
        run,
        check,
        gate,
        status,
        clear,
        install_hook,
        uninstall_hook
    ]);

    let verbose = short('v')
        .long("verbose")
        .help("Log at debug level")
        .switch();

    construct!(Opts { verbose, cmd })
        .to_options()
        .descr("All tests green, recently? Commit quickly and stay in flow.")
        .run()
}

/// Falls back to the configured test command when none was given.
fn test_command(given: Vec<String>) -> Result<Vec<String>> {
    if !given.is_empty() {
        return Ok(given);
    }
    let configured = config::get().test_command().to_vec();
    anyhow::ensure!(
        !configured.is_empty(),
        "No test command given; pass one after `--` or set GREENCENTLY_TEST_COMMAND"
    );
    Ok(configured)
}

/// Finds the repository around the current directory.
async fn repo() -> Result<Repo> {
    let cwd = std::env::current_dir().context("Could not determine the current directory")?;
    Repo::discover(&cwd).await
}

/// Prints a verdict in colour.
fn print_verdict(verdict: &Verdict) {
    let line = verdict.to_string();
    if verdict.is_green() {
        println!("{}", line.green());
    } else {
        println!("{}", line.yellow());
    }
}

/// Runs the tests with the configured deadline, streaming their output.
async fn run_and_record(
    repo: &Repo,
    command: &[String],
    fail_test_one: Option<String>,
) -> Result<u8> {
    let options = RunOptions::builder()
        .maybe_fail_test_one(fail_test_one)
        .maybe_timeout(config::test_timeout())
        .echo(Echo::Tee)
        .build();
    let report = run_tests(repo, command, &options).await?;
    Ok(u8::try_from(report.exit_code()).unwrap_or(1))
}

/// Executes one command and returns the process exit code.
async fn execute(cmd: Cmd) -> Result<u8> {
    match cmd {
        Cmd::Flag => match FlagCheck::from_env().run() {
            Ok(()) => {
                println!("test_one passed");
                Ok(0)
            }
            Err(e) => {
                eprintln!("test_one failed: {e}");
                Ok(1)
            }
        },
        Cmd::Run {
            fail_test_one,
            command,
        } => {
            let repo = repo().await?;
            run_and_record(&repo, &test_command(command)?, fail_test_one).await
        }
        Cmd::Check(command) => {
            let command = test_command(command)?;
            let (verdict, _) = gate::check(&repo().await?, Some(command.as_slice())).await?;
            print_verdict(&verdict);
            Ok(if verdict.is_green() { 0 } else { 1 })
        }
        Cmd::Gate(command) => {
            let command = test_command(command)?;
            let repo = repo().await?;
            let (verdict, _) = gate::check(&repo, Some(command.as_slice())).await?;
            if verdict.is_green() {
                tracing::info!("skipping tests: {verdict}");
                return Ok(0);
            }
            tracing::info!("{verdict}, running tests");
            run_and_record(&repo, &command, None).await
        }
        Cmd::Status => {
            let repo = repo().await?;
            let configured = test_command(Vec::new()).ok();
            let (verdict, marker) = gate::check(&repo, configured.as_deref()).await?;
            match marker {
                Some(marker) => {
                    println!("marker:      {}", MarkerStore::for_repo(&repo).path().display());
                    println!("command:     {}", marker.command.join(" "));
                    println!("fingerprint: {}", marker.fingerprint);
                    println!("{}", Table::new([marker.summary]));
                }
                None => println!("no marker recorded"),
            }
            print_verdict(&verdict);
            Ok(0)
        }
        Cmd::Clear => {
            let store = MarkerStore::for_repo(&repo().await?);
            if store.clear().await? {
                println!("cleared {}", store.path().display());
            } else {
                println!("nothing to clear");
            }
            Ok(0)
        }
        Cmd::InstallHook { force, command } => {
            let repo = repo().await?;
            let command = test_command(command)?;
            let path =
                hook::install(&repo.hooks_dir().await?, &greencently_path(), &command, force)
                    .await?;
            println!("installed {}", path.display());
            Ok(0)
        }
        Cmd::UninstallHook => {
            let repo = repo().await?;
            match hook::uninstall(&repo.hooks_dir().await?).await? {
                Removal::Removed => println!("removed pre-commit hook"),
                Removal::Absent => println!("no pre-commit hook installed"),
                Removal::LeftForeign => {
                    println!("pre-commit hook was not installed by greencently, left it alone")
                }
            }
            Ok(0)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();

    let opts = options();
    let cfg = config::install(ConfigState::from_env());
    let level = if opts.verbose {
        Level::DEBUG
    } else {
        cfg.log_level()
    };

    let fmt = fmt::layer()
        .without_time()
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr);
    let filter_layer = LevelFilter::from_level(level);
    tracing_subscriber::registry()
        .with(fmt)
        .with(filter_layer)
        .init();

    match execute(opts.cmd).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red());
            ExitCode::from(2)
        }
    }
}
