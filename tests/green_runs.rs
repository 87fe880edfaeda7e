use std::{fs, path::PathBuf, process::Command, time::Duration};

use greencently::{
    config::{self, ConfigState},
    fingerprint::Fingerprint,
    gate::{self, Verdict},
    git::Repo,
    marker::MarkerStore,
    runner::{RunOptions, run_tests},
};
use uuid::Uuid;

/// A fresh git repository with one untracked file, or `None` when git is not
/// installed.
fn temp_repo() -> Option<PathBuf> {
    which_git()?;
    let root = std::env::temp_dir().join(format!("greencently-repo-{}", Uuid::new_v4()));
    fs::create_dir_all(&root).expect("create temp root");
    let status = git()
        .args(["init", "--quiet"])
        .current_dir(&root)
        .status()
        .expect("git init");
    assert!(status.success());
    fs::write(root.join("lib.txt"), "one\n").expect("write file");
    Some(root)
}

/// git, unaffected by a surrounding hook's repository variables.
fn git() -> Command {
    let mut git = Command::new("git");
    git.env_remove("GIT_DIR")
        .env_remove("GIT_WORK_TREE")
        .env_remove("GIT_INDEX_FILE");
    git
}

fn which_git() -> Option<()> {
    git().arg("--version").output().ok().map(|_| ())
}

fn settings() -> ConfigState {
    ConfigState::default().with_max_age(Duration::from_secs(60))
}

fn sh(script: &str) -> Vec<String> {
    vec!["sh".into(), "-c".into(), script.into()]
}

const GREEN: &str =
    "echo 'test result: ok. 2 passed; 0 failed; 0 ignored; 0 measured; 0 filtered out'";

#[tokio::test]
async fn green_run_lets_an_unchanged_tree_through() {
    let Some(root) = temp_repo() else { return };
    config::install(settings());
    let repo = Repo::open(&root).expect("open");

    let report = run_tests(&repo, &sh(GREEN), &RunOptions::default())
        .await
        .expect("run");
    assert!(report.is_green());
    assert!(report.marker_written);
    assert_eq!(report.exit_code(), 0);

    let command = sh(GREEN);
    let (verdict, marker) = gate::check(&repo, Some(command.as_slice()))
        .await
        .expect("check");
    assert!(verdict.is_green(), "{verdict}");
    let marker = marker.expect("marker");
    assert_eq!(marker.summary.found, 2);
    assert_eq!(marker.command, command);

    fs::write(root.join("lib.txt"), "two\n").expect("edit file");
    let (verdict, _) = gate::check(&repo, Some(command.as_slice()))
        .await
        .expect("check");
    assert_eq!(verdict, Verdict::Changed);

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn red_run_clears_the_marker() {
    let Some(root) = temp_repo() else { return };
    config::install(settings());
    let repo = Repo::open(&root).expect("open");

    run_tests(&repo, &sh(GREEN), &RunOptions::default())
        .await
        .expect("green run");
    let store = MarkerStore::for_repo(&repo);
    assert!(store.read().await.expect("read").is_some());

    let failing = sh("test -z \"$SET_NON_EMPTY_TO_FAIL_TEST_ONE\"");
    let options = RunOptions::builder().fail_test_one("0").build();
    let report = run_tests(&repo, &failing, &options).await.expect("red run");

    assert!(!report.is_green());
    assert!(!report.marker_written);
    assert_eq!(report.exit_code(), 1);
    assert!(store.read().await.expect("read").is_none());

    let (verdict, _) = gate::check(&repo, None).await.expect("check");
    assert_eq!(verdict, Verdict::Missing);

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn tree_edited_during_the_run_is_not_recorded() {
    let Some(root) = temp_repo() else { return };
    config::install(settings());
    let repo = Repo::open(&root).expect("open");

    let sneaky = sh(&format!("echo changed > lib.txt; {GREEN}"));
    let report = run_tests(&repo, &sneaky, &RunOptions::default())
        .await
        .expect("run");

    assert!(report.is_green());
    assert!(!report.marker_written);

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn fingerprint_tracks_untracked_contents() {
    let Some(root) = temp_repo() else { return };
    config::install(settings());
    let repo = Repo::open(&root).expect("open");

    let first = Fingerprint::compute(&repo).await.expect("fingerprint");
    assert_eq!(first, Fingerprint::compute(&repo).await.expect("fingerprint"));

    fs::write(root.join("new.txt"), "hello\n").expect("add file");
    let second = Fingerprint::compute(&repo).await.expect("fingerprint");
    assert_ne!(first, second);

    fs::write(root.join(".gitignore"), "ignored.log\n").expect("gitignore");
    let third = Fingerprint::compute(&repo).await.expect("fingerprint");
    fs::write(root.join("ignored.log"), "noise\n").expect("ignored file");
    assert_eq!(third, Fingerprint::compute(&repo).await.expect("fingerprint"));

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn green_run_does_not_vouch_for_another_command() {
    let Some(root) = temp_repo() else { return };
    config::install(settings());
    let repo = Repo::open(&root).expect("open");

    let narrow = sh(GREEN);
    run_tests(&repo, &narrow, &RunOptions::default())
        .await
        .expect("run");

    let full = sh("exit 1");
    let (verdict, _) = gate::check(&repo, Some(full.as_slice()))
        .await
        .expect("check");
    assert_eq!(verdict, Verdict::OtherCommand { recorded: narrow.clone() });

    let (verdict, _) = gate::check(&repo, Some(narrow.as_slice()))
        .await
        .expect("check");
    assert!(verdict.is_green(), "{verdict}");

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn fingerprint_covers_the_tail_of_large_untracked_files() {
    let Some(root) = temp_repo() else { return };
    config::install(settings());
    let repo = Repo::open(&root).expect("open");

    let mut big = vec![b'x'; 3 * 1024 * 1024 + 17];
    fs::write(root.join("big.bin"), &big).expect("write big file");
    let before = Fingerprint::compute(&repo).await.expect("fingerprint");

    if let Some(last) = big.last_mut() {
        *last = b'y';
    }
    fs::write(root.join("big.bin"), &big).expect("rewrite big file");
    let after = Fingerprint::compute(&repo).await.expect("fingerprint");
    assert_ne!(before, after);

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn opened_repo_is_pinned_to_its_own_git_dir() {
    let Some(root) = temp_repo() else { return };
    config::install(settings());

    let repo = Repo::open(&root).expect("open");
    let git_dir = repo
        .output(&["rev-parse", "--absolute-git-dir"])
        .await
        .expect("rev-parse");
    let git_dir = PathBuf::from(String::from_utf8_lossy(&git_dir).trim());
    assert_eq!(
        fs::canonicalize(git_dir).expect("canonical git dir"),
        fs::canonicalize(root.join(".git")).expect("canonical .git")
    );

    let plain = root.join("plain");
    fs::create_dir_all(&plain).expect("create plain dir");
    assert!(Repo::open(&plain).is_err());

    let _ = fs::remove_dir_all(root);
}
