use std::time::Duration;

use greencently::{
    fingerprint::{Fingerprint, FingerprintBuilder},
    gate::{Verdict, evaluate},
    marker::Marker,
    summary::RunSummary,
};

const NOW: u64 = 1_800_000_000_000;
const MAX_AGE: Duration = Duration::from_secs(900);

fn tree(contents: &str) -> Fingerprint {
    FingerprintBuilder::new().part("head", contents.as_bytes()).finish()
}

fn words(line: &str) -> Vec<String> {
    line.split_whitespace().map(String::from).collect()
}

fn marker_at(recorded_at_ms: u64, fingerprint: Fingerprint) -> Marker {
    Marker::new(fingerprint, words("cargo test"), RunSummary::from_status(true), recorded_at_ms)
}

#[test]
fn no_marker_is_missing() {
    let command = words("cargo test");
    assert_eq!(
        evaluate(None, &tree("a"), Some(command.as_slice()), NOW, MAX_AGE),
        Verdict::Missing
    );
}

#[test]
fn fresh_and_unchanged_is_green() {
    let marker = marker_at(NOW - 10_000, tree("a"));
    let command = words("cargo test");
    let verdict = evaluate(Some(&marker), &tree("a"), Some(command.as_slice()), NOW, MAX_AGE);
    assert_eq!(verdict, Verdict::Green { age: Duration::from_secs(10) });
    assert!(verdict.is_green());
}

#[test]
fn old_marker_is_stale() {
    let marker = marker_at(NOW - 901_000, tree("a"));
    assert_eq!(
        evaluate(Some(&marker), &tree("a"), None, NOW, MAX_AGE),
        Verdict::Stale { age: Duration::from_secs(901) }
    );
}

#[test]
fn marker_from_the_future_is_stale() {
    let marker = marker_at(NOW + 5_000, tree("a"));
    assert_eq!(
        evaluate(Some(&marker), &tree("a"), None, NOW, MAX_AGE),
        Verdict::Stale { age: Duration::ZERO }
    );
}

#[test]
fn changed_tree_is_changed() {
    let marker = marker_at(NOW - 1_000, tree("a"));
    assert_eq!(evaluate(Some(&marker), &tree("b"), None, NOW, MAX_AGE), Verdict::Changed);
}

#[test]
fn zero_max_age_is_never_green() {
    let marker = marker_at(NOW, tree("a"));
    let verdict = evaluate(Some(&marker), &tree("a"), None, NOW, Duration::ZERO);
    assert!(!verdict.is_green());
}

#[test]
fn green_run_of_another_command_does_not_count() {
    let marker = marker_at(NOW - 1_000, tree("a"));
    let narrower = words("cargo test --lib");
    let verdict = evaluate(Some(&marker), &tree("a"), Some(narrower.as_slice()), NOW, MAX_AGE);
    assert_eq!(verdict, Verdict::OtherCommand { recorded: words("cargo test") });
    assert!(!verdict.is_green());
    assert!(verdict.to_string().contains("cargo test"));
}

#[test]
fn unspecified_command_skips_the_comparison() {
    let marker = marker_at(NOW - 1_000, tree("a"));
    assert!(evaluate(Some(&marker), &tree("a"), None, NOW, MAX_AGE).is_green());
}

#[test]
fn staleness_is_reported_before_a_command_mismatch() {
    let marker = marker_at(NOW - 901_000, tree("a"));
    let other = words("make check");
    assert!(matches!(
        evaluate(Some(&marker), &tree("b"), Some(other.as_slice()), NOW, MAX_AGE),
        Verdict::Stale { .. }
    ));
}
