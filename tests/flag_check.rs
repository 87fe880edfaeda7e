use greencently::check::{CheckFailed, CheckOutcome, CheckState, FlagCheck};

/// Passes unless the run was started with `SET_NON_EMPTY_TO_FAIL_TEST_ONE`
/// set to something non-empty. Lets a pre-commit setup prove that a red run
/// really blocks the commit.
#[test]
fn test_one() {
    assert_eq!(FlagCheck::from_env().run(), Ok(()));
}

fn outcome(value: Option<&str>) -> CheckOutcome {
    FlagCheck::new(value.map(str::to_owned)).evaluate()
}

#[test]
fn unset_flag_passes() {
    assert_eq!(outcome(None), CheckOutcome::Passed);
}

#[test]
fn empty_flag_passes() {
    assert_eq!(outcome(Some("")), CheckOutcome::Passed);
}

#[test]
fn anything_fails() {
    assert_eq!(outcome(Some("anything")), CheckOutcome::Failed);
}

#[test]
fn zero_is_not_parsed_as_false() {
    assert_eq!(outcome(Some("0")), CheckOutcome::Failed);
    assert_eq!(outcome(Some("false")), CheckOutcome::Failed);
    assert_eq!(outcome(Some("x")), CheckOutcome::Failed);
}

#[test]
fn same_flag_same_outcome() {
    for value in [None, Some(""), Some("1"), Some("no")] {
        let check = FlagCheck::new(value.map(str::to_owned));
        assert_eq!(check.evaluate(), check.evaluate());
        assert_eq!(check.run(), check.run());
    }
}

#[test]
fn failure_surfaces_as_an_assertion() {
    let check = FlagCheck::new(Some("please fail".into()));
    assert_eq!(check.state(), CheckState::Pending);
    assert_eq!(check.finish(), CheckState::Done(CheckOutcome::Failed));

    let err = check.run().unwrap_err();
    assert_eq!(err, CheckFailed);
    assert_eq!(err.to_string(), "assertion failed");
}
