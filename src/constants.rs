#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Environment variable that, when non-empty, makes `test_one` fail.
pub const FAIL_TEST_ONE_VAR: &str = "SET_NON_EMPTY_TO_FAIL_TEST_ONE";

/// Maximum age of a green marker before it is considered stale.
pub const MAX_AGE_VAR: &str = "GREENCENTLY_MAX_AGE_SECS";

/// Deadline for the test command, in seconds. Unset means no deadline.
pub const TEST_TIMEOUT_VAR: &str = "GREENCENTLY_TEST_TIMEOUT_SECS";

/// Deadline for each git invocation, in seconds.
pub const GIT_TIMEOUT_VAR: &str = "GREENCENTLY_GIT_TIMEOUT_SECS";

/// Default test command, split on whitespace.
pub const TEST_COMMAND_VAR: &str = "GREENCENTLY_TEST_COMMAND";

/// Log level for the CLI.
pub const LOG_VAR: &str = "GREENCENTLY_LOG";

/// Default for [`MAX_AGE_VAR`]: fifteen minutes.
pub const DEFAULT_MAX_AGE_SECS: u64 = 15 * 60;

/// Default for [`GIT_TIMEOUT_VAR`].
pub const DEFAULT_GIT_TIMEOUT_SECS: u64 = 30;

/// File name of the green marker, relative to the git directory.
pub const MARKER_FILE: &str = "greencently.json";

/// Format version written into every marker.
pub const MARKER_VERSION: u32 = 2;

/// Line embedded in hooks written by greencently, used to recognize them
/// again on uninstall.
pub const HOOK_SIGNATURE: &str = "# installed by greencently";
