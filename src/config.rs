#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    sync::{Arc, Mutex, OnceLock},
    time::Duration,
};

use tracing::Level;

use crate::constants::{
    DEFAULT_GIT_TIMEOUT_SECS, DEFAULT_MAX_AGE_SECS, GIT_TIMEOUT_VAR, LOG_VAR, MAX_AGE_VAR,
    TEST_COMMAND_VAR, TEST_TIMEOUT_VAR,
};

/// Runtime configuration shared across the crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigState {
    /// Markers older than this are stale.
    max_age:      Duration,
    /// Optional deadline for the test command.
    test_timeout: Option<Duration>,
    /// Deadline for each git invocation.
    git_timeout:  Duration,
    /// Test command used when none is given on the command line.
    test_command: Vec<String>,
    /// Log level for the CLI.
    log_level:    Level,
}

impl Default for ConfigState {
    fn default() -> Self {
        Self {
            max_age:      Duration::from_secs(DEFAULT_MAX_AGE_SECS),
            test_timeout: None,
            git_timeout:  Duration::from_secs(DEFAULT_GIT_TIMEOUT_SECS),
            test_command: Vec::new(),
            log_level:    Level::INFO,
        }
    }
}

impl ConfigState {
    /// Builds a configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary variable lookup. Unparseable
    /// values fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let secs = |key: &str| {
            lookup(key)
                .and_then(|value| value.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
        };

        let test_command = lookup(TEST_COMMAND_VAR)
            .map(|value| value.split_whitespace().map(str::to_owned).collect())
            .unwrap_or_default();

        let log_level = lookup(LOG_VAR)
            .and_then(|value| value.trim().parse::<Level>().ok())
            .unwrap_or(defaults.log_level);

        Self {
            max_age: secs(MAX_AGE_VAR).unwrap_or(defaults.max_age),
            test_timeout: secs(TEST_TIMEOUT_VAR).filter(|d| !d.is_zero()),
            git_timeout: secs(GIT_TIMEOUT_VAR).unwrap_or(defaults.git_timeout),
            test_command,
            log_level,
        }
    }

    /// Markers older than this are stale. Zero means never fresh.
    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Returns a copy with a different maximum marker age.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Deadline for the test command, if any.
    pub fn test_timeout(&self) -> Option<Duration> {
        self.test_timeout
    }

    /// Deadline for each git invocation.
    pub fn git_timeout(&self) -> Duration {
        self.git_timeout
    }

    /// The configured default test command; empty when unset.
    pub fn test_command(&self) -> &[String] {
        &self.test_command
    }

    /// Log level for the CLI.
    pub fn log_level(&self) -> Level {
        self.log_level
    }
}

/// Shared configuration handle used throughout the crate.
#[derive(Debug, Clone)]
pub struct ConfigHandle(Arc<ConfigState>);

impl std::ops::Deref for ConfigHandle {
    type Target = ConfigState;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Global storage for the lazily constructed configuration state.
static CONFIG_SLOT: OnceLock<Mutex<Option<Arc<ConfigState>>>> = OnceLock::new();

/// Returns the mutex guarding the global configuration slot.
fn slot() -> &'static Mutex<Option<Arc<ConfigState>>> {
    CONFIG_SLOT.get_or_init(|| Mutex::new(None))
}

/// Returns the active configuration, reading the environment on first use.
pub fn get() -> ConfigHandle {
    let mut guard = slot().lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(cfg) = guard.as_ref() {
        return ConfigHandle(Arc::clone(cfg));
    }

    let cfg = Arc::new(ConfigState::from_env());
    *guard = Some(Arc::clone(&cfg));
    ConfigHandle(cfg)
}

/// Replaces the active configuration, e.g. after command-line overrides.
pub fn install(state: ConfigState) -> ConfigHandle {
    let cfg = Arc::new(state);
    let mut guard = slot().lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = Some(Arc::clone(&cfg));
    ConfigHandle(cfg)
}

/// Returns the configured maximum marker age.
pub fn max_age() -> Duration {
    get().max_age()
}

/// Returns the configured test command deadline.
pub fn test_timeout() -> Option<Duration> {
    get().test_timeout()
}

/// Returns the configured git deadline.
pub fn git_timeout() -> Duration {
    get().git_timeout()
}
