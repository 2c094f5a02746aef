//! Probe settings and per-attempt records.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ReadyError;
use crate::models::TableIdentifier;

/// Default overall wait budget.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
/// Default per-attempt budget.
pub const DEFAULT_CONN_TIMEOUT: Duration = Duration::from_secs(5);
/// Default pause between attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// How a run that hits the overall deadline reports its status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeoutPolicy {
    /// Always report `Timeout`.
    #[default]
    Generic,
    /// Report `ChecksFailed` if any attempt connected, else `ConnectionFailed`.
    Classify,
}

/// Timing parameters of a probe run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSettings {
    /// Bound on the whole run
    pub overall_timeout: Duration,
    /// Bound on each attempt, capped by the time left overall
    pub attempt_timeout: Duration,
    /// Pause after a failed attempt
    pub retry_interval: Duration,
    /// Status reported when the overall deadline passes
    pub timeout_policy: TimeoutPolicy,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            overall_timeout: DEFAULT_TIMEOUT,
            attempt_timeout: DEFAULT_CONN_TIMEOUT,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            timeout_policy: TimeoutPolicy::default(),
        }
    }
}

impl ProbeSettings {
    /// Set the overall timeout.
    pub fn overall_timeout(mut self, timeout: Duration) -> Self {
        self.overall_timeout = timeout;
        self
    }

    /// Set the per-attempt timeout.
    pub fn attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Set the retry interval.
    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    /// Set the timeout policy.
    pub fn timeout_policy(mut self, policy: TimeoutPolicy) -> Self {
        self.timeout_policy = policy;
        self
    }

    /// Validate the settings.
    ///
    /// A zero overall timeout would end the run before any attempt.
    pub fn validate(&self) -> Result<(), ReadyError> {
        if self.overall_timeout.is_zero() {
            return Err(ReadyError::config("Timeout must be greater than zero"));
        }
        if self.attempt_timeout.is_zero() {
            return Err(ReadyError::config("Connection timeout must be greater than zero"));
        }
        Ok(())
    }
}

/// What happened during one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Connected and verified live; table checks not finished yet
    Connected,
    /// Could not connect or the connection was not live
    ConnectFailed(ReadyError),
    /// Connected, but these tables do not exist
    TablesMissing(Vec<TableIdentifier>),
    /// Connected, but the catalog lookup itself failed
    CheckFailed(ReadyError),
    /// Connected and every required table exists
    Success,
}

impl AttemptOutcome {
    /// Whether the attempt got as far as a live connection.
    pub fn connected(&self) -> bool {
        !matches!(self, Self::ConnectFailed(_))
    }

    /// The error to record as the run's last error, if any.
    pub fn error(&self) -> Option<ReadyError> {
        match self {
            Self::ConnectFailed(err) | Self::CheckFailed(err) => Some(err.clone()),
            Self::TablesMissing(tables) => Some(ReadyError::missing_tables(tables.clone())),
            Self::Connected | Self::Success => None,
        }
    }
}

/// One connect-then-check cycle.
#[derive(Debug, Clone)]
pub struct Attempt {
    /// 1-based attempt number
    pub number: u32,
    /// Wall-clock start time
    pub started_at: DateTime<Utc>,
    /// Current outcome
    pub outcome: AttemptOutcome,
}

impl Attempt {
    /// Record an attempt that began at `started_at`.
    pub fn new(number: u32, started_at: DateTime<Utc>, outcome: AttemptOutcome) -> Self {
        Self { number, started_at, outcome }
    }

    /// Move the attempt to a later outcome.
    pub fn advance(mut self, outcome: AttemptOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    /// Whether the attempt found the database ready.
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Success)
    }
}
