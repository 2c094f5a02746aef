//! Terminal probe results and the exit-status policy.

use std::time::Duration;

use serde::Serialize;

use crate::error::ReadyError;

/// Terminal status of a probe run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    /// Server reachable and all required tables present
    Ready,
    /// Deadline passed and no attempt ever connected
    ConnectionFailed,
    /// Deadline passed after connecting, but the tables never all appeared
    ChecksFailed,
    /// Deadline passed
    Timeout,
}

impl ProbeStatus {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::ConnectionFailed => "connection_failed",
            Self::ChecksFailed => "checks_failed",
            Self::Timeout => "timeout",
        }
    }
}

/// Result of a probe run. Built once, when the loop stops.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    status: ProbeStatus,
    elapsed: Duration,
    attempts: u32,
    last_error: Option<ReadyError>,
}

impl ProbeResult {
    pub(crate) fn new(
        status: ProbeStatus,
        elapsed: Duration,
        attempts: u32,
        last_error: Option<ReadyError>,
    ) -> Self {
        Self { status, elapsed, attempts, last_error }
    }

    /// Terminal status.
    pub fn status(&self) -> ProbeStatus {
        self.status
    }

    /// Time from the start of the run until the loop stopped.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Number of attempts started.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Most recent retryable error, already redacted.
    pub fn last_error(&self) -> Option<&ReadyError> {
        self.last_error.as_ref()
    }

    /// Whether the database is ready.
    pub fn is_ready(&self) -> bool {
        self.status == ProbeStatus::Ready
    }

    /// Exit status for this result.
    pub fn exit_status(&self) -> ExitStatus {
        ExitStatus::from_probe_status(self.status)
    }

    /// Machine-readable summary.
    pub fn summary(&self) -> ProbeSummary {
        let exit_status = self.exit_status();
        ProbeSummary {
            status: self.status,
            exit_code: exit_status.code(),
            elapsed_ms: self.elapsed.as_millis() as u64,
            attempts: self.attempts,
            last_error: self.last_error.as_ref().map(ToString::to_string),
        }
    }
}

/// Serializable view of a `ProbeResult`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeSummary {
    pub status: ProbeStatus,
    pub exit_code: u8,
    pub elapsed_ms: u64,
    pub attempts: u32,
    pub last_error: Option<String>,
}

/// Process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitStatus {
    /// Server is accepting connections (and tables exist if requested).
    Ready,
    /// Connection never succeeded before the deadline.
    ConnectionFailed,
    /// Connection succeeded, but required tables never all appeared.
    ChecksFailed,
    /// Invalid command-line arguments.
    BadArgs,
    /// Unexpected internal fault.
    InternalError,
}

impl ExitStatus {
    /// Map a probe status to its exit status.
    ///
    /// `Timeout` exits like a connection failure.
    pub fn from_probe_status(status: ProbeStatus) -> Self {
        match status {
            ProbeStatus::Ready => Self::Ready,
            ProbeStatus::ConnectionFailed | ProbeStatus::Timeout => Self::ConnectionFailed,
            ProbeStatus::ChecksFailed => Self::ChecksFailed,
        }
    }

    /// Map an error raised outside the probe loop.
    pub fn from_error(err: &ReadyError) -> Self {
        match err {
            ReadyError::Config { .. } => Self::BadArgs,
            _ => Self::InternalError,
        }
    }

    /// Numeric process exit code.
    pub fn code(&self) -> u8 {
        match self {
            Self::Ready => 0,
            Self::ConnectionFailed => 1,
            Self::ChecksFailed => 2,
            Self::BadArgs => 3,
            Self::InternalError => 4,
        }
    }
}

impl From<ExitStatus> for std::process::ExitCode {
    fn from(status: ExitStatus) -> Self {
        std::process::ExitCode::from(status.code())
    }
}
