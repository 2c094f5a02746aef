//! Readiness polling loop.
//!
//! Provides:
//! - An overall deadline fixed when the run starts
//! - Per-attempt deadlines capped by the time left overall
//! - Retry of every connection, liveness and catalog failure until the deadline
//! - Redaction of the password from every recorded or logged error

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::{timeout_at, Instant};

use crate::error::ReadyError;
use crate::models::{
    Attempt, AttemptOutcome, ConnectionTarget, ProbeResult, ProbeSettings, ProbeStatus,
    TableIdentifier, TimeoutPolicy,
};
use crate::services::connector::{Connection, Connector};
use crate::services::tables::TableExistenceChecker;

/// Polls a database until it is ready or the overall timeout elapses.
///
/// Attempts run one at a time; each opens its own connection and releases it
/// before the next attempt starts.
pub struct Prober {
    connector: Arc<dyn Connector>,
    settings: ProbeSettings,
}

impl Prober {
    /// Create a prober. `settings` should already be validated.
    pub fn new(connector: Arc<dyn Connector>, settings: ProbeSettings) -> Self {
        Self { connector, settings }
    }

    /// Get the probe settings.
    pub fn settings(&self) -> &ProbeSettings {
        &self.settings
    }

    /// Run the probe loop to completion.
    ///
    /// Never fails: every error observed while polling is retryable and ends
    /// up as the result's `last_error`.
    pub async fn run(&self, target: &ConnectionTarget, tables: &[TableIdentifier]) -> ProbeResult {
        let start = Instant::now();
        let overall_deadline = start + self.settings.overall_timeout;

        let mut attempts: u32 = 0;
        let mut ever_connected = false;
        let mut last_error: Option<ReadyError> = None;

        tracing::debug!(
            connector = self.connector.name(),
            url = %target.display_url(),
            tables = tables.len(),
            timeout_ms = self.settings.overall_timeout.as_millis() as u64,
            "Starting readiness probe"
        );

        loop {
            if Instant::now() >= overall_deadline {
                let status = self.timeout_status(ever_connected);
                tracing::error!(
                    attempts,
                    status = status.as_str(),
                    last_error = last_error.as_ref().map(tracing::field::display),
                    "Overall timeout ({:?}) exceeded",
                    self.settings.overall_timeout
                );
                return ProbeResult::new(status, start.elapsed(), attempts, last_error);
            }

            attempts += 1;
            let attempt = self.attempt(attempts, target, tables, overall_deadline).await;
            ever_connected |= attempt.outcome.connected();

            if attempt.is_success() {
                let elapsed = start.elapsed();
                tracing::info!(
                    attempts,
                    "Database ready after {:?}",
                    Duration::from_millis(elapsed.as_millis() as u64)
                );
                return ProbeResult::new(ProbeStatus::Ready, elapsed, attempts, None);
            }

            if let Some(err) = attempt.outcome.error() {
                tracing::info!(attempt = attempt.number, error = %err, "Database not ready");
                last_error = Some(err);
            }

            // Not clipped to the deadline; the check above stops the loop.
            tokio::time::sleep(self.settings.retry_interval).await;
        }
    }

    /// Run one connect-then-check cycle. The connection is released before
    /// returning, whatever the outcome.
    async fn attempt(
        &self,
        number: u32,
        target: &ConnectionTarget,
        tables: &[TableIdentifier],
        overall_deadline: Instant,
    ) -> Attempt {
        let started_at = Utc::now();
        let secret = target.password();

        let mut conn = match self.open(target, overall_deadline).await {
            Ok(conn) => conn,
            Err(err) => {
                let outcome = AttemptOutcome::ConnectFailed(err.redact(secret));
                return Attempt::new(number, started_at, outcome);
            }
        };

        let attempt = Attempt::new(number, started_at, AttemptOutcome::Connected);
        tracing::debug!(attempt = number, "Connection successful");

        let outcome = match self.check_tables(conn.as_mut(), tables, overall_deadline).await {
            AttemptOutcome::CheckFailed(err) => AttemptOutcome::CheckFailed(err.redact(secret)),
            outcome => outcome,
        };
        conn.release();

        attempt.advance(outcome)
    }

    /// Connect and ping, both bounded by one attempt deadline.
    async fn open(
        &self,
        target: &ConnectionTarget,
        overall_deadline: Instant,
    ) -> Result<Box<dyn Connection>, ReadyError> {
        let (deadline, budget) = self.attempt_deadline(overall_deadline);

        let mut conn = match timeout_at(deadline, self.connector.connect(target, deadline)).await {
            Ok(result) => result?,
            Err(_) => return Err(ReadyError::deadline_exceeded("connection attempt", budget)),
        };

        match timeout_at(deadline, conn.verify_live()).await {
            Ok(Ok(())) => Ok(conn),
            Ok(Err(err)) => {
                conn.release();
                Err(err)
            }
            Err(_) => {
                conn.release();
                Err(ReadyError::deadline_exceeded("liveness check", budget))
            }
        }
    }

    /// Look up the required tables with a fresh attempt budget.
    async fn check_tables(
        &self,
        conn: &mut dyn Connection,
        tables: &[TableIdentifier],
        overall_deadline: Instant,
    ) -> AttemptOutcome {
        if tables.is_empty() {
            return AttemptOutcome::Success;
        }

        let (deadline, budget) = self.attempt_deadline(overall_deadline);
        match timeout_at(deadline, TableExistenceChecker::check(conn, tables)).await {
            Ok(Ok(missing)) if missing.is_empty() => {
                tracing::debug!(tables = tables.len(), "All required tables found");
                AttemptOutcome::Success
            }
            Ok(Ok(missing)) => AttemptOutcome::TablesMissing(missing),
            Ok(Err(err)) => AttemptOutcome::CheckFailed(err),
            Err(_) => {
                AttemptOutcome::CheckFailed(ReadyError::deadline_exceeded("table check", budget))
            }
        }
    }

    /// Deadline and budget for the next bounded step: the attempt timeout,
    /// but never past the overall deadline.
    fn attempt_deadline(&self, overall_deadline: Instant) -> (Instant, Duration) {
        let now = Instant::now();
        let remaining = overall_deadline.saturating_duration_since(now);
        let budget = self.settings.attempt_timeout.min(remaining);
        (now + budget, budget)
    }

    fn timeout_status(&self, ever_connected: bool) -> ProbeStatus {
        match self.settings.timeout_policy {
            TimeoutPolicy::Generic => ProbeStatus::Timeout,
            TimeoutPolicy::Classify if ever_connected => ProbeStatus::ChecksFailed,
            TimeoutPolicy::Classify => ProbeStatus::ConnectionFailed,
        }
    }
}
