//! Connection capabilities consumed by the prober.
//!
//! `Connector` opens one connection per attempt; `Connection` answers the
//! liveness ping and catalog lookups. Nothing is pooled or reused across
//! attempts. `PgConnector` is the tokio-postgres implementation.

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_postgres::{Client, NoTls};

use crate::error::ReadyError;
use crate::models::ConnectionTarget;

/// Application name reported to the server.
const APPLICATION_NAME: &str = "pgready";

/// Catalog lookup for a single relation.
const TABLE_EXISTS_SQL: &str =
    "SELECT 1 FROM information_schema.tables WHERE table_schema = $1 AND table_name = $2 LIMIT 1";

/// Opens connections to a database.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Establish a connection, giving up at `deadline`.
    ///
    /// Transport and authentication failures are reported as
    /// `ReadyError::Connect` or `ReadyError::Authentication`.
    async fn connect(
        &self,
        target: &ConnectionTarget,
        deadline: Instant,
    ) -> Result<Box<dyn Connection>, ReadyError>;

    /// Connector name for logging.
    fn name(&self) -> &'static str;
}

/// A single live connection, exclusively owned by one attempt.
#[async_trait]
pub trait Connection: Send {
    /// Ping the server.
    async fn verify_live(&mut self) -> Result<(), ReadyError>;

    /// Whether relation `schema.name` exists.
    ///
    /// `Ok(false)` means the catalog has no such relation; `Err` means the
    /// lookup itself failed.
    async fn lookup_table_exists(&mut self, schema: &str, name: &str) -> Result<bool, ReadyError>;

    /// Close the connection. Safe to call more than once.
    fn release(&mut self);
}

/// PostgreSQL connector backed by tokio-postgres.
#[derive(Debug, Clone, Default)]
pub struct PgConnector;

impl PgConnector {
    /// Create a new PostgreSQL connector.
    pub fn new() -> Self {
        Self
    }

    fn pg_config(target: &ConnectionTarget) -> tokio_postgres::Config {
        let mut pg_config = tokio_postgres::Config::new();
        pg_config.host(&target.host);
        pg_config.port(target.port);
        pg_config.user(&target.user);
        pg_config.dbname(&target.database);
        if let Some(password) = target.password() {
            pg_config.password(password);
        }
        pg_config.application_name(APPLICATION_NAME);
        pg_config
    }
}

#[async_trait]
impl Connector for PgConnector {
    async fn connect(
        &self,
        target: &ConnectionTarget,
        deadline: Instant,
    ) -> Result<Box<dyn Connection>, ReadyError> {
        let budget = deadline.saturating_duration_since(Instant::now());
        if budget.is_zero() {
            return Err(ReadyError::deadline_exceeded("connection attempt", budget));
        }

        let mut pg_config = Self::pg_config(target);
        pg_config.connect_timeout(budget);

        let (client, connection) = pg_config.connect(NoTls).await?;

        // The connection object drives the socket; it finishes once the client is dropped.
        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::debug!(error = %e, "Connection driver exited with error");
            }
        });

        tracing::debug!(url = %target.display_url(), "Connection established");

        Ok(Box::new(PgConnection { client: Some(client), driver: Some(driver) }))
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}

/// A tokio-postgres client and the task driving its socket.
///
/// Dropping it releases the connection, so an attempt abandoned at a
/// deadline still closes its socket.
pub struct PgConnection {
    client: Option<Client>,
    driver: Option<JoinHandle<()>>,
}

impl PgConnection {
    fn client(&self) -> Result<&Client, ReadyError> {
        self.client.as_ref().ok_or_else(|| ReadyError::internal("Connection already released"))
    }
}

#[async_trait]
impl Connection for PgConnection {
    async fn verify_live(&mut self) -> Result<(), ReadyError> {
        self.client()?
            .simple_query("SELECT 1")
            .await
            .map(|_| ())
            .map_err(|e| ReadyError::liveness(describe(&e)))
    }

    async fn lookup_table_exists(&mut self, schema: &str, name: &str) -> Result<bool, ReadyError> {
        let row = self
            .client()?
            .query_opt(TABLE_EXISTS_SQL, &[&schema, &name])
            .await
            .map_err(|e| ReadyError::catalog_query(format!("{schema}.{name}"), describe(&e)))?;
        Ok(row.is_some())
    }

    fn release(&mut self) {
        // Dropping the client closes the socket; the driver then exits on its own.
        if self.client.take().is_some() {
            tracing::trace!("Connection released");
        }
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
    }
}

impl Drop for PgConnection {
    fn drop(&mut self) {
        self.release();
    }
}

/// Prefer the server's message over the generic "db error" wrapper.
fn describe(err: &tokio_postgres::Error) -> String {
    match err.as_db_error() {
        Some(db_err) => format!("{} ({})", db_err.message(), db_err.code().code()),
        None => err.to_string(),
    }
}
