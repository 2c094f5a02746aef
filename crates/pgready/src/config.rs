//! Resolved probe configuration.

use pgready_core::{ConnectionTarget, ProbeSettings, ReadyError, TableIdentifier};

use crate::cli::OutputFormat;

/// Everything one run needs, resolved from arguments and environment.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub target: ConnectionTarget,
    pub tables: Vec<TableIdentifier>,
    pub settings: ProbeSettings,
    pub quiet: bool,
    pub output: OutputFormat,
}

impl ProbeConfig {
    /// Validate the configuration before the probe loop starts.
    pub fn validate(&self) -> Result<(), ReadyError> {
        self.target.validate()?;
        self.settings.validate()
    }

    /// Log the startup banner.
    pub fn log_banner(&self) {
        let target = &self.target;
        tracing::info!(
            "Attempting to connect to database: host={} port={} user={} dbname={}",
            target.host,
            target.port,
            target.user,
            target.database
        );
        if !self.tables.is_empty() {
            let tables: Vec<String> = self.tables.iter().map(ToString::to_string).collect();
            tracing::info!("Will also check for tables: [{}]", tables.join(", "));
        }
        tracing::info!(
            "Waiting up to {:?} for database to be ready...",
            self.settings.overall_timeout
        );
    }
}
