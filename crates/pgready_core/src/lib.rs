//! Core types and probing logic for pgready.
//!
//! This crate provides everything below the command line:
//!
//! - **error**: Error taxonomy and password redaction
//! - **models**: Connection targets, table identifiers, probe settings and results
//! - **services**: Connector capabilities, table checks and the polling loop
//! - **logging**: Structured logging setup

pub mod error;
pub mod logging;
pub mod models;
pub mod services;

#[cfg(test)]
mod test_support;
#[cfg(test)]
mod verification_tests;

pub use error::{ErrorInfo, ReadyError};
pub use models::{
    parse_table_list, Attempt, AttemptOutcome, ConnectionTarget, ExitStatus, ProbeResult,
    ProbeSettings, ProbeStatus, ProbeSummary, TableIdentifier, TimeoutPolicy,
};
pub use services::{Connection, Connector, PgConnector, Prober, TableExistenceChecker};
