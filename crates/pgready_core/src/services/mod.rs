//! Probing services for pgready.
//!
//! - `connector` - Connector/Connection capabilities and the tokio-postgres implementation
//! - `tables` - Required-table existence checks
//! - `prober` - The readiness polling loop

pub mod connector;
pub mod prober;
pub mod tables;

pub use connector::{Connection, Connector, PgConnection, PgConnector};
pub use prober::Prober;
pub use tables::TableExistenceChecker;
