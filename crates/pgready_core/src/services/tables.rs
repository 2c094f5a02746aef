//! Required-table verification.
//!
//! Looks each table up in the catalog, one query per identifier, and reports
//! the ones that do not exist yet.

use crate::error::ReadyError;
use crate::models::TableIdentifier;
use crate::services::connector::Connection;

/// Table existence checker.
pub struct TableExistenceChecker;

impl TableExistenceChecker {
    /// Return the tables from `tables` that do not exist, in input order.
    ///
    /// Duplicates in the input produce duplicates in the output. If any lookup
    /// fails the error is returned and no partial list is produced. An empty
    /// input never touches the connection.
    pub async fn check(
        conn: &mut dyn Connection,
        tables: &[TableIdentifier],
    ) -> Result<Vec<TableIdentifier>, ReadyError> {
        let mut missing = Vec::new();

        for table in tables {
            let exists = conn.lookup_table_exists(&table.schema, &table.name).await?;
            if !exists {
                tracing::trace!(%table, "Table not found");
                missing.push(table.clone());
            }
        }

        Ok(missing)
    }
}
