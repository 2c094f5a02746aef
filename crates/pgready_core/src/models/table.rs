//! Table identifiers and table-list parsing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ReadyError;

/// Schema assumed for unqualified table names.
pub const DEFAULT_SCHEMA: &str = "public";

/// A `(schema, name)` pair identifying a relation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableIdentifier {
    /// Schema name (e.g., "public").
    pub schema: String,
    /// Table name.
    pub name: String,
}

impl TableIdentifier {
    /// Create an identifier from an explicit schema and name.
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self { schema: schema.into(), name: name.into() }
    }

    /// Create an identifier in the default schema.
    pub fn unqualified(name: impl Into<String>) -> Self {
        Self::new(DEFAULT_SCHEMA, name)
    }
}

impl fmt::Display for TableIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

impl FromStr for TableIdentifier {
    type Err = ReadyError;

    /// Parse `table` or `schema.table`, splitting on the first dot.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ReadyError::config("Table name must not be empty"));
        }

        match s.split_once('.') {
            Some((schema, name)) => {
                let (schema, name) = (schema.trim(), name.trim());
                if schema.is_empty() || name.is_empty() {
                    return Err(ReadyError::config(format!(
                        "Invalid table '{s}': expected 'schema.table'"
                    )));
                }
                Ok(Self::new(schema, name))
            }
            None => Ok(Self::unqualified(s)),
        }
    }
}

/// Parse a comma-separated table list.
///
/// Segments are trimmed and empty segments (`"users,,orders,"`) are dropped.
/// Duplicates are kept in the order given.
pub fn parse_table_list(raw: &str) -> Result<Vec<TableIdentifier>, ReadyError> {
    raw.split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(TableIdentifier::from_str)
        .collect()
}
