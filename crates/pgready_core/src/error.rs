//! Error types for pgready.
//!
//! Every failure the prober can observe maps onto one `ReadyError` variant.
//! Retryable kinds are folded into the run's last error and drive another
//! attempt; configuration errors are rejected before the loop starts.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::models::TableIdentifier;

/// Replacement text for a redacted secret.
pub const REDACTED: &str = "[PASSWORD]";

/// Main error type for pgready.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReadyError {
    /// Invalid configuration, detected before probing starts.
    #[error("Config error: {message}")]
    Config {
        /// Human-readable error message.
        message: String,
    },

    /// Transport could not be established.
    #[error("Connection error: {message}")]
    Connect {
        /// Human-readable error message.
        message: String,
    },

    /// Server rejected the credentials.
    #[error("Authentication error: {message}")]
    Authentication {
        /// Human-readable error message.
        message: String,
        /// Actionable hint for the user.
        hint: Option<String>,
    },

    /// Connection opened but did not answer the liveness ping.
    #[error("Liveness check failed: {message}")]
    Liveness {
        /// Human-readable error message.
        message: String,
    },

    /// A catalog lookup failed for a reason other than "no such table".
    #[error("Catalog query failed for '{table}': {message}")]
    CatalogQuery {
        /// Table being looked up when the query failed.
        table: String,
        /// Human-readable error message.
        message: String,
    },

    /// Connection succeeded but some required tables do not exist yet.
    #[error("required tables missing: {}", join_tables(tables))]
    MissingTables {
        /// Missing tables, in the order the user listed them.
        tables: Vec<TableIdentifier>,
    },

    /// An operation ran past its deadline.
    #[error("{operation} timed out after {}ms", after.as_millis())]
    DeadlineExceeded {
        /// What was being waited on.
        operation: String,
        /// Budget that elapsed.
        after: Duration,
    },

    /// Unexpected internal error.
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
    },
}

fn join_tables(tables: &[TableIdentifier]) -> String {
    tables.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

impl ReadyError {
    // ========== Constructors ==========

    /// Create a new config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    /// Create a new connection error.
    pub fn connect(message: impl Into<String>) -> Self {
        Self::Connect { message: message.into() }
    }

    /// Create a new authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
            hint: Some("Check username and password".to_string()),
        }
    }

    /// Create a new authentication error with custom hint.
    pub fn authentication_with_hint(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::Authentication { message: message.into(), hint: Some(hint.into()) }
    }

    /// Create a new liveness error.
    pub fn liveness(message: impl Into<String>) -> Self {
        Self::Liveness { message: message.into() }
    }

    /// Create a new catalog query error.
    pub fn catalog_query(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CatalogQuery { table: table.into(), message: message.into() }
    }

    /// Create a missing tables error.
    pub fn missing_tables(tables: Vec<TableIdentifier>) -> Self {
        Self::MissingTables { tables }
    }

    /// Create a deadline exceeded error.
    pub fn deadline_exceeded(operation: impl Into<String>, after: Duration) -> Self {
        Self::DeadlineExceeded { operation: operation.into(), after }
    }

    /// Create a new internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    // ========== Methods ==========

    /// Whether the prober should keep polling after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. }
                | Self::Authentication { .. }
                | Self::Liveness { .. }
                | Self::CatalogQuery { .. }
                | Self::MissingTables { .. }
                | Self::DeadlineExceeded { .. }
        )
    }

    /// Whether this error came from establishing the connection.
    pub fn is_connect_failure(&self) -> bool {
        matches!(self, Self::Connect { .. } | Self::Authentication { .. } | Self::Liveness { .. })
    }

    /// Get the error category name.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config { .. } => "Config",
            Self::Connect { .. } => "Connection",
            Self::Authentication { .. } => "Authentication",
            Self::Liveness { .. } => "Connection",
            Self::CatalogQuery { .. } => "Catalog",
            Self::MissingTables { .. } => "Tables",
            Self::DeadlineExceeded { .. } => "Timeout",
            Self::Internal { .. } => "Internal",
        }
    }

    /// Get actionable hint for the user.
    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::Config { .. } => Some("Run with --help to see accepted options"),
            Self::Connect { .. } => Some("Check that the database server is running"),
            Self::Authentication { hint, .. } => hint.as_deref(),
            Self::Liveness { .. } => Some("The server accepted the connection but is not answering"),
            Self::CatalogQuery { .. } => Some("Check that the user may read information_schema"),
            Self::MissingTables { .. } => Some("Have the migrations run?"),
            Self::DeadlineExceeded { .. } => Some("Increase --timeout or --conn-timeout"),
            Self::Internal { .. } => Some("Please report this issue"),
        }
    }

    /// Replace every occurrence of `secret` in the error text with `[PASSWORD]`.
    ///
    /// An empty secret leaves the error untouched.
    pub fn redact(self, secret: Option<&str>) -> Self {
        let Some(secret) = secret.filter(|s| !s.is_empty()) else {
            return self;
        };
        let scrub = |s: String| s.replace(secret, REDACTED);

        match self {
            Self::Config { message } => Self::Config { message: scrub(message) },
            Self::Connect { message } => Self::Connect { message: scrub(message) },
            Self::Authentication { message, hint } => {
                Self::Authentication { message: scrub(message), hint: hint.map(scrub) }
            }
            Self::Liveness { message } => Self::Liveness { message: scrub(message) },
            Self::CatalogQuery { table, message } => {
                Self::CatalogQuery { table, message: scrub(message) }
            }
            Self::Internal { message } => Self::Internal { message: scrub(message) },
            other @ (Self::MissingTables { .. } | Self::DeadlineExceeded { .. }) => other,
        }
    }

    /// Convert to user-displayable error info.
    pub fn to_error_info(&self) -> ErrorInfo {
        let error_type = format!("{} Error", self.category());
        let message = self.to_string();
        let hint = self.hint().map(String::from);

        let technical_detail = match self {
            Self::CatalogQuery { table, .. } => Some(format!("Table: {table}")),
            Self::MissingTables { tables } => Some(format!("{} table(s) missing", tables.len())),
            Self::DeadlineExceeded { operation, after } => {
                Some(format!("Operation: {operation}\nBudget: {after:?}"))
            }
            _ => None,
        };

        ErrorInfo { error_type, message, hint, technical_detail }
    }
}

/// User-displayable error information.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorInfo {
    /// Category name (e.g., "Connection Error").
    pub error_type: String,
    /// User-friendly message.
    pub message: String,
    /// Actionable suggestion.
    pub hint: Option<String>,
    /// Extra detail for verbose output.
    pub technical_detail: Option<String>,
}

// ========== Error Conversions ==========

/// Convert from tokio_postgres::Error raised while establishing a connection.
impl From<tokio_postgres::Error> for ReadyError {
    fn from(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let message = db_err.message().to_string();
            let code_str = db_err.code().code();
            return match code_str {
                "28P01" => ReadyError::authentication_with_hint(
                    message,
                    "Invalid password - check PGPASSWORD",
                ),
                "28000" => ReadyError::authentication_with_hint(
                    message,
                    "Authentication failed - check username and pg_hba.conf",
                ),
                // 08xxx connection exceptions, 57P03 cannot_connect_now (server starting up)
                _ => ReadyError::connect(message),
            };
        }

        if err.is_closed() {
            return ReadyError::connect("Connection closed");
        }

        ReadyError::connect(err.to_string())
    }
}
