//! Connection target model.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ReadyError;

/// Default PostgreSQL port.
pub const DEFAULT_PORT: u16 = 5432;

/// Where to connect, fixed for the lifetime of a probe run.
///
/// The password is never shown by `Debug` or `display_url`, and is skipped
/// when serialized.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionTarget {
    /// Server hostname, IP, or socket directory
    pub host: String,
    /// Server port
    pub port: u16,
    /// Login username
    pub user: String,
    /// Login password, usually from PGPASSWORD
    #[serde(skip_serializing, default)]
    pub password: Option<String>,
    /// Database name
    pub database: String,
}

impl ConnectionTarget {
    /// Create a target with the default port and no password.
    pub fn new(
        host: impl Into<String>,
        user: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            user: user.into(),
            password: None,
            database: database.into(),
        }
    }

    /// Set the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the password. An empty string means no password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        let password = password.into();
        self.password = if password.is_empty() { None } else { Some(password) };
        self
    }

    /// The password, if one is configured.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Validate the target before any connection is attempted.
    pub fn validate(&self) -> Result<(), ReadyError> {
        if self.host.trim().is_empty() {
            return Err(ReadyError::config("Host is required"));
        }
        if self.port == 0 {
            return Err(ReadyError::config("Port must be between 1 and 65535"));
        }
        if self.user.trim().is_empty() {
            return Err(ReadyError::config("Username is required"));
        }
        if self.database.trim().is_empty() {
            return Err(ReadyError::config("Database name is required"));
        }
        Ok(())
    }

    /// Get the display connection string (without password).
    pub fn display_url(&self) -> String {
        format!("postgresql://{}@{}:{}/{}", self.user, self.host, self.port, self.database)
    }
}

impl fmt::Debug for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionTarget")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| crate::error::REDACTED))
            .field("database", &self.database)
            .finish()
    }
}
