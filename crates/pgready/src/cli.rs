//! Command-line interface.

use std::time::Duration;

use clap::{Parser, ValueEnum};
use pgready_core::models::target::DEFAULT_PORT;
use pgready_core::{
    parse_table_list, ConnectionTarget, ProbeSettings, ReadyError, TimeoutPolicy,
};

use crate::config::ProbeConfig;

const DEFAULT_HOST: &str = "localhost";
const FALLBACK_USER: &str = "postgres";

const AFTER_HELP: &str = "\
Environment Variables:
  PGHOST, PGPORT, PGUSER, PGPASSWORD, PGDATABASE can be used for connection parameters.
  PGREADY_LOG (or RUST_LOG) overrides the log filter.

Exit Status:
  0: Server is accepting connections (and tables exist if specified).
  1: Server connection failed (timeout, refused, etc.).
  2: Connection succeeded, but table check failed (tables missing).
  3: Invalid command-line arguments.
  4: Internal error.";

/// How the final result is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Log lines on stderr only
    #[default]
    Text,
    /// A JSON summary on stdout
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "pgready",
    about = "Wait until a PostgreSQL server accepts connections and required tables exist",
    version,
    after_help = AFTER_HELP
)]
pub struct Cli {
    /// Database server host or socket directory
    #[arg(long, env = "PGHOST", default_value = DEFAULT_HOST)]
    host: String,

    /// Database server port
    #[arg(long, env = "PGPORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Database user name [default: $USER, then postgres]
    #[arg(long, env = "PGUSER")]
    username: Option<String>,

    /// Database name to connect to [default: the user name]
    #[arg(long, env = "PGDATABASE")]
    dbname: Option<String>,

    /// Comma-separated list of tables to check for existence (e.g. 'users,audit.events')
    #[arg(long, default_value = "")]
    tables: String,

    /// Maximum time to wait for connection and checks
    #[arg(long, value_parser = parse_duration, default_value = "60s")]
    timeout: Duration,

    /// Timeout for each connection attempt
    #[arg(long = "conn-timeout", value_parser = parse_duration, default_value = "5s")]
    conn_timeout: Duration,

    /// Pause between attempts
    #[arg(long, value_parser = parse_duration, default_value = "1s")]
    interval: Duration,

    /// Run quietly, only exit code matters
    #[arg(long)]
    quiet: bool,

    /// On timeout, exit 2 if the server was ever reachable and 1 if it never was
    #[arg(long = "classify-timeout")]
    classify_timeout: bool,

    /// Result format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
}

impl Cli {
    pub fn quiet(&self) -> bool {
        self.quiet
    }

    /// Turn parsed arguments into a validated probe configuration.
    ///
    /// `env` looks up process environment variables that clap does not bind
    /// directly: `PGPASSWORD` and the OS user name.
    pub fn resolve(self, env: impl Fn(&str) -> Option<String>) -> Result<ProbeConfig, ReadyError> {
        let non_empty = |key: &str| env(key).filter(|value| !value.is_empty());

        let user = self
            .username
            .filter(|u| !u.is_empty())
            .or_else(|| non_empty("USER"))
            .or_else(|| non_empty("USERNAME"))
            .unwrap_or_else(|| FALLBACK_USER.to_string());
        let database = self.dbname.filter(|d| !d.is_empty()).unwrap_or_else(|| user.clone());

        let mut target = ConnectionTarget::new(self.host, user, database).with_port(self.port);
        if let Some(password) = env("PGPASSWORD") {
            target = target.with_password(password);
        }

        let policy =
            if self.classify_timeout { TimeoutPolicy::Classify } else { TimeoutPolicy::Generic };
        let settings = ProbeSettings::default()
            .overall_timeout(self.timeout)
            .attempt_timeout(self.conn_timeout)
            .retry_interval(self.interval)
            .timeout_policy(policy);

        let config = ProbeConfig {
            target,
            tables: parse_table_list(&self.tables)?,
            settings,
            quiet: self.quiet,
            output: self.output,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Parse a duration such as `500ms`, `5s`, `2m`, `1h` or `1m30s`.
///
/// A bare number is taken as seconds.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration".to_string());
    }
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let mut total = Duration::ZERO;
    let mut rest = s;
    while !rest.is_empty() {
        let number_len = rest.find(|c: char| !(c.is_ascii_digit() || c == '.')).unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_len);
        let unit_len = tail.find(|c: char| c.is_ascii_digit() || c == '.').unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);

        let value: f64 = number.parse().map_err(|_| format!("invalid duration '{s}'"))?;
        let secs = match unit {
            "ms" => value / 1000.0,
            "s" => value,
            "m" => value * 60.0,
            "h" => value * 3600.0,
            "" => return Err(format!("missing unit in duration '{s}'")),
            other => return Err(format!("unknown unit '{other}' in duration '{s}'")),
        };
        let part = Duration::try_from_secs_f64(secs)
            .map_err(|_| format!("duration '{s}' is out of range"))?;
        total = total.checked_add(part).ok_or_else(|| format!("duration '{s}' is out of range"))?;
        rest = tail;
    }
    Ok(total)
}
