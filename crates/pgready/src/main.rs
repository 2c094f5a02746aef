//! pgready - block until a PostgreSQL server is ready for work.

mod cli;
mod config;

use std::process::ExitCode;
use std::sync::Arc;

use clap::error::ErrorKind;
use clap::Parser;
use pgready_core::logging::{init_logging, LogConfig};
use pgready_core::{ExitStatus, PgConnector, Prober, ProbeResult, ReadyError};

use cli::{Cli, OutputFormat};
use config::ProbeConfig;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // Usage errors go to stderr, help and version to stdout.
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitStatus::Ready.into(),
                _ => ExitStatus::BadArgs.into(),
            };
        }
    };

    if let Err(e) = init_logging(LogConfig::new(cli.quiet())) {
        eprintln!("{e}");
        return ExitStatus::InternalError.into();
    }

    let config = match cli.resolve(|key| std::env::var(key).ok()) {
        Ok(config) => config,
        Err(e) => return fail(&e),
    };

    match run(&config) {
        Ok(status) => status.into(),
        Err(e) => fail(&e),
    }
}

/// Run the probe on a single-threaded runtime and report the result.
fn run(config: &ProbeConfig) -> Result<ExitStatus, ReadyError> {
    config.log_banner();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| ReadyError::internal(format!("Failed to start runtime: {e}")))?;

    let prober = Prober::new(Arc::new(PgConnector::new()), config.settings);
    let result = runtime.block_on(prober.run(&config.target, &config.tables));

    report(config, &result)?;
    Ok(result.exit_status())
}

fn report(config: &ProbeConfig, result: &ProbeResult) -> Result<(), ReadyError> {
    if config.output == OutputFormat::Json {
        let json = serde_json::to_string(&result.summary())
            .map_err(|e| ReadyError::internal(format!("Failed to encode summary: {e}")))?;
        println!("{json}");
    }
    Ok(())
}

fn fail(err: &ReadyError) -> ExitCode {
    let info = err.to_error_info();
    tracing::error!(error_type = %info.error_type, hint = ?info.hint, "{}", info.message);
    ExitStatus::from_error(err).into()
}
