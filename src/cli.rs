use crate::check::{check_chassis, check_mxl_chassis, CheckError};
use crate::config::{Config, ConfigError};
use crate::report::{self, PluginOutput, UNKNOWN_EXIT_CODE};
use crate::snmp::NetSnmpSession;
use crate::status::AggregateResult;
use clap::Parser;
use std::process::ExitCode;
use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Check FTOS environmental status")]
pub struct Cli {
    /// SNMP community
    #[arg(short = 'C', value_name = "community")]
    pub community: String,
    /// Host to check
    #[arg(short = 'H', value_name = "host")]
    pub host: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckKind {
    Chassis,
    MxlChassis,
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Check(#[from] CheckError),
}

pub async fn run(kind: CheckKind) -> ExitCode {
    init_tracing();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            // Usage errors must not look like CRITICAL to the monitoring system.
            return if err.use_stderr() {
                ExitCode::from(UNKNOWN_EXIT_CODE)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let output = match execute(kind, &cli).await {
        Ok(result) => report::render(&result),
        Err(err) => {
            error!(error = %err, host = %cli.host, "check aborted");
            report::render_fatal(&err)
        }
    };

    emit(&output)
}

async fn execute(kind: CheckKind, cli: &Cli) -> Result<AggregateResult, RunError> {
    let cfg = Config::load_from_env()?;
    let session = NetSnmpSession::new(&cli.host, &cli.community, cfg.snmp.clone());

    info!(host = %cli.host, ?kind, "checking chassis");
    let result = match kind {
        CheckKind::Chassis => check_chassis(&session, &cfg.thresholds).await?,
        CheckKind::MxlChassis => check_mxl_chassis(&session, &cfg.thresholds).await?,
    };
    info!(severity = %result.severity, problems = result.messages.len(), "check finished");
    Ok(result)
}

fn emit(output: &PluginOutput) -> ExitCode {
    println!("{}", output.line);
    ExitCode::from(output.exit_code)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
