// spider - smoke-test a Google Cloud Storage bucket

mod cli;
mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use commands::execute_run;
use spider::auth::{ApplicationDefaultCredentials, CredentialError};
use spider::cfg::{ConfigError, SpiderConfig, DEFAULT_CONFIG_FILE};
use spider::oss::{GcpGcsObjectStore, ObjectStoreError};

/// Resolve the config path, expanding `~`
fn config_path(cli: &Cli) -> PathBuf {
    let path = cli.config.as_deref().unwrap_or(DEFAULT_CONFIG_FILE);
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

/// Install the stderr log subscriber. `RUST_LOG` overrides `-v`
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,spider={}", level)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

/// Map the root cause of a failure to the process exit code
fn exit_code(err: &anyhow::Error) -> u8 {
    for cause in err.chain() {
        if cause.is::<ConfigError>() {
            return 2;
        }
        if cause.is::<CredentialError>() {
            return 3;
        }
        if let Some(err) = cause.downcast_ref::<ObjectStoreError>() {
            return match err {
                ObjectStoreError::Credential(_) => 3,
                ObjectStoreError::Configuration(_) => 2,
                e if e.is_not_found() => 5,
                _ => 4,
            };
        }
    }
    1
}

fn dispatch(cli: &Cli) -> Result<()> {
    let path = config_path(cli);
    let config = SpiderConfig::load(&path)?;
    tracing::info!(config = %path.display(), bucket = %config.storage_bucket, "Config loaded");

    let credentials = ApplicationDefaultCredentials::resolve(&config.credentials)
        .context("Failed to resolve application default credentials")?;
    let store = GcpGcsObjectStore::new(config.store_config(), credentials.as_ref())
        .with_context(|| format!("Failed to create client for bucket: {}", config.storage_bucket))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match &cli.command {
        Commands::Run(args) => execute_run(
            args,
            &store,
            config.test_upload_path().as_deref(),
            &mut out,
        )?,
    }

    Ok(())
}

/// Exit code for invalid command-line usage
const USAGE_ERROR: u8 = 1;

/// `--help`/`--version` exit 0, usage errors exit 1
fn parse_error_code(err: &clap::Error) -> u8 {
    if err.use_stderr() {
        USAGE_ERROR
    } else {
        0
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return ExitCode::from(parse_error_code(&err));
        }
    };
    init_logging(cli.verbose);

    match dispatch(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = exit_code(&err);
            tracing::debug!(exit_code = code, error = ?err, "run failed");
            eprintln!("Error: {:#}", err);
            ExitCode::from(code)
        }
    }
}
