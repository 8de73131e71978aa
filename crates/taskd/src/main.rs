//! Taskd - Entry point

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use tracing::{error, info};

use taskd::bootstrap;

/// Command-line arguments.
struct Args {
    /// Path to configuration file.
    config: Option<PathBuf>,
}

impl Args {
    fn parse() -> Result<Self, ExitCode> {
        let mut args = std::env::args().skip(1);
        let mut config = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => match args.next() {
                    Some(path) => config = Some(PathBuf::from(path)),
                    None => {
                        eprintln!("--config requires a path");
                        return Err(ExitCode::FAILURE);
                    }
                },
                "--help" | "-h" => {
                    print_help();
                    return Err(ExitCode::SUCCESS);
                }
                "--version" | "-v" => {
                    println!("taskd {}", taskd::VERSION);
                    return Err(ExitCode::SUCCESS);
                }
                other => {
                    eprintln!("Unknown argument: {other}");
                    eprintln!("Use --help for usage information");
                    return Err(ExitCode::FAILURE);
                }
            }
        }

        Ok(Self { config })
    }
}

fn print_help() {
    println!(
        r"taskd - in-memory todo service

USAGE:
    taskd [OPTIONS]

OPTIONS:
    -c, --config <PATH>    Path to configuration file (TOML or JSON)
    -h, --help             Print help information
    -v, --version          Print version information

Without --config, ./taskd.toml is read if it exists.

ENVIRONMENT VARIABLES:
    TASKD__SERVER__HTTP_ADDR               Bind address (default: 0.0.0.0:8080)
    TASKD__SERVER__SHUTDOWN_TIMEOUT_SECS   Drain timeout (default: 5)
    TASKD__SERVER__REQUEST_TIMEOUT_MS      Per-request deadline (default: 10000)
    TASKD__LOGGING__LEVEL                  Log filter (default: info)
    TASKD__LOGGING__FORMAT                 json or pretty (default: json)
    TASKD__METRICS__ENABLED                Start the Prometheus listener
    TASKD__METRICS__ADDR                   Prometheus address (default: 0.0.0.0:9090)
    PORT                                   Overrides the port of the bind address
    RUST_LOG                               Overrides the log filter
"
    );
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::parse() {
        Ok(args) => args,
        Err(code) => return code,
    };

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // logging may not be up yet, so report on stderr too
            error!(error = %format!("{e:#}"), "taskd failed");
            eprintln!("taskd: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config =
        bootstrap::load_config(args.config.as_deref()).context("failed to load configuration")?;

    taskd::telemetry::init_telemetry(&bootstrap::telemetry_config(&config))
        .context("failed to initialize telemetry")?;

    info!(version = taskd::VERSION, "starting taskd");

    let report = bootstrap::build_server(&config)
        .bind()
        .await
        .context("failed to start server")?
        .run()
        .await?;

    info!(abandoned = report.abandoned, "taskd stopped");
    Ok(())
}
