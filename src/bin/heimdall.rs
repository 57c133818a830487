//! heimdall - backend health CLI
//!
//! Probes a backend's health endpoint the same way the library does and
//! prints the result as JSON. Exits non-zero when the backend is unhealthy.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use heimdall::{Config, HealthCheckResult, HealthCheckService};
use tracing::info;

/// Heimdall backend health CLI
#[derive(Parser)]
#[command(name = "heimdall")]
#[command(version = heimdall::PKG_VERSION)]
#[command(about = "Check and wait for backend health")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Backend base URL (overrides the config file).
    #[arg(short, long, env = "HEIMDALL_BACKEND_URL")]
    url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Probe the health endpoint with retries
    Check,

    /// Single probe with a short timeout
    Quick,

    /// Poll until the backend is healthy or the timeout expires
    Wait {
        /// Maximum time to wait, in seconds
        #[arg(short, long, default_value_t = 60)]
        timeout: u64,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn for CLI; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = Config::load(args.config.as_deref())?;
    let mut health_config = config.health_check();
    if let Some(url) = args.url {
        health_config = health_config.backend_url(url);
    }
    info!(
        version = heimdall::version_string(),
        url = %health_config.health_url(),
        "heimdall starting"
    );
    let service = HealthCheckService::new(health_config)?;

    let progress = |attempt: u32, max: u32| info!(attempt, max, "probing backend");

    let healthy = match args.command {
        Command::Check => print_result(&service.check_health(Some(&progress)).await)?,
        Command::Quick => {
            let healthy = service.quick_check().await;
            println!("{}", serde_json::json!({ "is_healthy": healthy }));
            healthy
        }
        Command::Wait { timeout } => print_result(
            &service
                .wait_for_backend(Duration::from_secs(timeout), Some(&progress))
                .await,
        )?,
    };

    Ok(if healthy {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_result(result: &HealthCheckResult) -> Result<bool, serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(result.is_healthy)
}
