//! # Butterfly-retime CLI
//!
//! Command-line interface for the butterfly-retime library.
//! Runs the re-timing gateway, or re-times a single planner response offline.

use anyhow::Context;
use butterfly_retime::{OracleConfig, ServiceConfig, DEFAULT_LOG_DIR};
use clap::{Parser, Subcommand};
use log::error;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncReadExt;

/// Command-line interface for butterfly-retime
#[derive(Parser)]
#[command(name = "butterfly-retime")]
#[command(about = "Time-dependent re-timing of route planner responses")]
#[command(long_about = "Re-times route planner responses with durations from a Valhalla instance:
  butterfly-retime serve                           # Gateway on 0.0.0.0:3334
  butterfly-retime serve --enable-logging          # Also record every oracle call
  butterfly-retime retime response.json            # Re-time a saved planner response
  butterfly-retime retime - --base-time 2024-03-14T08:00 < response.json

Each hop departs when the previous hop is reached, so durations reflect the
actual time of travel. The gateway forwards POST / to the planner and accepts
an optional ?base_time=<ISO-8601> anchor.")]
#[command(version = env!("BUTTERFLY_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Options shared by every command that talks to the oracle
#[derive(clap::Args, Debug)]
struct OracleArgs {
    /// Valhalla base URL
    #[arg(long, default_value = "http://localhost:8002")]
    oracle_url: String,

    /// Per-call oracle timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Directory for oracle call records
    #[arg(long, default_value = DEFAULT_LOG_DIR)]
    log_dir: PathBuf,

    /// Record every oracle call as a JSON file
    #[arg(long)]
    enable_logging: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP gateway in front of the route planner
    Serve {
        /// Address to bind
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Port to listen on
        #[arg(short, long, default_value_t = 3334)]
        port: u16,

        /// Upstream route planner URL
        #[arg(long, default_value = "http://localhost:3333")]
        planner_url: String,

        #[command(flatten)]
        oracle: OracleArgs,
    },
    /// Re-time one planner response and print it to stdout
    Retime {
        /// Planner response JSON file, or "-" for stdin
        #[arg(default_value = "-")]
        input: String,

        /// Anchor departure time (ISO-8601), defaults to now
        #[arg(long)]
        base_time: Option<String>,

        #[command(flatten)]
        oracle: OracleArgs,
    },
}

/// Input source types
#[derive(Debug, PartialEq)]
enum InputSource {
    File(PathBuf),
    Stdin,
}

/// Resolve input source from CLI arguments
fn resolve_input(input: &str) -> InputSource {
    if input == "-" || input.is_empty() {
        InputSource::Stdin
    } else {
        InputSource::File(PathBuf::from(input))
    }
}

/// Map CLI flags onto the service configuration
fn build_config(oracle: OracleArgs, planner_url: Option<String>, bind_addr: Option<String>) -> ServiceConfig {
    let defaults = ServiceConfig::default();
    ServiceConfig {
        planner_url: planner_url.unwrap_or(defaults.planner_url),
        bind_addr: bind_addr.unwrap_or(defaults.bind_addr),
        log_dir: oracle.log_dir,
        enable_logging: oracle.enable_logging,
        oracle: OracleConfig {
            base_url: oracle.oracle_url,
            timeout: Duration::from_secs(oracle.timeout_secs),
            ..Default::default()
        },
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("❌ Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging to stderr
    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .target(env_logger::Target::Stderr)
        .init();

    match cli.command {
        Commands::Serve {
            host,
            port,
            planner_url,
            oracle,
        } => {
            let config = build_config(oracle, Some(planner_url), Some(format!("{host}:{port}")));
            butterfly_retime::server::run_server(config).await
        }
        Commands::Retime {
            input,
            base_time,
            oracle,
        } => {
            let config = build_config(oracle, None, None);
            retime_once(resolve_input(&input), base_time.as_deref(), &config).await
        }
    }
}

/// Re-time a single planner response and write it to stdout
async fn retime_once(input: InputSource, base_time: Option<&str>, config: &ServiceConfig) -> anyhow::Result<()> {
    let raw = match &input {
        InputSource::File(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?,
        InputSource::Stdin => {
            let mut buffer = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buffer)
                .await
                .context("reading stdin")?;
            buffer
        }
    };
    let body: serde_json::Value = serde_json::from_str(&raw).context("parsing planner response")?;

    let (logger, aggregator) = config.build_pipeline()?;
    let outcome = aggregator.process_json(body, base_time).await;
    // Failed calls are recorded too, so flush before looking at the outcome
    logger.flush().await;
    let retimed = outcome?;

    println!("{}", serde_json::to_string_pretty(&retimed)?);
    Ok(())
}
