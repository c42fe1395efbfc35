//! incident-autofill - replays incident spreadsheets into a web portal

#![allow(missing_docs)]

use anyhow::Context;
use clap::Parser;
use incident_autofill::server;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "incident-autofill", version, about)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(
        short,
        long,
        env = "AUTOFILL_CONFIG",
        default_value = "config/autofill.yaml"
    )]
    config: PathBuf,

    /// Override the listen address
    #[arg(long, env = "AUTOFILL_HOST")]
    host: Option<String>,

    /// Override the listen port
    #[arg(short, long, env = "AUTOFILL_PORT")]
    port: Option<u16>,

    /// Emit logs as JSON lines
    #[arg(long, env = "AUTOFILL_LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_tracing(cli.log_json);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Alternate formatting prints the whole context chain
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    server::builder::run_server(&cli.config, cli.host, cli.port)
        .await
        .with_context(|| format!("service failed (config: {})", cli.config.display()))
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
