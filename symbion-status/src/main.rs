//! symbion-status - terminal front end of the device status dashboard
//!
//! `show` renders the dashboard once, `test` re-checks a single device,
//! `interactive` keeps the dashboard open with refresh and per-device test
//! triggers read from stdin.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use symbion_status::config::{encode_credential, load_config, load_config_from};
use symbion_status::{Dashboard, DashboardView};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "symbion-status", version, about = "Online/offline status of Symbion devices")]
struct Cli {
    /// Config file (default: $SYMBION_STATUS_CONFIG or ./status.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Refresh once and print the dashboard
    Show {
        /// Print the view state as JSON
        #[arg(long)]
        json: bool,
    },
    /// Re-check one device
    Test { device_id: String },
    /// Keep the dashboard open: r = refresh, t <id> = test, q = quit
    Interactive,
    /// Obfuscate a credential for the `registry_token` config field
    EncodeToken { credential: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("symbion_status=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Show { json: false }) {
        Command::EncodeToken { credential } => {
            println!("{}", encode_credential(&credential));
            Ok(())
        }
        Command::Show { json } => show(&open_dashboard(cli.config).await?, json).await,
        Command::Test { device_id } => test(&open_dashboard(cli.config).await?, &device_id).await,
        Command::Interactive => interactive(Arc::new(open_dashboard(cli.config).await?)).await,
    }
}

async fn open_dashboard(config_path: Option<PathBuf>) -> Result<Dashboard> {
    let cfg = match &config_path {
        Some(path) => load_config_from(path).await,
        None => load_config().await,
    };
    if cfg.registry_url.trim().is_empty() {
        anyhow::bail!("registry_url is not configured (config file or SYMBION_REGISTRY_URL)");
    }
    info!(
        registry = %cfg.registry_url,
        threshold_secs = cfg.threshold_secs,
        network_clock = cfg.time_probe_url.is_some(),
        "🛰️ Symbion status starting"
    );
    Dashboard::from_config(&cfg).context("Failed to build dashboard")
}

async fn show(dashboard: &Dashboard, json: bool) -> Result<()> {
    let view = dashboard.refresh().await;
    if json {
        println!("{}", serde_json::to_string_pretty(&view).context("Failed to serialize view")?);
    } else {
        println!("{view}");
    }
    ensure_ready(&view)
}

/// The banner is already printed; the exit error only flags the failure.
fn ensure_ready(view: &DashboardView) -> Result<()> {
    if matches!(view, DashboardView::Failed { .. }) {
        anyhow::bail!("dashboard refresh failed");
    }
    Ok(())
}

async fn test(dashboard: &Dashboard, device_id: &str) -> Result<()> {
    dashboard.refresh().await;
    let report = dashboard.test_device(device_id).await;
    println!("{}", report.message);
    if let Some(card) = dashboard.view().card(device_id) {
        println!("{card}");
    }
    Ok(())
}

async fn interactive(dashboard: Arc<Dashboard>) -> Result<()> {
    println!("{}", dashboard.refresh().await);
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let mut words = line.split_whitespace();
        match (words.next(), words.next()) {
            (Some("r" | "refresh"), _) => println!("{}", dashboard.refresh().await),
            (Some("t" | "test"), Some(device_id)) => {
                // tests run in the background; a second one for the same device reports busy
                let dashboard = dashboard.clone();
                let device_id = device_id.to_string();
                tokio::spawn(async move {
                    let report = dashboard.test_device(&device_id).await;
                    println!("🔔 {}", report.message);
                    if let Some(card) = dashboard.view().card(&device_id) {
                        println!("{card}");
                    }
                });
            }
            (Some("v" | "view"), _) => println!("{}", dashboard.view()),
            (Some("q" | "quit"), _) => break,
            (None, _) => {}
            (Some(other), _) => {
                debug!(command = other, "unknown command");
                print_help();
            }
        }
    }
    Ok(())
}

fn print_help() {
    println!("commands: r = refresh, t <device-id> = test connection, v = view, q = quit");
}
