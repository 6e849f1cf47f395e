//! callscore-eval - call analysis scoring service
//!
//! Subcommands:
//! - `serve`: HTTP API over the record store
//! - `evaluate`: print the evaluation report of a persona as JSON
//! - `import-ground-truth`: store a ground-truth CSV or XLSX for a persona
//! - `init-config`: write the default TOML config file

use std::fs::File;
use std::io::BufReader;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use callscore_common::config::{self, TomlConfig};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use callscore_eval::loader::FsStore;
use callscore_eval::services::{self, GroundTruthFormat};
use callscore_eval::AppState;

/// Command-line arguments for callscore-eval
#[derive(Parser, Debug)]
#[command(name = "callscore-eval")]
#[command(about = "Scores LLM call analyses against human ground truth")]
#[command(version)]
struct Args {
    /// Config file (defaults to the platform config dir)
    #[arg(short, long, global = true, env = "CALLSCORE_CONFIG")]
    config: Option<PathBuf>,

    /// Root folder holding prompts, transcriptions, analyses and ground truth
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve {
        /// Port to listen on (overrides the config file)
        #[arg(short, long, env = "CALLSCORE_PORT")]
        port: Option<u16>,
    },
    /// Evaluate a persona and print the report as JSON
    Evaluate {
        persona: String,
        /// KPI to evaluate (repeatable); defaults to the persona's KPI list
        #[arg(long = "kpi")]
        kpis: Vec<String>,
    },
    /// Import a ground-truth CSV or XLSX (`Parameters` sheet) for a persona
    ImportGroundTruth { persona: String, file: PathBuf },
    /// Write the default config file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let toml_config = config::load_or_default(args.config.as_deref());

    // RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "callscore_eval={level},callscore_common={level},tower_http={level}",
                    level = toml_config.logging.level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "callscore-eval v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root = config::resolve_root_folder(args.root.as_deref(), &toml_config);
    let store = FsStore::new(root, toml_config.storage.clone());

    match args.command {
        Command::Serve { port } => serve(store, &toml_config, port).await,
        Command::Evaluate { persona, kpis } => {
            let kpis = (!kpis.is_empty()).then_some(kpis);
            let evaluation = services::evaluate_persona(&store, &persona, kpis)
                .with_context(|| format!("Failed to evaluate persona '{}'", persona))?;
            println!("{}", serde_json::to_string_pretty(&evaluation)?);
            Ok(())
        }
        Command::ImportGroundTruth { persona, file: path } => {
            let file = File::open(&path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            let outcome = match GroundTruthFormat::from_path(&path) {
                GroundTruthFormat::Csv => services::import_ground_truth_csv(&store, &persona, file),
                GroundTruthFormat::Xlsx => {
                    services::import_ground_truth_xlsx(&store, &persona, BufReader::new(file))
                }
            }
            .with_context(|| format!("Failed to import {}", path.display()))?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(())
        }
        Command::InitConfig { force } => init_config(args.config, force),
    }
}

async fn serve(store: FsStore, toml_config: &TomlConfig, port: Option<u16>) -> Result<()> {
    store
        .ensure_folders()
        .with_context(|| format!("Failed to initialize root folder {}", store.root().display()))?;
    info!("Root folder: {}", store.root().display());

    let port = port.unwrap_or(toml_config.port);
    let app = callscore_eval::build_router(AppState::new(store));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_config(path: Option<PathBuf>, force: bool) -> Result<()> {
    let path = match path.or_else(config::default_config_path) {
        Some(path) => path,
        None => bail!("Could not determine config directory; pass --config"),
    };
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    config::write_toml_config(&TomlConfig::default(), &path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote default config to {}", path.display());
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
