//! cadletd: the command server over an in-memory host document.
//!
//! Stands in for the in-process plugin deployment: the host executor owns the
//! document, the TCP transport takes JSON commands from automation clients.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use cadlet::host::HostSession;
use cadlet::host::document::Document;
use cadlet::transport::{ServerConfig, serve};
use cadlet::{CADLET_VERSION, HostExecutor, Router, SerialExecutor, standard_registry};

#[derive(Debug, Parser)]
#[command(
    name = "cadletd",
    version,
    about = "JSON command server bridging a single-threaded CAD host document"
)]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 7575)]
    port: u16,

    /// Host model to load (JSON). Defaults to the built-in sample model.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Emit logs as JSON.
    #[arg(long)]
    json_logs: bool,
}

/// Initialize tracing with RUST_LOG and CADLET_LOG support.
fn init_tracing(json_logs: bool) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match std::env::var("CADLET_LOG").as_deref() {
            Ok("trace") => "trace",
            Ok("debug") => "debug",
            Ok("warn") | Ok("warning") => "warn",
            Ok("error") => "error",
            _ => "info",
        };
        EnvFilter::new(format!("cadlet={level},info"))
    };

    if json_logs {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr));
        let _ = subscriber.try_init();
    } else {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr));
        let _ = subscriber.try_init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.json_logs);

    let document = match &args.model {
        Some(path) => Document::from_path(path)
            .with_context(|| format!("loading model {}", path.display()))?,
        None => Document::sample(),
    };
    tracing::info!(
        version = CADLET_VERSION,
        model = document.title(),
        "starting cadletd"
    );

    let executor = Arc::new(HostExecutor::spawn(HostSession::new(document))?);
    let registry = standard_registry(executor.clone() as Arc<dyn SerialExecutor>)?;
    let router = Arc::new(Router::new(registry));

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown requested");
            signal_token.cancel();
        }
    });

    let config = ServerConfig {
        host: args.host,
        port: args.port,
    };
    serve(&config, router, shutdown).await?;

    executor.shutdown();
    Ok(())
}
