use anyhow::Context;
use clap::Parser;
use filedrop::client::{UploadClient, UploadSession};
use filedrop::config::{Args, Command};
use filedrop::{Application, Config, telemetry};
use std::path::PathBuf;
use url::Url;

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c().await.expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}

async fn upload(server: Url, files: Vec<PathBuf>) -> anyhow::Result<()> {
    let mut session = UploadSession::new(UploadClient::new(server)?);

    for warning in session.select(&files).await? {
        eprintln!("warning: {warning}");
    }
    if session.selected().is_empty() {
        anyhow::bail!("Nothing to upload");
    }

    let manifest = session.upload().await?.to_vec();
    for entry in &manifest {
        let url = session.client().download_url(entry)?;
        println!("{}\t{} bytes\t{}", entry.filename, entry.size, url);
    }
    Ok(())
}

async fn list(server: Url) -> anyhow::Result<()> {
    let client = UploadClient::new(server)?;
    for name in client.list().await? {
        println!("{name}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before anything else that might build a TLS client
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Parse CLI args
    let args = Args::parse();

    // Load configuration; the client subcommands run without it
    let config = if args.needs_config() { Some(Config::load(&args)?) } else { None };

    // If --validate flag is set, exit successfully after config validation
    if args.validate {
        println!("Configuration is valid.");
        return Ok(());
    }

    telemetry::init_telemetry(config.as_ref().is_some_and(|c| c.enable_otel_export))?;

    tracing::debug!("{:?}", args);

    let result = match args.command.clone().unwrap_or(Command::Serve) {
        Command::Serve => {
            let config = config.context("server configuration was not loaded")?;
            let shutdown = shutdown_signal();
            Application::new(config).await?.serve(shutdown).await
        }
        Command::Upload { server, files } => upload(server, files).await,
        Command::List { server } => list(server).await,
    };

    telemetry::shutdown_telemetry();
    result
}
