use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use tokio::{net::TcpListener, signal, sync::watch};
use tracing::{error, info};

use warehouse_bridge as bridge;

use bridge::events::PrintHandoff;
use bridge::printing::{LabelRenderer, LprPrinter, Printer, TextLabelRenderer};
use bridge::repositories::PrintedLabelRepository;
use bridge::services::label_printing::PreparationLabelWorker;
use bridge::services::shipment_updates::ShipmentUpdatePoller;
use bridge::services::tracking::{CourierTracking, KdniaoClient};
use bridge::store::{FileMakerStore, RecordStore};

#[derive(Parser)]
#[command(
    name = "warehouse-bridge",
    about = "HTTP bridge between warehouse clients and the backend record store",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API and run the shipment update poller
    Run(RunArgs),
    /// Print the version
    Version,
}

#[derive(Args)]
struct RunArgs {
    /// Directory holding default.toml and the per-environment files
    #[arg(long, default_value = bridge::config::CONFIG_DIR)]
    config: String,
    /// Log at debug level regardless of the configured level
    #[arg(long, short, action = ArgAction::SetTrue)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run(args).await,
        Commands::Version => {
            println!("warehouse-bridge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn run(args: RunArgs) -> Result<()> {
    let cfg = bridge::config::load_config_from(&args.config)
        .context("failed to load configuration")?;
    let level = if args.verbose { "debug" } else { cfg.log_level.as_str() };
    bridge::config::init_tracing(level, cfg.log_json);

    // Backend record store
    let store: Arc<dyn RecordStore> = Arc::new(
        FileMakerStore::new(&cfg.backend).context("failed to create backend client")?,
    );

    // Printed-label ledger
    let db = Arc::new(
        bridge::db::establish_connection(&cfg.ledger_url)
            .await
            .context("failed to open printed-label ledger")?,
    );
    bridge::migrator::run_migrations(&db).await.map_err(|e| {
        error!("Failed running migrations: {}", e);
        e
    })?;

    let renderer: Arc<dyn LabelRenderer> = Arc::new(TextLabelRenderer::new(&cfg.label_dir));
    let printer: Arc<dyn Printer> = Arc::new(LprPrinter::new(&cfg.printer_name));
    let tracking: Arc<dyn CourierTracking> = Arc::new(
        KdniaoClient::new(&cfg.tracking).context("failed to create courier tracking client")?,
    );

    let state = bridge::AppState::new(
        cfg.clone(),
        store,
        db.clone(),
        renderer.clone(),
        printer.clone(),
        tracking,
    );

    // Background work stops at the next tick boundary once this flips to true
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut tasks = Vec::new();

    let mut poller = ShipmentUpdatePoller::new(
        state.shipments.clone(),
        state.broadcaster.clone(),
        cfg.poll_interval(),
    );
    if cfg.auto_print_preparation {
        let (handoff, batches) = PrintHandoff::channel();
        poller = poller.with_print_handoff(handoff);
        let worker = PreparationLabelWorker::new(
            state.shipments.clone(),
            PrintedLabelRepository::new(db.clone()),
            renderer,
            printer,
        );
        tasks.push(tokio::spawn(worker.run(batches, shutdown_rx.clone())));
        info!("Automatic preparation label printing enabled");
    } else {
        info!("Automatic preparation label printing disabled");
    }
    tasks.push(tokio::spawn(poller.run(shutdown_rx)));

    let app = bridge::app_router(state);

    let listener = TcpListener::bind((cfg.host.as_str(), cfg.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", cfg.host, cfg.port))?;
    info!(
        "warehouse-bridge listening on http://{}",
        listener.local_addr()?
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped, waiting for background tasks");
    // Receivers may already be gone when both tasks ended on their own
    let _ = shutdown_tx.send(true);
    for task in tasks {
        if let Err(err) = task.await {
            error!("background task failed: {}", err);
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!("failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
