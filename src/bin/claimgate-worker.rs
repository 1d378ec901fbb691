use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::broadcast;
use tracing::info;

use claimgate::records::MemoryRecordStore;
use claimgate::service::ClaimService;
use claimgate::settings::AppConfig;
use claimgate::{metrics, trace};

#[derive(Parser, Debug)]
#[clap(version, about = "claimgate background job worker")]
struct Args {
    /// path to a TOML config file
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// whether to be verbose
    #[arg(short = 'v')]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let cfg = AppConfig::load(args.config.as_deref())?;
    trace::init(cfg.log_format)?;
    if args.verbose {
        info!(?cfg, "loaded configuration");
    }

    // Standalone mode runs against the in-process record store; deployments
    // with a real System of Record embed Worker through the library and
    // inject their own RecordStore.
    let records = Arc::new(MemoryRecordStore::new());
    let service = ClaimService::connect(&cfg, records).await?;
    let (shutdown_tx, _) = broadcast::channel(1);

    if let Some(addr) = cfg.metrics_addr.as_deref() {
        let addr = addr.parse()?;
        let handle = service.metrics.clone();
        let rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            if let Err(e) = metrics::run_metrics_server(addr, handle, rx).await {
                tracing::error!(error = %e, "metrics server exited");
            }
        });
    }

    let worker = service.worker();
    let worker_rx = shutdown_tx.subscribe();
    let worker_task = tokio::spawn(async move { worker.run(worker_rx).await });

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(());
    worker_task.await?;
    Ok(())
}
