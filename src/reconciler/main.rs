use std::sync::Arc;

use anyhow::Context;
use time::OffsetDateTime;
use tokio::signal;
use tokio::sync::watch;

use skyport::config::Config;
use skyport::services::StaleDeploymentSweeper;
use skyport::state::connect_database;
use skyport::store::{DeploymentStore, PgDeploymentStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting Skyport reconciler...");

    let config = Config::from_env().context("Failed to load configuration")?;
    let stale_after = time::Duration::try_from(config.reconciler.stale_after)
        .context("STALE_DEPLOYMENT_AFTER_SECS is out of range")?;
    if config.reconciler.stale_after <= config.cloud.wait_timeout {
        tracing::warn!(
            stale_after_secs = config.reconciler.stale_after.as_secs(),
            wait_timeout_secs = config.cloud.wait_timeout.as_secs(),
            "Stale threshold does not exceed the instance wait ceiling; live attempts may be failed"
        );
    }

    let db = connect_database(&config)
        .await
        .context("Failed to connect to database")?;
    let store: Arc<dyn DeploymentStore> = Arc::new(PgDeploymentStore::new(db));
    let sweeper = StaleDeploymentSweeper::new(store, stale_after);

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, stopping reconciler...");
        let _ = shutdown_tx.send(true);
    });

    let mut ticker = tokio::time::interval(config.reconciler.interval);
    tracing::info!(
        interval_secs = config.reconciler.interval.as_secs(),
        stale_after_secs = config.reconciler.stale_after.as_secs(),
        "Reconciler started"
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown_rx.changed() => break,
        }

        match sweeper.sweep_once(OffsetDateTime::now_utc()).await {
            Ok(report) if report.examined > 0 => {
                tracing::info!(
                    examined = report.examined,
                    failed = report.failed,
                    "Sweep finished"
                );
            }
            Ok(_) => tracing::debug!("Sweep found no stale deployments"),
            // Transient database errors are retried on the next tick
            Err(e) => tracing::error!(error = %e, "Sweep failed"),
        }
    }

    tracing::info!("Reconciler shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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
}
