use anyhow::Result;
use meter_ingestion::{
    catalog::{DatasetCatalog, LoadOutcome},
    config::AppConfig,
    metrics_server, observability,
    sinks::SnapshotStore,
};
use std::{sync::Arc, time::Duration};

fn log_outcomes(outcomes: &[(meter_client::DatasetKey, LoadOutcome)]) {
    for (key, outcome) in outcomes {
        match outcome {
            LoadOutcome::Snapshot => tracing::info!(dataset = %key, "dataset unchanged since last snapshot"),
            LoadOutcome::Ingested(report) => tracing::info!(
                dataset = %key,
                files_read = report.files_read,
                files_skipped = report.skipped.len(),
                rows_rejected = report.rows_rejected(),
                "dataset rebuilt"
            ),
            LoadOutcome::Unavailable(e) => tracing::warn!(dataset = %key, error = %e, "dataset unavailable"),
        }
    }
}

async fn refresh(catalog: &Arc<DatasetCatalog>, cfg: &Arc<AppConfig>, snapshots: Option<&SnapshotStore>) -> Result<()> {
    let (catalog, cfg, snapshots) = (catalog.clone(), cfg.clone(), snapshots.cloned());
    let outcomes = tokio::task::spawn_blocking(move || catalog.refresh(&cfg, snapshots.as_ref())).await?;
    log_outcomes(&outcomes);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    // Load configuration
    let cfg = Arc::new(AppConfig::load()?);

    // Start metrics server if configured
    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    let catalog = Arc::new(DatasetCatalog::from_config(&cfg));
    let snapshots = cfg.snapshot.as_ref().map(|s| SnapshotStore::new(&s.dir));

    let datasets: Vec<String> = catalog.keys().iter().map(ToString::to_string).collect();
    tracing::info!(datasets = %datasets.join(","), "loading datasets");
    refresh(&catalog, &cfg, snapshots.as_ref()).await?;

    let Some(refresh_cfg) = &cfg.refresh else {
        return Ok(());
    };

    let mut ticker = tokio::time::interval(Duration::from_secs(refresh_cfg.interval_secs));
    // The first tick completes immediately; the initial load already ran.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = refresh(&catalog, &cfg, snapshots.as_ref()).await {
                    tracing::error!(error = %e, "refresh task failed");
                }
            }
            res = tokio::signal::ctrl_c() => {
                res?;
                tracing::info!("shutting down");
                break;
            }
        }
    }

    Ok(())
}
