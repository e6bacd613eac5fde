use std::net::SocketAddr;

use anyhow::Context;
use axum::{routing::get, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static PROM_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

fn describe() {
    metrics::describe_counter!("meter_csv_files_skipped_total", "Meter CSV files skipped as malformed or unreadable");
    metrics::describe_counter!("meter_csv_rows_rejected_total", "Rows dropped during ingestion, by reason");
    metrics::describe_counter!("meter_snapshot_hits_total", "Refreshes served from an up-to-date snapshot");
    metrics::describe_counter!("meter_snapshot_writes_total", "Dataset snapshots written");
    metrics::describe_gauge!("meter_dataset_records", "Records in the published dataset");
    metrics::describe_histogram!("meter_ingest_duration_seconds", "Wall time to ingest one dataset");
}

/// Install the Prometheus recorder and serve `/metrics` on `bind_addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init(bind_addr: &str) -> anyhow::Result<()> {
    let addr: SocketAddr = bind_addr
        .parse()
        .with_context(|| format!("invalid metrics bind address '{bind_addr}'"))?;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus metrics recorder")?;

    // Ignore error if the handle was already set; this should only be called once.
    let _ = PROM_HANDLE.set(handle);
    describe();

    tokio::spawn(async move {
        let app = Router::new().route("/metrics", get(metrics_handler));

        match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => {
                tracing::info!(%addr, "serving metrics");
                if let Err(e) = axum::serve(listener, app.into_make_service()).await {
                    tracing::error!(error = %e, "metrics server error");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to bind metrics listener");
            }
        }
    });

    Ok(())
}

async fn metrics_handler() -> String {
    PROM_HANDLE.get().map(PrometheusHandle::render).unwrap_or_default()
}
