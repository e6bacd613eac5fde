use anyhow::{bail, Context, Result};
use meter_client::{
    query::{self, DateFilter},
    DatasetKey, QueryError,
};
use meter_ingestion::{
    catalog::{load_source, LoadOutcome},
    config::AppConfig,
    observability,
    sinks::SnapshotStore,
};
use serde_json::json;
use std::env;

const USAGE: &str = "usage: inspect_dataset <BUILDING> <METRIC> [year] [month] [day]";

fn main() -> Result<()> {
    observability::init_tracing();

    let mut args = env::args().skip(1);
    let (Some(building), Some(metric)) = (args.next(), args.next()) else {
        bail!("{USAGE}");
    };
    let key = DatasetKey::new(building.parse()?, metric.parse()?);

    let mut filter = DateFilter::new();
    if let Some(year) = args.next() {
        filter = filter.year(year.parse().with_context(|| format!("invalid year '{year}'"))?);
    }
    if let Some(month) = args.next() {
        filter = filter.month_name(&month)?;
    }
    if let Some(day) = args.next() {
        filter = filter.day(day.parse().with_context(|| format!("invalid day '{day}'"))?);
    }
    if args.next().is_some() {
        bail!("{USAGE}");
    }

    let cfg = AppConfig::load()?;
    let Some(source) = cfg.source(key) else {
        bail!("source {key} is not configured");
    };
    let snapshots = cfg.snapshot.as_ref().map(|s| SnapshotStore::new(&s.dir));

    let loaded = load_source(source, snapshots.as_ref());
    if let LoadOutcome::Unavailable(e) = &loaded.outcome {
        bail!("{key} unavailable: {e}");
    }

    let options = query::filter_options(&loaded.dataset);
    let selected = query::filter(&loaded.dataset, &filter);
    let heatmap = match query::heatmap_matrix(&selected) {
        Ok(matrix) => serde_json::to_value(matrix)?,
        Err(e @ QueryError::DegenerateRange { .. }) => json!({ "error": e.to_string() }),
        Err(e) => return Err(e.into()),
    };

    let report = json!({
        "dataset": key.dataset_name(),
        "labels": selected.labels(),
        "records": selected.len(),
        "total_records": loaded.dataset.len(),
        "filter_options": options,
        "daily_rollup": query::daily_rollup(&selected),
        "hourly_means": query::hourly_means(&selected).len(),
        "heatmap": heatmap,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
