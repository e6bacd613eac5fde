//! Published datasets, one per configured (building, metric).
//!
//! Readers clone an `Arc<Dataset>` and query it without holding any lock.
//! Re-ingestion builds a complete replacement first and swaps the `Arc` in
//! one step, so a reader never sees a half-built dataset.

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use meter_client::{
    domain::{DailyRollup, DatasetTable, FilterOptions, HeatmapMatrix, HourlyMean},
    query::{self, DateFilter},
    Dataset, DatasetKey, QueryError,
};

use crate::{
    config::{AppConfig, SourceConfig},
    pipeline::{IngestReport, IngestionError, Pipeline},
    sinks::SnapshotStore,
    sources,
};

#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error("unknown source {0}: not configured")]
    UnknownSource(DatasetKey),
    #[error(transparent)]
    Query(#[from] QueryError),
}

/// How a dataset was obtained during a refresh.
#[derive(Debug)]
pub enum LoadOutcome {
    /// Source files unchanged; reused the stored snapshot.
    Snapshot,
    Ingested(IngestReport),
    /// Nothing could be read; an empty dataset stands in.
    Unavailable(IngestionError),
}

#[derive(Debug)]
pub struct LoadedSource {
    pub dataset: Dataset,
    pub outcome: LoadOutcome,
}

/// Build one source's dataset, preferring a fresh snapshot when available.
///
/// Never fails: every error degrades to an empty dataset plus a diagnostic.
pub fn load_source(source: &SourceConfig, snapshots: Option<&SnapshotStore>) -> LoadedSource {
    let key = source.key();
    let unavailable = |err: IngestionError| {
        tracing::warn!(dataset = %key, error = %err, "source unavailable, publishing empty dataset");
        LoadedSource {
            dataset: Dataset::empty(key),
            outcome: LoadOutcome::Unavailable(err),
        }
    };

    let files = match sources::discover_csv_files(&source.directory) {
        Ok(files) => files,
        Err(err) => return unavailable(err),
    };

    let schema = source.schema();
    let fingerprint = match sources::fingerprint(&schema, &files) {
        Ok(fp) => Some(fp),
        Err(e) => {
            tracing::warn!(dataset = %key, error = %e, "could not fingerprint source files");
            None
        }
    };

    if let (Some(store), Some(fp)) = (snapshots, fingerprint.as_deref()) {
        match store.load_if_fresh(key, fp) {
            Ok(Some(dataset)) => {
                metrics::counter!("meter_snapshot_hits_total", "dataset" => key.to_string()).increment(1);
                tracing::info!(dataset = %key, records = dataset.len(), "loaded dataset from snapshot");
                return LoadedSource {
                    dataset,
                    outcome: LoadOutcome::Snapshot,
                };
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(dataset = %key, error = %e, "ignoring unreadable snapshot"),
        }
    }

    let ingested = match Pipeline::with_schema(key, schema).run(&files) {
        Ok(ingested) => ingested,
        Err(err) => return unavailable(err),
    };

    if let (Some(store), Some(fp)) = (snapshots, fingerprint.as_deref()) {
        if let Err(e) = store.save(&ingested.dataset, fp) {
            tracing::error!(dataset = %key, error = %e, "failed to write snapshot");
        }
    }

    LoadedSource {
        dataset: ingested.dataset,
        outcome: LoadOutcome::Ingested(ingested.report),
    }
}

#[derive(Debug, Default)]
pub struct DatasetCatalog {
    datasets: RwLock<HashMap<DatasetKey, Arc<Dataset>>>,
}

impl DatasetCatalog {
    /// A catalog serving the given keys, each starting out empty.
    pub fn new(keys: impl IntoIterator<Item = DatasetKey>) -> Self {
        let datasets = keys
            .into_iter()
            .map(|k| (k, Arc::new(Dataset::empty(k))))
            .collect();
        Self {
            datasets: RwLock::new(datasets),
        }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        Self::new(cfg.sources.iter().map(SourceConfig::key))
    }

    pub fn keys(&self) -> Vec<DatasetKey> {
        let mut keys: Vec<_> = self
            .datasets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        keys.sort();
        keys
    }

    /// The current snapshot for `key`.
    pub fn get(&self, key: DatasetKey) -> Result<Arc<Dataset>, CatalogError> {
        self.datasets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
            .ok_or(CatalogError::UnknownSource(key))
    }

    /// Replace the dataset for its key. Readers holding the previous `Arc`
    /// keep a consistent view of the old data.
    pub fn publish(&self, dataset: Dataset) -> Result<(), CatalogError> {
        let key = dataset.key();
        let len = dataset.len();
        let mut guard = self.datasets.write().unwrap_or_else(PoisonError::into_inner);
        let slot = guard.get_mut(&key).ok_or(CatalogError::UnknownSource(key))?;
        *slot = Arc::new(dataset);
        drop(guard);

        metrics::gauge!("meter_dataset_records", "dataset" => key.to_string()).set(len as f64);
        Ok(())
    }

    /// Rebuild every configured source and publish each one as it completes.
    pub fn refresh(&self, cfg: &AppConfig, snapshots: Option<&SnapshotStore>) -> Vec<(DatasetKey, LoadOutcome)> {
        let mut outcomes = Vec::with_capacity(cfg.sources.len());
        for source in &cfg.sources {
            let loaded = load_source(source, snapshots);
            if let Err(e) = self.publish(loaded.dataset) {
                tracing::error!(dataset = %source.key(), error = %e, "failed to publish dataset");
            }
            outcomes.push((source.key(), loaded.outcome));
        }
        outcomes
    }

    pub fn filtered(&self, key: DatasetKey, filter: &DateFilter) -> Result<Dataset, CatalogError> {
        Ok(query::filter(&*self.get(key)?, filter))
    }

    pub fn table(&self, key: DatasetKey, filter: &DateFilter) -> Result<DatasetTable, CatalogError> {
        Ok(self.filtered(key, filter)?.to_table()?)
    }

    pub fn daily_rollup(&self, key: DatasetKey, filter: &DateFilter) -> Result<Vec<DailyRollup>, CatalogError> {
        Ok(query::daily_rollup(&self.filtered(key, filter)?))
    }

    pub fn hourly_means(&self, key: DatasetKey, filter: &DateFilter) -> Result<Vec<HourlyMean>, CatalogError> {
        Ok(query::hourly_means(&self.filtered(key, filter)?))
    }

    pub fn heatmap(&self, key: DatasetKey, filter: &DateFilter) -> Result<HeatmapMatrix, CatalogError> {
        Ok(query::heatmap_matrix(&self.filtered(key, filter)?)?)
    }

    pub fn filter_options(&self, key: DatasetKey) -> Result<FilterOptions, CatalogError> {
        Ok(query::filter_options(&*self.get(key)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meter_client::{Building, Metric, NormalizedRecord};
    use std::{fs, path::Path, thread};

    fn sm_power() -> DatasetKey {
        DatasetKey::new(Building::Sm, Metric::Power)
    }

    fn dataset(key: DatasetKey, n: usize) -> Dataset {
        let records = (0..n)
            .map(|i| NormalizedRecord::from_epoch_millis(1_700_000_000_000 + i as i64 * 3_600_000, i as f64).unwrap())
            .collect();
        Dataset::new(key, records)
    }

    fn write_export(path: &Path, rows: &[&str]) {
        let mut body = String::from("a\nb\nc\nd\ne\nf\nTIME [UTC Seconds],R[kW]   ,Y[kW]   ,B[kW]   ,\n");
        for row in rows {
            body.push_str(row);
            body.push('\n');
        }
        fs::write(path, body).unwrap();
    }

    fn config_for(dir: &Path) -> AppConfig {
        let toml = format!(
            "[[sources]]\nbuilding = \"SM\"\nmetric = \"Power\"\ndirectory = {:?}\n\n\
             [[sources]]\nbuilding = \"CSA\"\nmetric = \"Power\"\ndirectory = {:?}\n",
            dir.join("sm").to_string_lossy(),
            dir.join("csa-missing").to_string_lossy(),
        );
        AppConfig::from_toml_str(&toml).unwrap()
    }

    #[test]
    fn unknown_source_is_reported() {
        let catalog = DatasetCatalog::new([sm_power()]);
        let dese = DatasetKey::new(Building::Dese, Metric::Voltage);

        assert!(matches!(catalog.get(dese), Err(CatalogError::UnknownSource(k)) if k == dese));
        assert!(matches!(
            catalog.publish(Dataset::empty(dese)),
            Err(CatalogError::UnknownSource(_))
        ));
        assert!(catalog.get(sm_power()).unwrap().is_empty());
    }

    #[test]
    fn publish_swaps_without_disturbing_readers() {
        let catalog = DatasetCatalog::new([sm_power()]);
        catalog.publish(dataset(sm_power(), 3)).unwrap();

        let held = catalog.get(sm_power()).unwrap();
        catalog.publish(dataset(sm_power(), 5)).unwrap();

        assert_eq!(held.len(), 3);
        assert_eq!(catalog.get(sm_power()).unwrap().len(), 5);
    }

    #[test]
    fn concurrent_readers_see_whole_datasets() {
        let catalog = DatasetCatalog::new([sm_power()]);
        catalog.publish(dataset(sm_power(), 10)).unwrap();

        thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..200 {
                        let ds = catalog.get(sm_power()).unwrap();
                        assert!(ds.len() == 10 || ds.len() == 20);
                        let rollup = query::daily_rollup(&ds);
                        assert_eq!(rollup.iter().map(|r| r.samples).sum::<usize>(), ds.len());
                    }
                });
            }
            s.spawn(|| {
                for i in 0..50 {
                    let n = if i % 2 == 0 { 20 } else { 10 };
                    catalog.publish(dataset(sm_power(), n)).unwrap();
                }
            });
        });
    }

    #[test]
    fn queries_are_addressable_by_key_and_filter() {
        let catalog = DatasetCatalog::new([sm_power()]);
        catalog.publish(dataset(sm_power(), 6)).unwrap();

        // 2023-11-14 22:13 plus hourly steps; the first two fall on the 14th.
        let f = DateFilter::new().year(2023).month(11).day(14);
        assert_eq!(catalog.filtered(sm_power(), &f).unwrap().len(), 2);
        assert_eq!(catalog.table(sm_power(), &f).unwrap().data.len(), 2);
        assert_eq!(catalog.daily_rollup(sm_power(), &DateFilter::new()).unwrap().len(), 2);
        assert_eq!(catalog.hourly_means(sm_power(), &f).unwrap().len(), 2);

        let m = catalog.heatmap(sm_power(), &DateFilter::new()).unwrap();
        assert_eq!(m.dates().len(), 2);
        assert_eq!(catalog.filter_options(sm_power()).unwrap().days, vec![14, 15]);
    }

    #[test]
    fn degenerate_heatmap_surfaces_as_query_error() {
        let catalog = DatasetCatalog::new([sm_power()]);
        catalog.publish(dataset(sm_power(), 1)).unwrap();
        assert!(matches!(
            catalog.heatmap(sm_power(), &DateFilter::new()),
            Err(CatalogError::Query(QueryError::DegenerateRange { .. }))
        ));
    }

    #[test]
    fn refresh_ingests_then_reuses_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sm")).unwrap();
        write_export(&dir.path().join("sm").join("a.csv"), &["1700000000000,1.0,2.0,3.0,"]);
        fs::write(dir.path().join("sm").join("b.csv"), "garbage").unwrap();

        let cfg = config_for(dir.path());
        let store = SnapshotStore::new(dir.path().join("snapshots"));
        let catalog = DatasetCatalog::from_config(&cfg);
        assert_eq!(
            catalog.keys(),
            vec![sm_power(), DatasetKey::new(Building::Csa, Metric::Power)]
        );

        let outcomes = catalog.refresh(&cfg, Some(&store));
        assert_eq!(outcomes.len(), 2);
        match &outcomes[0].1 {
            LoadOutcome::Ingested(report) => assert_eq!(report.skipped.len(), 1),
            other => panic!("expected ingestion, got {other:?}"),
        }
        assert!(matches!(
            outcomes[1].1,
            LoadOutcome::Unavailable(IngestionError::SourceNotFound { .. })
        ));
        assert_eq!(catalog.get(sm_power()).unwrap().len(), 1);
        assert!(catalog.get(DatasetKey::new(Building::Csa, Metric::Power)).unwrap().is_empty());

        let outcomes = catalog.refresh(&cfg, Some(&store));
        assert!(matches!(outcomes[0].1, LoadOutcome::Snapshot));
        assert_eq!(catalog.get(sm_power()).unwrap().records()[0].total, 6.0);
    }

    #[test]
    fn changed_header_skip_invalidates_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sm")).unwrap();
        write_export(&dir.path().join("sm").join("a.csv"), &["1700000000000,1.0,2.0,3.0,"]);
        let store = SnapshotStore::new(dir.path().join("snapshots"));

        let mut source = config_for(dir.path()).sources.remove(0);
        let first = load_source(&source, Some(&store));
        assert!(matches!(first.outcome, LoadOutcome::Ingested(_)));
        assert_eq!(first.dataset.len(), 1);

        source.header_skip = 7;
        let second = load_source(&source, Some(&store));
        assert!(matches!(
            second.outcome,
            LoadOutcome::Unavailable(IngestionError::EmptySource { .. })
        ));
        assert!(second.dataset.is_empty());
    }

    #[test]
    fn directory_without_csvs_publishes_empty_dataset() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sm")).unwrap();
        let cfg = config_for(dir.path());
        let catalog = DatasetCatalog::from_config(&cfg);

        let outcomes = catalog.refresh(&cfg, None);
        assert!(matches!(
            outcomes[0].1,
            LoadOutcome::Unavailable(IngestionError::NoMatchingFiles { .. })
        ));
        assert!(catalog.get(sm_power()).unwrap().is_empty());
    }
}
