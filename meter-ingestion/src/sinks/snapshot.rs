use std::{
    fs, io,
    path::{Path, PathBuf},
};

use meter_client::{Building, Dataset, DatasetKey, Metric, NormalizedRecord};
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum SnapshotError {
    #[error("snapshot io error at {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("snapshot encoding error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("corrupt snapshot {}: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },
}

/// Columnar on-disk form of a dataset. Calendar fields are re-derived from
/// `epoch_ms` on load.
#[derive(Debug, Serialize, Deserialize)]
struct DatasetSnapshot {
    building: Building,
    metric: Metric,
    source_fingerprint: String,
    epoch_ms: Vec<i64>,
    total: Vec<f64>,
}

#[derive(Debug)]
pub struct LoadedSnapshot {
    pub dataset: Dataset,
    pub source_fingerprint: String,
}

/// Directory of per-dataset snapshots named `{dataset_name}_data.json`.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: DatasetKey) -> PathBuf {
        self.dir.join(format!("{}_data.json", key.dataset_name()))
    }

    /// Write the snapshot next to its final path and rename it into place, so
    /// readers see either the old file or the complete new one.
    pub fn save(&self, dataset: &Dataset, source_fingerprint: &str) -> Result<PathBuf, SnapshotError> {
        let key = dataset.key();
        let path = self.path_for(key);
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source: io::Error| SnapshotError::Io { path, source }
        };

        fs::create_dir_all(&self.dir).map_err(io_err(&self.dir))?;

        let snapshot = DatasetSnapshot {
            building: key.building,
            metric: key.metric,
            source_fingerprint: source_fingerprint.to_string(),
            epoch_ms: dataset.iter().map(|r| r.epoch_ms).collect(),
            total: dataset.iter().map(|r| r.total).collect(),
        };
        let bytes = serde_json::to_vec(&snapshot)?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes).map_err(io_err(&tmp))?;
        fs::rename(&tmp, &path).map_err(io_err(&path))?;

        metrics::counter!("meter_snapshot_writes_total").increment(1);
        tracing::debug!(dataset = %key, path = %path.display(), records = dataset.len(), "snapshot written");
        Ok(path)
    }

    /// `Ok(None)` when no snapshot exists for `key`.
    pub fn load(&self, key: DatasetKey) -> Result<Option<LoadedSnapshot>, SnapshotError> {
        let path = self.path_for(key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(SnapshotError::Io { path, source }),
        };

        let snapshot: DatasetSnapshot = serde_json::from_slice(&bytes)?;
        let corrupt = |reason: String| SnapshotError::Corrupt {
            path: path.clone(),
            reason,
        };

        let stored_key = DatasetKey::new(snapshot.building, snapshot.metric);
        if stored_key != key {
            return Err(corrupt(format!("holds {stored_key}, expected {key}")));
        }
        if snapshot.epoch_ms.len() != snapshot.total.len() {
            return Err(corrupt(format!(
                "column lengths differ ({} timestamps, {} totals)",
                snapshot.epoch_ms.len(),
                snapshot.total.len()
            )));
        }

        let records = snapshot
            .epoch_ms
            .iter()
            .zip(&snapshot.total)
            .map(|(&ms, &total)| NormalizedRecord::from_epoch_millis(ms, total))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| corrupt(e.to_string()))?;

        Ok(Some(LoadedSnapshot {
            dataset: Dataset::new(key, records),
            source_fingerprint: snapshot.source_fingerprint,
        }))
    }

    /// The stored dataset, if one exists and was built from the same file set.
    pub fn load_if_fresh(&self, key: DatasetKey, source_fingerprint: &str) -> Result<Option<Dataset>, SnapshotError> {
        Ok(self
            .load(key)?
            .filter(|s| s.source_fingerprint == source_fingerprint)
            .map(|s| s.dataset))
    }
}
