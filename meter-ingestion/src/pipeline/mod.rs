use std::{io, path::PathBuf, time::Instant};

use meter_client::{Building, Dataset, DatasetKey, Metric};

use crate::{
    schema::SourceSchema,
    sources::MeterCsvFile,
    transform,
};

/// Why a single file was left out of a dataset. Never fatal to the run.
#[derive(thiserror::Error, Debug)]
pub enum FileError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed file: {0}")]
    Malformed(String),
    #[error("missing column '{0}'")]
    MissingColumn(String),
}

#[derive(thiserror::Error, Debug)]
pub enum IngestionError {
    #[error("source path {} not found", path.display())]
    SourceNotFound { path: PathBuf },
    #[error("no CSV files under {}", path.display())]
    NoMatchingFiles { path: PathBuf },
    #[error("no file for {dataset} parsed successfully ({} skipped)", skipped.len())]
    EmptySource {
        dataset: DatasetKey,
        skipped: Vec<SkippedFile>,
    },
    #[error("failed to list {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
}

#[derive(Debug)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: FileError,
}

/// Diagnostics for one ingestion run.
#[derive(Debug)]
pub struct IngestReport {
    pub dataset: DatasetKey,
    pub files_read: usize,
    pub skipped: Vec<SkippedFile>,
    pub rejected_phase: usize,
    pub rejected_timestamp: usize,
    pub rejected_range: usize,
    /// Rows whose phase sum overflowed to a non-finite total.
    pub rejected_total: usize,
}

impl IngestReport {
    fn new(dataset: DatasetKey) -> Self {
        Self {
            dataset,
            files_read: 0,
            skipped: Vec::new(),
            rejected_phase: 0,
            rejected_timestamp: 0,
            rejected_range: 0,
            rejected_total: 0,
        }
    }

    pub fn rows_rejected(&self) -> usize {
        self.rejected_phase + self.rejected_timestamp + self.rejected_range + self.rejected_total
    }
}

#[derive(Debug)]
pub struct Ingested {
    pub dataset: Dataset,
    pub report: IngestReport,
}

/// Builds one dataset from a set of meter CSV exports.
#[derive(Debug, Clone)]
pub struct Pipeline {
    key: DatasetKey,
    schema: SourceSchema,
}

impl Pipeline {
    pub fn new(key: DatasetKey) -> Self {
        Self::with_schema(key, SourceSchema::for_key(key))
    }

    pub fn with_schema(key: DatasetKey, schema: SourceSchema) -> Self {
        Self { key, schema }
    }

    /// Parse every path, skip the ones that fail, and concatenate the rest in
    /// path order with per-file row order preserved.
    pub fn run(&self, paths: &[PathBuf]) -> Result<Ingested, IngestionError> {
        let started = Instant::now();
        let dataset_name = self.schema.dataset_name.as_str();
        let mut report = IngestReport::new(self.key);
        let mut records = Vec::new();

        for path in paths {
            let parsed = match MeterCsvFile::new(path).read(&self.schema) {
                Ok(parsed) => parsed,
                Err(reason) => {
                    tracing::warn!(
                        dataset = dataset_name,
                        path = %path.display(),
                        error = %reason,
                        "skipping meter CSV file"
                    );
                    metrics::counter!("meter_csv_files_skipped_total", "dataset" => dataset_name.to_string())
                        .increment(1);
                    report.skipped.push(SkippedFile {
                        path: path.clone(),
                        reason,
                    });
                    continue;
                }
            };

            report.files_read += 1;
            report.rejected_phase += parsed.rejected_phase;
            report.rejected_timestamp += parsed.rejected_timestamp;

            let batch = transform::normalize_readings(&parsed.readings, dataset_name);
            report.rejected_range += batch.rejected_range;
            report.rejected_total += batch.rejected_total;
            records.extend(batch.records);
        }

        if report.files_read == 0 {
            return Err(IngestionError::EmptySource {
                dataset: self.key,
                skipped: report.skipped,
            });
        }

        let elapsed = started.elapsed();
        metrics::histogram!("meter_ingest_duration_seconds", "dataset" => dataset_name.to_string())
            .record(elapsed.as_secs_f64());
        tracing::info!(
            dataset = dataset_name,
            files_read = report.files_read,
            files_skipped = report.skipped.len(),
            rows_rejected = report.rows_rejected(),
            records = records.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "dataset ingested"
        );

        Ok(Ingested {
            dataset: Dataset::new(self.key, records),
            report,
        })
    }
}

/// Build the (building, metric) dataset from `paths` with the default schema.
pub fn ingest(building: Building, metric: Metric, paths: &[PathBuf]) -> Result<Ingested, IngestionError> {
    Pipeline::new(DatasetKey::new(building, metric)).run(paths)
}
