use serde::Serialize;
use serde_json::{Map, Value};
use time::format_description::well_known::Rfc3339;

use super::meter_reading::{DatasetKey, NormalizedRecord};
use crate::error::QueryError;

/// An ordered, immutable sequence of normalized records for one
/// (building, metric) pair.
///
/// Every filter or aggregate produces a new value; a `Dataset` is never
/// modified after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    key: DatasetKey,
    records: Vec<NormalizedRecord>,
}

impl Dataset {
    pub fn new(key: DatasetKey, records: Vec<NormalizedRecord>) -> Self {
        Self { key, records }
    }

    pub fn empty(key: DatasetKey) -> Self {
        Self::new(key, Vec::new())
    }

    pub fn key(&self) -> DatasetKey {
        self.key
    }

    pub fn records(&self) -> &[NormalizedRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NormalizedRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Output field names, in the order each exported record carries them.
    pub fn labels(&self) -> Vec<String> {
        let p = self.key.dataset_name();
        vec![
            "TIME_UTC_Seconds".to_string(),
            format!("{p}_Year"),
            format!("{p}_Month"),
            format!("{p}_day"),
            format!("{p}_Hour"),
            format!("{p}_datetime"),
            format!("{p}_Minute"),
            self.key.metric.total_label().to_string(),
        ]
    }

    /// Render the dataset as `labels` plus one label-keyed record per row.
    pub fn to_table(&self) -> Result<DatasetTable, QueryError> {
        let labels = self.labels();
        let mut data = Vec::with_capacity(self.records.len());

        for rec in &self.records {
            let values = [
                Value::from(rec.epoch_ms),
                Value::from(rec.year),
                Value::from(rec.month),
                Value::from(rec.day),
                Value::from(rec.hour),
                Value::from(rec.datetime.format(&Rfc3339)?),
                Value::from(rec.minute),
                Value::from(rec.total),
            ];
            let row: Map<String, Value> = labels.iter().cloned().zip(values).collect();
            data.push(row);
        }

        Ok(DatasetTable { labels, data })
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a NormalizedRecord;
    type IntoIter = std::slice::Iter<'a, NormalizedRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Tabular view handed to the dashboard layer.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetTable {
    pub labels: Vec<String>,
    pub data: Vec<Map<String, Value>>,
}
