use meter_client::{NormalizedRecord, RecordError};
use time::{macros::datetime, OffsetDateTime};

use crate::sources::RawReading;

const MIN_TS: OffsetDateTime = datetime!(2000-01-01 00:00:00 UTC);
const MAX_TS: OffsetDateTime = datetime!(2100-01-01 00:00:00 UTC);

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("timestamp {epoch_ms} ms outside allowed range")]
    TimestampOutOfRange { epoch_ms: i64 },
    #[error("phase sum at {epoch_ms} ms overflows")]
    NonFiniteTotal { epoch_ms: i64 },
}

/// Decode a raw reading into a normalized record.
///
/// Rules:
/// - the timestamp must fall within [2000-01-01, 2100-01-01) UTC.
/// - total is R + Y + B and must be finite.
pub fn normalize_reading(reading: &RawReading) -> Result<NormalizedRecord, TransformError> {
    let epoch_ms = reading.epoch_ms;
    let rec = NormalizedRecord::from_phases(epoch_ms, reading.phases).map_err(|e| match e {
        RecordError::TimestampOutOfRange { .. } => TransformError::TimestampOutOfRange { epoch_ms },
        RecordError::NonFiniteTotal { .. } => TransformError::NonFiniteTotal { epoch_ms },
    })?;
    if rec.datetime < MIN_TS || rec.datetime >= MAX_TS {
        return Err(TransformError::TimestampOutOfRange { epoch_ms });
    }
    Ok(rec)
}

/// Normalized records of one file, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedBatch {
    pub records: Vec<NormalizedRecord>,
    pub rejected_range: usize,
    pub rejected_total: usize,
}

pub fn normalize_readings(readings: &[RawReading], dataset_name: &str) -> NormalizedBatch {
    let mut batch = NormalizedBatch {
        records: Vec::with_capacity(readings.len()),
        rejected_range: 0,
        rejected_total: 0,
    };

    for reading in readings {
        match normalize_reading(reading) {
            Ok(rec) => batch.records.push(rec),
            Err(e) => {
                tracing::debug!(dataset = dataset_name, error = %e, "dropping reading");
                match e {
                    TransformError::TimestampOutOfRange { .. } => batch.rejected_range += 1,
                    TransformError::NonFiniteTotal { .. } => batch.rejected_total += 1,
                }
            }
        }
    }

    if batch.rejected_range > 0 {
        metrics::counter!("meter_csv_rows_rejected_total", "dataset" => dataset_name.to_string(), "reason" => "range")
            .increment(batch.rejected_range as u64);
    }
    if batch.rejected_total > 0 {
        metrics::counter!("meter_csv_rows_rejected_total", "dataset" => dataset_name.to_string(), "reason" => "total")
            .increment(batch.rejected_total as u64);
    }

    batch
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(epoch_ms: i64, phases: [f64; 3]) -> RawReading {
        RawReading { epoch_ms, phases }
    }

    #[test]
    fn total_is_sum_of_phases() {
        let rec = normalize_reading(&reading(1_700_000_000_000, [10.0, 20.0, 5.0])).unwrap();
        assert!((rec.total - 35.0).abs() < 1e-9);
        assert_eq!((rec.year, rec.month, rec.day, rec.hour), (2023, 11, 14, 22));
    }

    #[test]
    fn rejects_out_of_range_ts() {
        // Seconds mistaken for milliseconds land in January 1970.
        let res = normalize_reading(&reading(1_700_000_000, [1.0, 1.0, 1.0]));
        assert_eq!(
            res,
            Err(TransformError::TimestampOutOfRange {
                epoch_ms: 1_700_000_000
            })
        );

        let res = normalize_reading(&reading(i64::MAX, [1.0, 1.0, 1.0]));
        assert!(res.is_err());
    }

    #[test]
    fn batch_keeps_order_and_counts_rejections() {
        let readings = [
            reading(1_700_000_120_000, [1.0, 1.0, 1.0]),
            reading(0, [9.0, 9.0, 9.0]),
            reading(1_700_000_000_000, [2.0, 2.0, 2.0]),
        ];

        let batch = normalize_readings(&readings, "SM_A");
        let totals: Vec<f64> = batch.records.iter().map(|r| r.total).collect();
        assert_eq!(totals, vec![3.0, 6.0]);
        assert_eq!(batch.rejected_range, 1);
        assert_eq!(batch.rejected_total, 0);
    }

    #[test]
    fn overflowing_totals_are_dropped() {
        let readings = [
            reading(1_700_000_000_000, [1e308, 1e308, 0.0]),
            reading(1_700_000_010_000, [-1e308, -1e308, 0.0]),
            reading(1_700_000_020_000, [1.0, 1.0, 1.0]),
        ];

        assert_eq!(
            normalize_reading(&readings[0]),
            Err(TransformError::NonFiniteTotal {
                epoch_ms: 1_700_000_000_000
            })
        );

        let batch = normalize_readings(&readings, "SM_A");
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].total, 3.0);
        assert_eq!(batch.rejected_total, 2);
        assert_eq!(batch.rejected_range, 0);
    }
}
