//! Read-only queries over a [`Dataset`](crate::domain::Dataset).
//!
//! Every function borrows its input and returns freshly allocated results,
//! so concurrent callers can share one dataset snapshot without locking.

pub mod filter;
pub mod heatmap;
pub mod options;
pub mod rollup;

pub use filter::{filter, filter_by, DateFilter};
pub use heatmap::heatmap_matrix;
pub use options::filter_options;
pub use rollup::{daily_rollup, hourly_means};

#[cfg(test)]
pub(crate) mod test_support {
    use time::OffsetDateTime;

    use crate::domain::{Building, Dataset, DatasetKey, Metric, NormalizedRecord};

    pub fn record(ts: OffsetDateTime, total: f64) -> NormalizedRecord {
        let epoch_ms = i64::try_from(ts.unix_timestamp_nanos() / 1_000_000).unwrap();
        NormalizedRecord::from_epoch_millis(epoch_ms, total).unwrap()
    }

    pub fn dataset(points: &[(OffsetDateTime, f64)]) -> Dataset {
        let key = DatasetKey::new(Building::Sm, Metric::Power);
        Dataset::new(key, points.iter().map(|&(ts, v)| record(ts, v)).collect())
    }
}
