pub mod aggregates;
pub mod dataset;
pub mod meter_reading;

pub use aggregates::{DailyRollup, FilterOptions, HeatmapMatrix, HourlyMean};
pub use dataset::{Dataset, DatasetTable};
pub use meter_reading::{Building, DatasetKey, Metric, NormalizedRecord};
