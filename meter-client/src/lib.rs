pub mod domain;
pub mod error;
pub mod query;

pub use domain::{Building, Dataset, DatasetKey, Metric, NormalizedRecord};
pub use error::{KeyParseError, QueryError, RecordError};
