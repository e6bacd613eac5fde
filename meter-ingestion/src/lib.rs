pub mod catalog;
pub mod config;
pub mod metrics_server;
pub mod observability;
pub mod pipeline;
pub mod schema;
pub mod sinks;
pub mod sources;
pub mod transform;

pub use catalog::{CatalogError, DatasetCatalog, LoadOutcome};
pub use pipeline::{ingest, IngestReport, Ingested, IngestionError, Pipeline};
