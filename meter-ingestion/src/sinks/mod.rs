pub mod snapshot;

pub use snapshot::{LoadedSnapshot, SnapshotError, SnapshotStore};
