pub mod meter_csv_file;

pub use meter_csv_file::{MeterCsvFile, ParsedFile, RawReading};

use std::{
    fs, io,
    path::{Path, PathBuf},
    time::UNIX_EPOCH,
};

use crate::{pipeline::IngestionError, schema::SourceSchema};

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
}

/// List the CSV exports under `dir`, sorted by path.
///
/// Sorting only makes logs and snapshots reproducible; correctness never
/// depends on file order. A path that is itself a CSV file is returned as-is.
pub fn discover_csv_files(dir: &Path) -> Result<Vec<PathBuf>, IngestionError> {
    if dir.is_file() && is_csv(dir) {
        return Ok(vec![dir.to_path_buf()]);
    }
    if !dir.is_dir() {
        return Err(IngestionError::SourceNotFound {
            path: dir.to_path_buf(),
        });
    }

    let entries = fs::read_dir(dir).map_err(|source| IngestionError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| IngestionError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_file() && is_csv(&path) {
            files.push(path);
        }
    }

    if files.is_empty() {
        return Err(IngestionError::NoMatchingFiles {
            path: dir.to_path_buf(),
        });
    }

    files.sort();
    Ok(files)
}

fn hash_str(hasher: &mut blake3::Hasher, s: &str) {
    let len = s.len() as u32;
    hasher.update(&len.to_le_bytes());
    hasher.update(s.as_bytes());
}

/// Content-independent fingerprint of a file set read with `schema`: the
/// schema's layout plus path, size and mtime of each file.
pub fn fingerprint(schema: &SourceSchema, paths: &[PathBuf]) -> io::Result<String> {
    let mut h = blake3::Hasher::new();
    h.update(&(schema.header_skip as u64).to_le_bytes());
    h.update(&(schema.column_count as u64).to_le_bytes());
    for column in schema.required_columns() {
        hash_str(&mut h, column);
    }

    h.update(&(paths.len() as u64).to_le_bytes());

    for path in paths {
        let meta = fs::metadata(path)?;
        let mtime_nanos = meta
            .modified()?
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();

        hash_str(&mut h, &path.to_string_lossy());
        h.update(&meta.len().to_le_bytes());
        h.update(&mtime_nanos.to_le_bytes());
    }

    Ok(h.finalize().to_hex().to_string())
}
