use std::{
    fs::File,
    io::{BufRead, BufReader, Read},
    path::PathBuf,
};

use crate::{pipeline::FileError, schema::SourceSchema};

/// One raw row: epoch-milliseconds timestamp and R, Y, B phase readings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawReading {
    pub epoch_ms: i64,
    pub phases: [f64; 3],
}

/// Rows of one successfully parsed file, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedFile {
    pub readings: Vec<RawReading>,
    /// Rows dropped because a phase value was not numeric.
    pub rejected_phase: usize,
    /// Rows dropped because the timestamp was not numeric.
    pub rejected_timestamp: usize,
}

/// Meter CSV export on disk.
///
/// Expected layout: `header_skip` preamble lines, then a header row naming at
/// least the time column and the three phase columns, then data rows that all
/// have the header's column count.
#[derive(Debug, Clone)]
pub struct MeterCsvFile {
    path: PathBuf,
}

impl MeterCsvFile {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Parse the whole file. Any structural problem rejects the file as a
    /// unit so a partially read file never reaches the dataset.
    pub fn read(&self, schema: &SourceSchema) -> Result<ParsedFile, FileError> {
        let file = File::open(&self.path)?;
        read_meter_csv(file, schema)
    }
}

fn parse_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

// Exports normally carry integer milliseconds; some tools write them as floats.
fn parse_epoch_millis(s: &str) -> Option<i64> {
    let trimmed = s.trim();
    if let Ok(ms) = trimmed.parse::<i64>() {
        return Some(ms);
    }
    let v = parse_number(trimmed)?.round();
    if v >= i64::MIN as f64 && v < i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

pub fn read_meter_csv<R: Read>(reader: R, schema: &SourceSchema) -> Result<ParsedFile, FileError> {
    let mut reader = BufReader::new(reader);
    let mut preamble = String::new();
    for _ in 0..schema.header_skip {
        preamble.clear();
        if reader.read_line(&mut preamble)? == 0 {
            break;
        }
    }

    let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|e| FileError::Malformed(format!("failed to read CSV headers: {e}")))?
        .clone();

    if headers.len() < schema.column_count {
        return Err(FileError::Malformed(format!(
            "expected at least {} columns, found {}",
            schema.column_count,
            headers.len()
        )));
    }

    let col = |name: &str| -> Result<usize, FileError> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| FileError::MissingColumn(name.to_string()))
    };

    let time_idx = col(&schema.time_column)?;
    let [r, y, b] = &schema.phase_columns;
    let phase_idx = [col(r)?, col(y)?, col(b)?];

    let mut parsed = ParsedFile::default();
    for (row, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| FileError::Malformed(format!("row {}: {e}", row + 1)))?;

        // Record length equals the header length, so indexing is in bounds.
        let Some(epoch_ms) = parse_epoch_millis(&record[time_idx]) else {
            parsed.rejected_timestamp += 1;
            continue;
        };

        let [pr, py, pb] = phase_idx.map(|i| parse_number(&record[i]));
        match (pr, py, pb) {
            (Some(r), Some(y), Some(b)) => parsed.readings.push(RawReading {
                epoch_ms,
                phases: [r, y, b],
            }),
            _ => parsed.rejected_phase += 1,
        }
    }

    if parsed.rejected_phase > 0 {
        metrics::counter!("meter_csv_rows_rejected_total", "dataset" => schema.dataset_name.clone(), "reason" => "phase")
            .increment(parsed.rejected_phase as u64);
    }
    if parsed.rejected_timestamp > 0 {
        metrics::counter!("meter_csv_rows_rejected_total", "dataset" => schema.dataset_name.clone(), "reason" => "timestamp")
            .increment(parsed.rejected_timestamp as u64);
    }

    Ok(parsed)
}
