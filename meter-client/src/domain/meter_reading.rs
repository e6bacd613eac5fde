use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize};
use time::{Date, OffsetDateTime, Weekday};

use crate::error::{KeyParseError, RecordError};

/// A monitored facility; each one is an independent metering point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Building {
    Sm,
    Csa,
    Dese,
}

impl Building {
    pub const ALL: [Building; 3] = [Building::Sm, Building::Csa, Building::Dese];

    pub fn as_str(self) -> &'static str {
        match self {
            Building::Sm => "SM",
            Building::Csa => "CSA",
            Building::Dese => "DESE",
        }
    }
}

impl fmt::Display for Building {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Building {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Building::ALL
            .into_iter()
            .find(|b| b.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| KeyParseError::Building(s.to_string()))
    }
}

// Config files and CLI arguments share one case-insensitive spelling.
impl<'de> Deserialize<'de> for Building {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The physical quantity a source table measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Metric {
    Power,
    Voltage,
}

impl Metric {
    pub const ALL: [Metric; 2] = [Metric::Power, Metric::Voltage];

    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Power => "Power",
            Metric::Voltage => "Voltage",
        }
    }

    /// Label of the three-phase sum in exported tables.
    pub fn total_label(self) -> &'static str {
        match self {
            Metric::Power => "Total Active Power",
            Metric::Voltage => "Total Voltage",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| KeyParseError::Metric(s.to_string()))
    }
}

impl<'de> Deserialize<'de> for Metric {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Identifies one dataset: a (building, metric) pair.
///
/// Displays and parses as a source name such as `SM_Power`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DatasetKey {
    pub building: Building,
    pub metric: Metric,
}

impl DatasetKey {
    pub fn new(building: Building, metric: Metric) -> Self {
        Self { building, metric }
    }

    /// Prefix used for derived column labels and snapshot file names,
    /// e.g. `SM_A` for power and `SM_A_Voltage` for voltage.
    pub fn dataset_name(&self) -> String {
        match self.metric {
            Metric::Power => format!("{}_A", self.building),
            Metric::Voltage => format!("{}_A_Voltage", self.building),
        }
    }
}

impl fmt::Display for DatasetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.building, self.metric)
    }
}

impl FromStr for DatasetKey {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (building, metric) = s
            .trim()
            .split_once('_')
            .ok_or_else(|| KeyParseError::SourceName(s.to_string()))?;
        Ok(DatasetKey::new(building.parse()?, metric.parse()?))
    }
}

/// One normalized meter reading with its derived calendar fields.
///
/// All calendar fields are UTC and derived from `datetime`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedRecord {
    pub epoch_ms: i64,
    pub datetime: OffsetDateTime,
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    /// R + Y + B.
    pub total: f64,
}

impl NormalizedRecord {
    /// Decode an epoch-milliseconds timestamp and attach the three-phase total.
    ///
    /// The total must be finite; phases near `f64::MAX` can overflow the sum.
    pub fn from_epoch_millis(epoch_ms: i64, total: f64) -> Result<Self, RecordError> {
        let datetime = OffsetDateTime::from_unix_timestamp_nanos(i128::from(epoch_ms) * 1_000_000)
            .map_err(|_| RecordError::TimestampOutOfRange { epoch_ms })?;
        if !total.is_finite() {
            return Err(RecordError::NonFiniteTotal { epoch_ms });
        }

        Ok(Self {
            epoch_ms,
            datetime,
            year: datetime.year(),
            month: u8::from(datetime.month()),
            day: datetime.day(),
            hour: datetime.hour(),
            minute: datetime.minute(),
            total,
        })
    }

    /// Build a record from the three phase readings.
    pub fn from_phases(epoch_ms: i64, phases: [f64; 3]) -> Result<Self, RecordError> {
        let [r, y, b] = phases;
        Self::from_epoch_millis(epoch_ms, r + y + b)
    }

    pub fn date(&self) -> Date {
        self.datetime.date()
    }

    pub fn weekday(&self) -> Weekday {
        self.datetime.weekday()
    }
}
