use serde::Serialize;
use time::Date;

// `Date` displays as `YYYY-MM-DD`.
mod iso_date {
    use serde::{ser::SerializeSeq, Serializer};
    use time::Date;

    pub fn serialize<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(date)
    }

    pub fn serialize_all<S: Serializer>(dates: &[Date], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(dates.len()))?;
        for d in dates {
            seq.serialize_element(&d.to_string())?;
        }
        seq.end()
    }
}

/// Mean of `total` over one (date, hour) bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HourlyMean {
    #[serde(serialize_with = "iso_date::serialize")]
    pub date: Date,
    pub hour: u8,
    pub mean: f64,
    pub samples: usize,
}

/// Daily min/max/mean of `total`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyRollup {
    #[serde(serialize_with = "iso_date::serialize")]
    pub date: Date,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub samples: usize,
}

/// Hour-by-date grid of min-max-normalized hourly means.
///
/// `cells[hour][column]` is `None` when the bucket had no readings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapMatrix {
    #[serde(serialize_with = "iso_date::serialize_all")]
    dates: Vec<Date>,
    cells: Vec<Vec<Option<f64>>>,
}

impl HeatmapMatrix {
    pub const HOURS: usize = 24;

    /// `cells` must hold exactly 24 rows of `dates.len()` columns each.
    pub(crate) fn new(dates: Vec<Date>, cells: Vec<Vec<Option<f64>>>) -> Self {
        debug_assert_eq!(cells.len(), Self::HOURS);
        debug_assert!(cells.iter().all(|row| row.len() == dates.len()));
        Self { dates, cells }
    }

    /// Column headers, ascending.
    pub fn dates(&self) -> &[Date] {
        &self.dates
    }

    /// One row per hour of day, 0 through 23.
    pub fn rows(&self) -> &[Vec<Option<f64>>] {
        &self.cells
    }

    pub fn get(&self, hour: usize, column: usize) -> Option<f64> {
        self.cells.get(hour).and_then(|row| row.get(column)).copied().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Distinct calendar values present in a dataset, for populating filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub years: Vec<i32>,
    pub months: Vec<u8>,
    pub days: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn heatmap_serializes_sentinel_as_null() {
        let mut cells = vec![vec![None]; HeatmapMatrix::HOURS];
        cells[3][0] = Some(0.5);
        let m = HeatmapMatrix::new(vec![date!(2024-01-15)], cells);

        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["dates"][0], "2024-01-15");
        assert_eq!(json["cells"][3][0], 0.5);
        assert!(json["cells"][0][0].is_null());
    }

    #[test]
    fn rollup_serializes_iso_date() {
        let r = DailyRollup {
            date: date!(2024-02-01),
            min: 1.0,
            max: 3.0,
            mean: 2.0,
            samples: 2,
        };
        let json = serde_json::to_value(r).unwrap();
        assert_eq!(json["date"], "2024-02-01");
    }
}
