use std::collections::BTreeSet;

use time::Date;

use super::rollup::hourly_means;
use crate::{
    domain::{Dataset, HeatmapMatrix},
    error::QueryError,
};

/// Hour-by-date matrix of hourly means, min-max normalized across the whole
/// dataset.
///
/// Buckets without readings stay `None`. An empty dataset yields a matrix with
/// no columns. When every hourly mean is identical the normalization has no
/// range and [`QueryError::DegenerateRange`] is returned instead.
pub fn heatmap_matrix(dataset: &Dataset) -> Result<HeatmapMatrix, QueryError> {
    let hourly = hourly_means(dataset);

    let dates: Vec<Date> = hourly
        .iter()
        .map(|h| h.date)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let Some(first) = hourly.first() else {
        return Ok(HeatmapMatrix::new(dates, vec![Vec::new(); HeatmapMatrix::HOURS]));
    };

    let (min, max) = hourly
        .iter()
        .fold((first.mean, first.mean), |(lo, hi), h| (lo.min(h.mean), hi.max(h.mean)));
    let range = max - min;
    if range <= 0.0 || !range.is_finite() {
        return Err(QueryError::DegenerateRange { value: min });
    }

    let mut cells = vec![vec![None; dates.len()]; HeatmapMatrix::HOURS];
    // `hourly` is sorted by date, so columns advance monotonically.
    let mut column = 0;
    for h in &hourly {
        while dates[column] != h.date {
            column += 1;
        }
        cells[usize::from(h.hour)][column] = Some((h.mean - min) / range);
    }

    Ok(HeatmapMatrix::new(dates, cells))
}
