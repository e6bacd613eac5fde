use std::collections::BTreeMap;

use crate::domain::{DailyRollup, Dataset, HourlyMean, NormalizedRecord};

#[derive(Debug, Clone, Copy)]
struct Accumulator {
    min: f64,
    max: f64,
    sum: f64,
    count: usize,
}

impl Accumulator {
    fn new(v: f64) -> Self {
        Self {
            min: v,
            max: v,
            sum: v,
            count: 1,
        }
    }

    fn push(&mut self, v: f64) {
        self.min = self.min.min(v);
        self.max = self.max.max(v);
        self.sum += v;
        self.count += 1;
    }

    // Rounding in `sum` must not push the mean outside [min, max].
    fn mean(&self) -> f64 {
        (self.sum / self.count as f64).clamp(self.min, self.max)
    }
}

fn accumulate<K, F>(dataset: &Dataset, key_of: F) -> BTreeMap<K, Accumulator>
where
    K: Ord,
    F: Fn(&NormalizedRecord) -> K,
{
    let mut buckets: BTreeMap<K, Accumulator> = BTreeMap::new();
    for rec in dataset {
        buckets
            .entry(key_of(rec))
            .and_modify(|acc| acc.push(rec.total))
            .or_insert_with(|| Accumulator::new(rec.total));
    }
    buckets
}

/// Hourly-resampled mean of `total`, ascending by (date, hour).
///
/// Hours without readings are omitted rather than filled.
pub fn hourly_means(dataset: &Dataset) -> Vec<HourlyMean> {
    accumulate(dataset, |r| (r.date(), r.hour))
        .into_iter()
        .map(|((date, hour), acc)| HourlyMean {
            date,
            hour,
            mean: acc.mean(),
            samples: acc.count,
        })
        .collect()
}

/// Per-date min/max/mean of `total`, ascending by UTC date.
pub fn daily_rollup(dataset: &Dataset) -> Vec<DailyRollup> {
    accumulate(dataset, NormalizedRecord::date)
        .into_iter()
        .map(|(date, acc)| DailyRollup {
            date,
            min: acc.min,
            max: acc.max,
            mean: acc.mean(),
            samples: acc.count,
        })
        .collect()
}
