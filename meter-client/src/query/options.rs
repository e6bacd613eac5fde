use std::collections::BTreeSet;

use crate::domain::{Dataset, FilterOptions};

/// Distinct years, months and days present in `dataset`, each ascending.
pub fn filter_options(dataset: &Dataset) -> FilterOptions {
    let mut years = BTreeSet::new();
    let mut months = BTreeSet::new();
    let mut days = BTreeSet::new();

    for rec in dataset {
        years.insert(rec.year);
        months.insert(rec.month);
        days.insert(rec.day);
    }

    FilterOptions {
        years: years.into_iter().collect(),
        months: months.into_iter().collect(),
        days: days.into_iter().collect(),
    }
}
