use time::{Month, Weekday};

use crate::{
    domain::{Dataset, NormalizedRecord},
    error::QueryError,
};

/// Calendar restriction on a dataset.
///
/// An unset field imposes no restriction. Set fields compose with AND. A day
/// without a month matches that day-of-month in every month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateFilter {
    pub year: Option<i32>,
    pub month: Option<u8>,
    pub day: Option<u8>,
    pub weekday: Option<Weekday>,
}

impl DateFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn month(mut self, month: u8) -> Self {
        self.month = Some(month);
        self
    }

    pub fn day(mut self, day: u8) -> Self {
        self.day = Some(day);
        self
    }

    pub fn weekday(mut self, weekday: Weekday) -> Self {
        self.weekday = Some(weekday);
        self
    }

    /// Accepts `"January"`, `"jan"` or `"1"`.
    pub fn month_name(self, name: &str) -> Result<Self, QueryError> {
        Ok(self.month(parse_month(name)?))
    }

    /// Accepts `"Monday"` or `"mon"`.
    pub fn weekday_name(self, name: &str) -> Result<Self, QueryError> {
        Ok(self.weekday(parse_weekday(name)?))
    }

    pub fn is_unrestricted(&self) -> bool {
        *self == Self::default()
    }

    pub fn matches(&self, rec: &NormalizedRecord) -> bool {
        self.year.map_or(true, |y| rec.year == y)
            && self.month.map_or(true, |m| rec.month == m)
            && self.day.map_or(true, |d| rec.day == d)
            && self.weekday.map_or(true, |w| rec.weekday() == w)
    }
}

/// Records of `dataset` matching `filter`, in their original order.
pub fn filter(dataset: &Dataset, filter: &DateFilter) -> Dataset {
    let records = dataset.iter().filter(|r| filter.matches(r)).copied().collect();
    Dataset::new(dataset.key(), records)
}

/// Year/month/day form of [`filter`].
pub fn filter_by(dataset: &Dataset, year: Option<i32>, month: Option<u8>, day: Option<u8>) -> Dataset {
    let f = DateFilter {
        year,
        month,
        day,
        weekday: None,
    };
    filter(dataset, &f)
}

pub fn parse_month(s: &str) -> Result<u8, QueryError> {
    let s = s.trim();
    if let Ok(n) = s.parse::<u8>() {
        return Month::try_from(n)
            .map(u8::from)
            .map_err(|_| QueryError::InvalidMonth(s.to_string()));
    }

    let mut month = Month::January;
    for _ in 0..12 {
        if matches_name(&month.to_string(), s) {
            return Ok(u8::from(month));
        }
        month = month.next();
    }
    Err(QueryError::InvalidMonth(s.to_string()))
}

pub fn parse_weekday(s: &str) -> Result<Weekday, QueryError> {
    let s = s.trim();
    let mut weekday = Weekday::Monday;
    for _ in 0..7 {
        if matches_name(&weekday.to_string(), s) {
            return Ok(weekday);
        }
        weekday = weekday.next();
    }
    Err(QueryError::InvalidWeekday(s.to_string()))
}

// Full name or three-letter abbreviation, case-insensitive.
fn matches_name(full: &str, candidate: &str) -> bool {
    full.eq_ignore_ascii_case(candidate)
        || (candidate.len() == 3 && full.get(..3).is_some_and(|abbr| abbr.eq_ignore_ascii_case(candidate)))
}
