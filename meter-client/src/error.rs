/// Failure to parse a building, metric or `BUILDING_Metric` source name.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyParseError {
    #[error("unknown building '{0}' (expected SM, CSA or DESE)")]
    Building(String),
    #[error("unknown metric '{0}' (expected Power or Voltage)")]
    Metric(String),
    #[error("invalid source name '{0}' (expected BUILDING_Metric)")]
    SourceName(String),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("epoch milliseconds {epoch_ms} out of representable range")]
    TimestampOutOfRange { epoch_ms: i64 },
    #[error("three-phase total at {epoch_ms} ms is not finite")]
    NonFiniteTotal { epoch_ms: i64 },
}

#[derive(thiserror::Error, Debug)]
pub enum QueryError {
    /// Every hourly mean is the same value, so min-max normalization has a
    /// zero denominator.
    #[error("degenerate range: all hourly means equal {value}")]
    DegenerateRange { value: f64 },
    #[error("invalid month '{0}'")]
    InvalidMonth(String),
    #[error("invalid weekday '{0}'")]
    InvalidWeekday(String),
    #[error("failed to format timestamp: {0}")]
    Format(#[from] time::error::Format),
}
