use meter_client::{DatasetKey, Metric};

/// Rows of preamble the meter export writes above the header line.
pub const DEFAULT_HEADER_SKIP: usize = 6;

/// Timestamp + three phases + one trailing unnamed column.
pub const DEFAULT_COLUMN_COUNT: usize = 5;

pub const TIME_COLUMN: &str = "TIME [UTC Seconds]";

const POWER_PHASES: [&str; 3] = ["R[kW]   ", "Y[kW]   ", "B[kW]   "];
const VOLTAGE_PHASES: [&str; 3] = ["R[Volt]   ", "Y[Volt]   ", "B[Volt]   "];

/// Layout of one meter CSV export.
///
/// Column names are matched exactly, including the trailing spaces the meter
/// software writes into the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSchema {
    /// Dataset-name prefix for diagnostics, e.g. `SM_A`.
    pub dataset_name: String,
    pub time_column: String,
    /// R, Y, B in that order.
    pub phase_columns: [String; 3],
    pub header_skip: usize,
    /// Minimum number of columns the header must declare.
    pub column_count: usize,
}

impl SourceSchema {
    pub fn for_key(key: DatasetKey) -> Self {
        let phases = match key.metric {
            Metric::Power => POWER_PHASES,
            Metric::Voltage => VOLTAGE_PHASES,
        };

        Self {
            dataset_name: key.dataset_name(),
            time_column: TIME_COLUMN.to_string(),
            phase_columns: phases.map(str::to_string),
            header_skip: DEFAULT_HEADER_SKIP,
            column_count: DEFAULT_COLUMN_COUNT,
        }
    }

    pub fn with_header_skip(mut self, header_skip: usize) -> Self {
        self.header_skip = header_skip;
        self
    }

    /// Every column the reader must locate by name.
    pub fn required_columns(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.time_column.as_str()).chain(self.phase_columns.iter().map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meter_client::Building;

    #[test]
    fn voltage_schema_keeps_trailing_spaces() {
        let schema = SourceSchema::for_key(DatasetKey::new(Building::Csa, Metric::Voltage));
        assert_eq!(schema.dataset_name, "CSA_A_Voltage");
        assert_eq!(schema.phase_columns[0], "R[Volt]   ");
        assert_eq!(schema.header_skip, 6);

        let cols: Vec<&str> = schema.required_columns().collect();
        assert_eq!(cols, vec!["TIME [UTC Seconds]", "R[Volt]   ", "Y[Volt]   ", "B[Volt]   "]);
    }

    #[test]
    fn header_skip_is_overridable() {
        let schema = SourceSchema::for_key(DatasetKey::new(Building::Sm, Metric::Power)).with_header_skip(0);
        assert_eq!(schema.header_skip, 0);
        assert_eq!(schema.phase_columns[2], "B[kW]   ");
    }
}
