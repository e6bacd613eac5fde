use meter_client::{Building, DatasetKey, Metric};
use serde::Deserialize;
use std::{collections::HashSet, fs, path::PathBuf};

use crate::schema::{SourceSchema, DEFAULT_HEADER_SKIP};

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub building: Building,
    pub metric: Metric,
    /// Directory of CSV exports, or a single CSV file.
    pub directory: PathBuf,
    #[serde(default = "default_header_skip")]
    pub header_skip: usize,
}

fn default_header_skip() -> usize {
    DEFAULT_HEADER_SKIP
}

impl SourceConfig {
    pub fn key(&self) -> DatasetKey {
        DatasetKey::new(self.building, self.metric)
    }

    pub fn schema(&self) -> SourceSchema {
        SourceSchema::for_key(self.key()).with_header_skip(self.header_skip)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotConfig {
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshConfig {
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub sources: Vec<SourceConfig>,
    pub snapshot: Option<SnapshotConfig>,
    pub metrics: Option<MetricsConfig>,
    pub refresh: Option<RefreshConfig>,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read { path: String, source: std::io::Error },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("source {0} configured more than once")]
    DuplicateSource(DatasetKey),
    #[error("refresh.interval_secs must be positive")]
    ZeroRefreshInterval,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        use std::env;

        let path = env::var("METER_INGESTION_CONFIG").unwrap_or_else(|_| "meter-ingestion.toml".to_string());
        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Read { path, source })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let cfg: AppConfig = toml::from_str(contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for source in &self.sources {
            if !seen.insert(source.key()) {
                return Err(ConfigError::DuplicateSource(source.key()));
            }
        }
        if matches!(self.refresh, Some(RefreshConfig { interval_secs: 0 })) {
            return Err(ConfigError::ZeroRefreshInterval);
        }
        Ok(())
    }

    pub fn source(&self, key: DatasetKey) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.key() == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [[sources]]
        building = "SM"
        metric = "Power"
        directory = "data/SoilMech-dataset"

        [[sources]]
        building = "CSA"
        metric = "Voltage"
        directory = "data/csavoltage.dataset"
        header_skip = 4

        [snapshot]
        dir = "data/snapshots"

        [refresh]
        interval_secs = 900
    "#;

    #[test]
    fn parses_sources_with_defaults() {
        let cfg = AppConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(cfg.sources.len(), 2);
        assert_eq!(cfg.sources[0].header_skip, 6);
        assert_eq!(cfg.sources[1].schema().header_skip, 4);
        assert_eq!(cfg.sources[1].key(), DatasetKey::new(Building::Csa, Metric::Voltage));
        assert!(cfg.metrics.is_none());
        assert_eq!(cfg.refresh.as_ref().unwrap().interval_secs, 900);

        let sm = cfg.source(DatasetKey::new(Building::Sm, Metric::Power)).unwrap();
        assert_eq!(sm.directory, PathBuf::from("data/SoilMech-dataset"));
        assert!(cfg.source(DatasetKey::new(Building::Dese, Metric::Power)).is_none());
    }

    #[test]
    fn rejects_duplicate_sources() {
        let toml = r#"
            [[sources]]
            building = "SM"
            metric = "Power"
            directory = "a"

            [[sources]]
            building = "SM"
            metric = "Power"
            directory = "b"
        "#;
        assert!(matches!(
            AppConfig::from_toml_str(toml),
            Err(ConfigError::DuplicateSource(_))
        ));
    }

    #[test]
    fn building_and_metric_names_are_case_insensitive() {
        let toml = r#"
            [[sources]]
            building = "sm"
            metric = "voltage"
            directory = "a"
        "#;
        let cfg = AppConfig::from_toml_str(toml).unwrap();
        assert_eq!(cfg.sources[0].key(), DatasetKey::new(Building::Sm, Metric::Voltage));
    }

    #[test]
    fn rejects_unknown_building() {
        let toml = r#"
            [[sources]]
            building = "LIB"
            metric = "Power"
            directory = "a"
        "#;
        assert!(matches!(AppConfig::from_toml_str(toml), Err(ConfigError::Parse(_))));
    }
}
