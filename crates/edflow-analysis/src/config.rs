//! Pipeline configuration
//!
//! Every value has a default, so an empty file is a valid configuration.
//! `edflow default-config` prints the defaults as a starting point:
//!
//! ```toml
//! timestamp_formats = ["%Y-%m-%d %H:%M:%S%.f", "%d/%m/%Y %H:%M"]
//!
//! [input.primary]
//! path = "data/visits.csv"
//! encoding = "utf-8"
//! delimiter = ","
//!
//! [input.priorities]
//! path = "data/priorities.csv"
//! encoding = "windows-1252"
//! delimiter = ";"
//!
//! [thresholds]
//! triage_queue_cap = 14400.0
//! service_queue_cap = 43200.0
//!
//! [thresholds.floor]
//! triage_queue = 10.0
//!
//! [cohorts.trauma]
//! durations = ["service_queue", "service_duration"]
//! predicate = { kind = "sub_category", category = "Adult", sub_categories = ["Trauma"] }
//! ```

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    cleaner::Thresholds,
    fitting::FitConfig,
    loader::{PrimaryColumns, PriorityColumns, SourceConfig},
    segment::CohortSet,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// `chrono` formats tried in order for every timestamp cell.
    pub timestamp_formats: Vec<String>,
    pub input: InputConfig,
    pub thresholds: Thresholds,
    pub cohorts: CohortSet,
    pub fit: FitConfig,
    pub output: OutputConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            timestamp_formats: [
                "%Y-%m-%d %H:%M:%S%.f",
                "%Y-%m-%dT%H:%M:%S%.f",
                "%Y-%m-%d %H:%M",
                "%d/%m/%Y %H:%M:%S",
                "%d/%m/%Y %H:%M",
            ]
            .map(str::to_owned)
            .to_vec(),
            input: InputConfig::default(),
            thresholds: Thresholds::default(),
            cohorts: CohortSet::default_ed(),
            fit: FitConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub primary: PrimaryInput,
    pub priorities: PriorityInput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrimaryInput {
    pub path: PathBuf,
    #[serde(flatten)]
    pub source: SourceConfig,
    pub columns: PrimaryColumns,
}

impl Default for PrimaryInput {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/visits.csv"),
            source: SourceConfig::default(),
            columns: PrimaryColumns::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityInput {
    pub path: PathBuf,
    #[serde(flatten)]
    pub source: SourceConfig,
    pub columns: PriorityColumns,
}

impl Default for PriorityInput {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/priorities.csv"),
            source: SourceConfig::default(),
            columns: PriorityColumns::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Cleaned visits with their durations (CSV).
    pub cleaned: PathBuf,
    /// Inter-arrival gaps in seconds, one per line.
    pub inter_arrival: PathBuf,
    /// Long-form cohort observations (CSV), skipped when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long_form: Option<PathBuf>,
    /// Chosen family and parameters per cohort variable (JSON).
    pub parameters: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            cleaned: PathBuf::from("out/cleaned.csv"),
            inter_arrival: PathBuf::from("out/inter_arrival.txt"),
            long_form: None,
            parameters: PathBuf::from("out/parameters.json"),
        }
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum ConfigError {
    #[display("failed to read config file {}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[display("invalid config file {}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[display("failed to serialize config")]
    Serialize { source: toml::ser::Error },
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::from_toml(path, &text)
    }

    /// Parses `text`; `path` only names the source in errors.
    pub fn from_toml(path: &Path, text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|source| ConfigError::Serialize { source })
    }
}
