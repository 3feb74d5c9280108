//! Layered run settings.
//!
//! Sources, lowest precedence first: built-in defaults, an optional TOML
//! file, `AIRQ_ETL_*` environment variables. CLI flags are applied on top
//! by the caller.

use crate::error::Result;
use crate::utils::constants::*;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use validator::Validate;

/// How fact-row identifiers are assigned on each run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactIdPolicy {
    /// Identifiers are assigned once at insertion and never change
    #[default]
    Stable,
    /// Every run renumbers the whole table densely from 0
    Renumber,
}

impl std::str::FromStr for FactIdPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stable" => Ok(FactIdPolicy::Stable),
            "renumber" => Ok(FactIdPolicy::Renumber),
            other => Err(format!("unknown fact id policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct EtlSettings {
    /// Store directory holding the four tables and the history snapshot
    pub data_dir: PathBuf,

    /// Raw extract; relative paths resolve against `data_dir`
    pub extract_file: PathBuf,

    #[validate(length(min = 1))]
    pub history_file: String,

    #[validate(length(min = 1))]
    pub time_table: String,

    #[validate(length(min = 1))]
    pub location_table: String,

    #[validate(length(min = 1))]
    pub station_table: String,

    #[validate(length(min = 1))]
    pub fact_table: String,

    #[validate(length(min = 1))]
    pub input_encoding: String,

    pub fact_ids: FactIdPolicy,
}

impl Default for EtlSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            extract_file: PathBuf::from(DEFAULT_EXTRACT_FILE),
            history_file: DEFAULT_HISTORY_FILE.to_string(),
            time_table: DEFAULT_TIME_TABLE.to_string(),
            location_table: DEFAULT_LOCATION_TABLE.to_string(),
            station_table: DEFAULT_STATION_TABLE.to_string(),
            fact_table: DEFAULT_FACT_TABLE.to_string(),
            input_encoding: DEFAULT_INPUT_ENCODING.to_string(),
            fact_ids: FactIdPolicy::default(),
        }
    }
}

impl EtlSettings {
    /// Build settings from defaults, an optional file and the environment.
    ///
    /// An explicit `config_file` must exist; without one, `airq-etl.toml` in
    /// the working directory is used when present.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let defaults = Config::try_from(&EtlSettings::default())?;
        let mut builder = Config::builder().add_source(defaults);

        builder = match config_file {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(
                File::new(DEFAULT_CONFIG_FILE, FileFormat::Toml).required(false),
            ),
        };

        let settings: EtlSettings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(false))
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Settings rooted at `data_dir` with every other value defaulted
    pub fn for_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    pub fn extract_path(&self) -> PathBuf {
        if self.extract_file.is_absolute() {
            self.extract_file.clone()
        } else {
            self.data_dir.join(&self.extract_file)
        }
    }
}
