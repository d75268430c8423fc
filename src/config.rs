/// Batch configuration for the seismic stacking pipeline.
///
/// A TOML file lists the datasets to process and the shared filter and
/// masking settings:
///
/// ```toml
/// output_dir = "output"
/// log_level = "info"
///
/// [filter]
/// order = 5
/// sample_rate = 30.0
/// cutoff = 0.025
///
/// [masking]
/// enabled = true
///
/// [[dataset]]
/// parameter = "rsam"
/// path = "data/RSAM_10min.csv"
/// columns = ["SEP", "YEL", "HSR"]
/// extrusion = "data/extrusion.txt"
/// ```
///
/// Relative paths inside the file resolve against the file's directory.
/// `SEISMIC_STACK_CONFIG` names the file when no path is given, and
/// `SEISMIC_STACK_OUTPUT_DIR` overrides `output_dir`. Both may be set in a
/// `.env` file.

use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::analysis::filter::{ButterworthLowPass, FilterConfig};
use crate::analysis::masking::MaskConfig;
use crate::ingest::csv_table::ColumnSelector;
use crate::logging::LogLevel;
use crate::model::{AnalysisError, Result};

pub const CONFIG_ENV: &str = "SEISMIC_STACK_CONFIG";
pub const OUTPUT_DIR_ENV: &str = "SEISMIC_STACK_OUTPUT_DIR";
pub const DEFAULT_CONFIG_PATH: &str = "seismic_stack.toml";

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub masking: MaskConfig,
    #[serde(default, rename = "dataset")]
    pub datasets: Vec<DatasetConfig>,
}

/// One seismic parameter file to stack.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetConfig {
    /// Base name for every output file of this dataset.
    pub parameter: String,
    pub path: PathBuf,
    /// Station name, index, or list of either. All stations when absent.
    #[serde(default)]
    pub columns: Option<toml::Value>,
    /// Extrusion measurements to correlate the spatial mean against.
    #[serde(default)]
    pub extrusion: Option<PathBuf>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DatasetConfig {
    pub fn selector(&self) -> Result<Option<ColumnSelector>> {
        self.columns.as_ref().map(ColumnSelector::try_from).transpose()
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Read and validate the config file at `path`, then apply environment
    /// overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| AnalysisError::io(path, e))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        let mut config = Self::from_toml_str(&text, base_dir)?;
        config.apply_overrides(|key| env::var(key).ok());
        Ok(config)
    }

    /// Parse and validate config text, resolving relative paths against
    /// `base_dir`.
    pub fn from_toml_str(text: &str, base_dir: &Path) -> Result<Self> {
        let mut config: Config =
            toml::from_str(text).map_err(|e| AnalysisError::Config(e.to_string()))?;

        config.output_dir = resolve(base_dir, &config.output_dir);
        config.log_file = config.log_file.map(|p| resolve(base_dir, &p));
        for dataset in &mut config.datasets {
            dataset.path = resolve(base_dir, &dataset.path);
            dataset.extrusion = dataset.extrusion.as_ref().map(|p| resolve(base_dir, p));
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from `lookup` (normally the process environment).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(OUTPUT_DIR_ENV).filter(|d| !d.is_empty()) {
            self.output_dir = PathBuf::from(dir);
        }
    }

    pub fn log_level(&self) -> Result<LogLevel> {
        self.log_level.parse()
    }

    fn validate(&self) -> Result<()> {
        self.log_level()?;
        ButterworthLowPass::from_config(&self.filter)?;
        self.masking.validate()?;

        if self.datasets.is_empty() {
            return Err(AnalysisError::Config("no [[dataset]] entries".to_string()));
        }

        let mut seen = HashSet::new();
        for dataset in &self.datasets {
            if dataset.parameter.trim().is_empty() {
                return Err(AnalysisError::Config(format!(
                    "dataset {} has an empty parameter name",
                    dataset.path.display()
                )));
            }
            if !seen.insert(dataset.parameter.as_str()) {
                return Err(AnalysisError::Config(format!(
                    "parameter '{}' is listed more than once",
                    dataset.parameter
                )));
            }
            dataset.selector()?;
        }
        Ok(())
    }
}

/// Config file path: explicit argument, else `SEISMIC_STACK_CONFIG`, else
/// `seismic_stack.toml`.
pub fn config_path(explicit: Option<&str>) -> PathBuf {
    explicit
        .map(PathBuf::from)
        .or_else(|| env::var(CONFIG_ENV).ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn resolve(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
