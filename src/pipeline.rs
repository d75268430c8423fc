/// Batch Runner
///
/// Runs every configured dataset through the stacking pipeline:
///
/// ```text
/// ingest -> [mask] -> filter -> stack in time -> stack in space
///        -> yearly statistics -> [residual vs extrusion correlation] -> export
/// ```
///
/// The extrusion correlation uses the deseasonalized residual averaged
/// across stations, not the raw spatial mean.
///
/// Datasets are isolated: a failure is classified, logged and recorded in
/// the batch report, and the next dataset still runs.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::analysis::filter::filter_table;
use crate::analysis::masking::{mask_table, MaskConfig};
use crate::analysis::seasonal::{stack_in_time, RESIDUAL_MEAN_COLUMN};
use crate::analysis::spatial::stack_in_space;
use crate::analysis::yearly::yearly_params;
use crate::config::{Config, DatasetConfig};
use crate::export::{self, artifact_path, Artifact};
use crate::ingest::csv_table::read_data;
use crate::ingest::extrusion::read_extrusion;
use crate::logging::{self, classify_failure, FailureType, Stage};
use crate::model::{AnalysisError, Result, TimeSeriesTable};
use crate::stations::find_station;

/// File name of the JSON batch summary inside the output directory.
pub const BATCH_REPORT_FILE: &str = "batch_report.json";

// ============================================================================
// Reports
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct DatasetReport {
    pub parameter: String,
    pub input: PathBuf,
    pub rows: usize,
    pub stations: Vec<String>,
    /// Columns whose transient peak was masked.
    pub masked_stations: Vec<String>,
    pub years: Vec<i32>,
    /// Pearson correlation of the station-mean deseasonalized residual with
    /// extrusion rate.
    pub extrusion_correlation: Option<f64>,
    pub outputs: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetFailure {
    pub parameter: String,
    pub input: PathBuf,
    pub stage: String,
    pub failure_type: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DatasetOutcome {
    Succeeded(DatasetReport),
    Failed(DatasetFailure),
}

impl DatasetOutcome {
    pub fn parameter(&self) -> &str {
        match self {
            DatasetOutcome::Succeeded(r) => &r.parameter,
            DatasetOutcome::Failed(f) => &f.parameter,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, DatasetOutcome::Succeeded(_))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub output_dir: PathBuf,
    pub datasets: Vec<DatasetOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.datasets.iter().filter(|d| d.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.datasets.len() - self.succeeded()
    }
}

/// An error tagged with the stage it came from.
#[derive(Debug)]
pub struct StageError {
    pub stage: Stage,
    pub error: AnalysisError,
}

trait AtStage<T> {
    fn at(self, stage: Stage) -> std::result::Result<T, StageError>;
}

impl<T> AtStage<T> for Result<T> {
    fn at(self, stage: Stage) -> std::result::Result<T, StageError> {
        self.map_err(|error| StageError { stage, error })
    }
}

// ============================================================================
// Single dataset
// ============================================================================

/// Run one dataset end to end, writing its artifacts into `config.output_dir`.
pub fn run_dataset(dataset: &DatasetConfig, config: &Config) -> std::result::Result<DatasetReport, StageError> {
    let name = dataset.parameter.as_str();
    let out_dir = config.output_dir.as_path();

    let selector = dataset.selector().at(Stage::Ingest)?;
    let raw = read_data(&dataset.path, selector.as_ref()).at(Stage::Ingest)?;
    logging::info(
        Stage::Ingest,
        Some(name),
        &format!("{} rows x {} stations from {}", raw.len(), raw.width(), dataset.path.display()),
    );
    describe_stations(name, &raw);

    let (table, masked_stations) = apply_masking(&raw, &config.masking).at(Stage::Mask)?;

    let filtered = filter_table(&table, &config.filter).at(Stage::Filter)?;

    let seasonal = stack_in_time(&table).at(Stage::StackTime)?;
    logging::debug(
        Stage::StackTime,
        Some(name),
        &format!("seasonal profile has {} calendar positions", seasonal.profile.len()),
    );

    let spatial = stack_in_space(&table).at(Stage::StackSpace)?;
    let years = spatial.by_year.years().to_vec();
    logging::info(
        Stage::StackSpace,
        Some(name),
        &format!("{} years x {} offsets", years.len(), spatial.by_year.len()),
    );

    let param = yearly_params(&spatial.by_year);
    for (i, year) in param.years.iter().enumerate() {
        logging::debug(
            Stage::Statistics,
            Some(name),
            &format!("{}: mean {:.3}, median {:.3}", year, param.mean[i], param.median[i]),
        );
    }

    let extrusion_correlation = match &dataset.extrusion {
        Some(path) => {
            let series = read_extrusion(path).at(Stage::Correlate)?;
            let residual = seasonal.residual_mean().at(Stage::Correlate)?;
            let r = series.correlate_with(&residual, RESIDUAL_MEAN_COLUMN);
            match r {
                Some(r) => logging::info(Stage::Correlate, Some(name), &format!("r = {:.3}", r)),
                None => logging::warn(
                    Stage::Correlate,
                    Some(name),
                    "too few overlapping extrusion intervals to correlate",
                ),
            }
            r
        }
        None => None,
    };

    export::ensure_output_dir(out_dir).at(Stage::Export)?;
    let mut outputs = Vec::with_capacity(Artifact::ALL.len());
    for artifact in Artifact::ALL {
        let path = artifact_path(out_dir, name, artifact);
        let written = match artifact {
            Artifact::StackSpace => export::write_table(&path, &spatial.spatial_mean),
            Artifact::StackSpaceYear => export::write_stacked_years(&path, &spatial.by_year),
            Artifact::YearlyParam => export::write_yearly_param(&path, &param),
            Artifact::Seasonal => export::write_table(&path, &seasonal.profile),
            Artifact::Deseasonalized => export::write_table(&path, &seasonal.residual),
            Artifact::Filtered => export::write_table(&path, &filtered),
        };
        written.at(Stage::Export)?;
        outputs.push(path);
    }

    Ok(DatasetReport {
        parameter: name.to_string(),
        input: dataset.path.clone(),
        rows: raw.len(),
        stations: raw.columns().to_vec(),
        masked_stations,
        years,
        extrusion_correlation,
        outputs,
    })
}

fn apply_masking(table: &TimeSeriesTable, config: &MaskConfig) -> Result<(TimeSeriesTable, Vec<String>)> {
    if !config.enabled {
        return Ok((table.clone(), Vec::new()));
    }
    let masked = mask_table(table, config)?;
    let changed = table
        .columns()
        .iter()
        .enumerate()
        .filter(|(c, _)| {
            let before = table.column_at(*c);
            let after = masked.column_at(*c);
            before.iter().zip(after).any(|(b, a)| !b.is_nan() && a.is_nan())
        })
        .map(|(_, name)| name.clone())
        .collect();
    Ok((masked, changed))
}

fn describe_stations(dataset: &str, table: &TimeSeriesTable) {
    for column in table.columns() {
        match find_station(column) {
            Some(station) => logging::debug(
                Stage::Ingest,
                Some(dataset),
                &format!(
                    "{} ({}) {:.1} km from the crater: {}",
                    station.code,
                    station.name,
                    station.distance_to_crater(),
                    station.description
                ),
            ),
            None => logging::debug(Stage::Ingest, Some(dataset), &format!("column '{}' is not a registered station", column)),
        }
    }
}

// ============================================================================
// Batch
// ============================================================================

/// Run every dataset in `config`, write `batch_report.json` and return the
/// report. Only a failure to write the report itself is an error.
pub fn run_batch(config: &Config) -> Result<BatchReport> {
    let started_at = Utc::now();
    let mut datasets = Vec::with_capacity(config.datasets.len());

    for dataset in &config.datasets {
        logging::info(Stage::System, Some(&dataset.parameter), "starting");
        let outcome = match run_dataset(dataset, config) {
            Ok(report) => DatasetOutcome::Succeeded(report),
            Err(StageError { stage, error }) => {
                logging::log_dataset_failure(&dataset.parameter, stage, &error);
                DatasetOutcome::Failed(DatasetFailure {
                    parameter: dataset.parameter.clone(),
                    input: dataset.path.clone(),
                    stage: stage.to_string(),
                    failure_type: classify_failure(&error).to_string(),
                    error: error.to_string(),
                })
            }
        };
        datasets.push(outcome);
    }

    let report = BatchReport {
        started_at,
        finished_at: Utc::now(),
        output_dir: config.output_dir.clone(),
        datasets,
    };
    logging::log_batch_summary(report.datasets.len(), report.succeeded(), report.failed());

    write_report(&config.output_dir, &report)?;
    Ok(report)
}

fn write_report(out_dir: &Path, report: &BatchReport) -> Result<()> {
    export::ensure_output_dir(out_dir)?;
    export::write_json(&out_dir.join(BATCH_REPORT_FILE), report)
}

// ============================================================================
// Console summary
// ============================================================================

pub fn print_summary(report: &BatchReport) {
    println!("\n═══════════════════════════════════════════════════════════");
    println!("SEISMIC STACKING SUMMARY");
    println!("═══════════════════════════════════════════════════════════");
    println!();

    for outcome in &report.datasets {
        match outcome {
            DatasetOutcome::Succeeded(r) => {
                let years = match (r.years.first(), r.years.last()) {
                    (Some(first), Some(last)) => format!("{}-{}", first, last),
                    _ => "-".to_string(),
                };
                let corr = r
                    .extrusion_correlation
                    .map(|c| format!(", residual/extrusion r = {:.3}", c))
                    .unwrap_or_default();
                println!("✓ {:<12} {} stations, years {}{}", r.parameter, r.stations.len(), years, corr);
            }
            DatasetOutcome::Failed(f) => {
                let marker = if f.failure_type == FailureType::Expected.to_string() { "⚠" } else { "✗" };
                println!("{} {:<12} [{}] {}", marker, f.parameter, f.stage, f.error);
            }
        }
    }

    println!();
    println!(
        "Datasets: {}/{} succeeded  ({} failed)",
        report.succeeded(),
        report.datasets.len(),
        report.failed()
    );
    println!("Output:   {}", report.output_dir.display());
    println!("═══════════════════════════════════════════════════════════");
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn daily_table(values: Vec<f64>) -> TimeSeriesTable {
        let start = NaiveDate::from_ymd_opt(2005, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let index = (0..values.len() as i64).map(|d| start + Duration::days(d)).collect();
        TimeSeriesTable::from_series(index, "SEP", values).unwrap()
    }

    #[test]
    fn test_masking_disabled_passes_table_through() {
        let table = daily_table(vec![0.0, 5.0, 0.0]);
        let (out, masked) = apply_masking(&table, &MaskConfig::default()).unwrap();
        assert!(out.bitwise_eq(&table));
        assert!(masked.is_empty());
    }

    #[test]
    fn test_masking_reports_changed_columns() {
        let mut values = vec![0.0; 30];
        values[15] = 9.0;
        let table = daily_table(values);
        let config = MaskConfig { enabled: true, margin: 1, ..MaskConfig::default() };

        let (out, masked) = apply_masking(&table, &config).unwrap();
        assert_eq!(masked, vec!["SEP".to_string()]);
        assert!(out.column("SEP").unwrap()[15].is_nan());
    }

    #[test]
    fn test_stage_tagging() {
        let err: Result<()> = Err(AnalysisError::EmptyInput("nothing"));
        let tagged = err.at(Stage::StackSpace).unwrap_err();
        assert_eq!(tagged.stage, Stage::StackSpace);
        assert_eq!(classify_failure(&tagged.error), FailureType::Expected);
    }

    #[test]
    fn test_report_counts() {
        let failure = DatasetOutcome::Failed(DatasetFailure {
            parameter: "pga".into(),
            input: PathBuf::from("PGA.csv"),
            stage: Stage::Ingest.to_string(),
            failure_type: FailureType::Unexpected.to_string(),
            error: "boom".into(),
        });
        let report = BatchReport {
            started_at: Utc::now(),
            finished_at: Utc::now(),
            output_dir: PathBuf::from("out"),
            datasets: vec![failure],
        };
        assert_eq!(report.succeeded(), 0);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.datasets[0].parameter(), "pga");

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["datasets"][0]["status"], "failed");
        assert_eq!(json["datasets"][0]["stage"], "INGEST");
    }
}
