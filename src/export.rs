/// CSV export of pipeline artifacts.
///
/// Every artifact of a dataset is written to
/// `<output_dir>/<parameter>_<suffix>.csv`. Missing values are written as
/// empty cells so the files read back with `ingest::csv_table::read_data`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::ingest::csv_table::TIME_COLUMN;
use crate::model::{AnalysisError, Result, Stat, StackedYearTable, TimeSeriesTable, YearlyParam};

/// Timestamp format of the `time` column in exported tables.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ---------------------------------------------------------------------------
// Artifact naming
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Artifact {
    /// Station mean per timestamp.
    StackSpace,
    /// Station mean with one column per year.
    StackSpaceYear,
    /// Max/min/mean/median per year.
    YearlyParam,
    /// Seasonal profile on the placeholder year.
    Seasonal,
    /// Input minus its seasonal profile.
    Deseasonalized,
    /// Low-passed station readings.
    Filtered,
}

impl Artifact {
    pub const ALL: [Artifact; 6] = [
        Artifact::StackSpace,
        Artifact::StackSpaceYear,
        Artifact::YearlyParam,
        Artifact::Seasonal,
        Artifact::Deseasonalized,
        Artifact::Filtered,
    ];

    pub fn suffix(&self) -> &'static str {
        match self {
            Artifact::StackSpace => "stack_space",
            Artifact::StackSpaceYear => "stack_space_year",
            Artifact::YearlyParam => "yearly_param",
            Artifact::Seasonal => "seasonal",
            Artifact::Deseasonalized => "deseasonalized",
            Artifact::Filtered => "filtered",
        }
    }
}

/// `<dir>/<parameter>_<suffix>.csv`
pub fn artifact_path(dir: &Path, parameter: &str, artifact: Artifact) -> PathBuf {
    dir.join(format!("{}_{}.csv", parameter, artifact.suffix()))
}

/// Creates `dir` and any missing parents.
pub fn ensure_output_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| AnalysisError::io(dir, e))
}

// ---------------------------------------------------------------------------
// Writers
// ---------------------------------------------------------------------------

fn cell(value: f64) -> String {
    if value.is_nan() { String::new() } else { value.to_string() }
}

fn writer(path: &Path) -> Result<csv::Writer<fs::File>> {
    let file = fs::File::create(path).map_err(|e| AnalysisError::io(path, e))?;
    Ok(csv::Writer::from_writer(file))
}

/// Writes a timestamp-indexed table with a leading `time` column.
pub fn write_table(path: &Path, table: &TimeSeriesTable) -> Result<()> {
    let mut out = writer(path)?;

    let mut header = vec![TIME_COLUMN.to_string()];
    header.extend(table.columns().iter().cloned());
    out.write_record(&header)?;

    for (r, ts) in table.index().iter().enumerate() {
        let mut record = vec![ts.format(TIME_FORMAT).to_string()];
        record.extend(table.row(r).into_iter().map(cell));
        out.write_record(&record)?;
    }

    out.flush().map_err(|e| AnalysisError::io(path, e))
}

/// Writes a year-stacked table: one `offset` label column, then one
/// column per year.
pub fn write_stacked_years(path: &Path, stack: &StackedYearTable) -> Result<()> {
    let mut out = writer(path)?;

    let mut header = vec!["offset".to_string()];
    header.extend(stack.years().iter().map(|y| y.to_string()));
    out.write_record(&header)?;

    let columns: Vec<&[f64]> = stack.iter_years().map(|(_, values)| values).collect();
    for (r, label) in stack.labels().iter().enumerate() {
        let mut record = vec![label.clone()];
        record.extend(columns.iter().map(|col| cell(col[r])));
        out.write_record(&record)?;
    }

    out.flush().map_err(|e| AnalysisError::io(path, e))
}

/// Writes the four statistic rows with one column per year.
pub fn write_yearly_param(path: &Path, param: &YearlyParam) -> Result<()> {
    let mut out = writer(path)?;

    let mut header = vec!["stat".to_string()];
    header.extend(param.years.iter().map(|y| y.to_string()));
    out.write_record(&header)?;

    for stat in Stat::ALL {
        let mut record = vec![stat.label().to_string()];
        record.extend(param.row(stat).iter().map(|&v| cell(v)));
        out.write_record(&record)?;
    }

    out.flush().map_err(|e| AnalysisError::io(path, e))
}

/// Writes `value` as pretty-printed JSON.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = fs::File::create(path).map_err(|e| AnalysisError::io(path, e))?;
    serde_json::to_writer_pretty(file, value)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
