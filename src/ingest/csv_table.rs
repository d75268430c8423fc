/// CSV Station Table Reader
///
/// Reads seismic parameter exports (RSAM, DSAR, RMS, PGA, ...) where one
/// column named `time` holds the timestamps and every other column holds
/// one station's readings. An optional column selector narrows the result
/// to specific stations.

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::model::{AnalysisError, Result, TimeSeriesTable};

/// Name of the mandatory timestamp column.
pub const TIME_COLUMN: &str = "time";

// ============================================================================
// Column Selection
// ============================================================================

/// Which data columns to keep. Indices count data columns only, so the
/// `time` column is never addressable by index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSelector {
    Name(String),
    Index(usize),
    NameList(Vec<String>),
    IndexList(Vec<usize>),
}

impl ColumnSelector {
    /// Resolves the selector against the data column names, in selector
    /// order.
    pub fn resolve(&self, columns: &[String]) -> Result<Vec<usize>> {
        let by_name = |name: &String| {
            columns
                .iter()
                .position(|c| c == name)
                .ok_or_else(|| AnalysisError::UnknownColumn(name.clone()))
        };
        let by_index = |index: &usize| {
            if *index < columns.len() {
                Ok(*index)
            } else {
                Err(AnalysisError::ColumnIndexOutOfRange {
                    index: *index,
                    available: columns.len(),
                })
            }
        };

        match self {
            ColumnSelector::Name(name) => Ok(vec![by_name(name)?]),
            ColumnSelector::Index(index) => Ok(vec![by_index(index)?]),
            ColumnSelector::NameList(names) => names.iter().map(by_name).collect(),
            ColumnSelector::IndexList(indices) => indices.iter().map(by_index).collect(),
        }
    }
}

impl TryFrom<&toml::Value> for ColumnSelector {
    type Error = AnalysisError;

    /// Accepts a string, a non-negative integer, or a homogeneous array of
    /// either. Floats, negative integers, empty arrays and mixed arrays are
    /// rejected.
    fn try_from(value: &toml::Value) -> Result<Self> {
        match value {
            toml::Value::String(name) => Ok(ColumnSelector::Name(name.clone())),
            toml::Value::Integer(i) => Ok(ColumnSelector::Index(non_negative(*i)?)),
            toml::Value::Array(items) => {
                if items.is_empty() {
                    Err(AnalysisError::InvalidColumnSelector(
                        "column list is empty".to_string(),
                    ))
                } else if items.iter().all(|v| v.is_str()) {
                    let names = items.iter().filter_map(|v| v.as_str()).map(String::from).collect();
                    Ok(ColumnSelector::NameList(names))
                } else if items.iter().all(|v| v.is_integer()) {
                    let indices = items
                        .iter()
                        .filter_map(|v| v.as_integer())
                        .map(non_negative)
                        .collect::<Result<_>>()?;
                    Ok(ColumnSelector::IndexList(indices))
                } else {
                    Err(AnalysisError::InvalidColumnSelector(
                        "column list should only contain strings or only integers".to_string(),
                    ))
                }
            }
            other => Err(AnalysisError::InvalidColumnSelector(format!(
                "expected a column name, index, or list, got {}",
                other.type_str()
            ))),
        }
    }
}

fn non_negative(i: i64) -> Result<usize> {
    usize::try_from(i)
        .map_err(|_| AnalysisError::InvalidColumnSelector(format!("column index {} is negative", i)))
}

// ============================================================================
// Reader
// ============================================================================

/// Read a station table from a CSV file
///
/// # Parameters
/// - `path`: CSV file with a header row containing `time`
/// - `selector`: optional subset of data columns; `None` keeps all of them
///
/// # Returns
/// Table indexed by the parsed `time` column with one column per selected
/// station. Timezone offsets are dropped, keeping wall-clock time. Empty
/// and `NaN` cells become missing values.
pub fn read_data(path: &Path, selector: Option<&ColumnSelector>) -> Result<TimeSeriesTable> {
    let file = File::open(path).map_err(|e| AnalysisError::io(path, e))?;
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);

    let headers = reader.headers()?.clone();
    let time_pos = headers
        .iter()
        .position(|h| h == TIME_COLUMN)
        .ok_or_else(|| AnalysisError::MissingTimeColumn { path: path.to_path_buf() })?;

    // (position in record, column name) for every data column
    let data_columns: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != time_pos)
        .map(|(i, h)| (i, h.to_string()))
        .collect();
    let names: Vec<String> = data_columns.iter().map(|(_, n)| n.clone()).collect();

    let selected: Vec<usize> = match selector {
        Some(sel) => sel.resolve(&names)?,
        None => (0..names.len()).collect(),
    };

    let mut index = Vec::new();
    let mut data: Vec<Vec<f64>> = vec![Vec::new(); selected.len()];

    for result in reader.records() {
        let record = result?;
        let line = record.position().map(|p| p.line() as usize).unwrap_or(0);

        let raw_time = record.get(time_pos).unwrap_or("");
        let ts = parse_timestamp(raw_time).ok_or_else(|| AnalysisError::InvalidTimestamp {
            line,
            value: raw_time.to_string(),
        })?;
        index.push(ts);

        for (slot, &col) in selected.iter().enumerate() {
            let (record_pos, name) = &data_columns[col];
            let cell = record.get(*record_pos).unwrap_or("");
            data[slot].push(parse_value(cell).ok_or_else(|| AnalysisError::NonNumericValue {
                column: name.clone(),
                line,
                value: cell.to_string(),
            })?);
        }
    }

    let columns = selected.iter().map(|&c| names[c].clone()).collect();
    TimeSeriesTable::new(index, columns, data)
}

/// Parse a timestamp, dropping any offset and keeping the wall-clock time.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.naive_local());
    }

    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, format) {
            return Some(ts);
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(chrono::NaiveTime::MIN))
}

/// Empty cells and `nan` spellings are missing; anything else must be a number.
fn parse_value(cell: &str) -> Option<f64> {
    if cell.is_empty() {
        return Some(f64::NAN);
    }
    cell.parse::<f64>().ok()
}

// ============================================================================
// Tests
// ============================================================================
