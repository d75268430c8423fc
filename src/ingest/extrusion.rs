/// Lava-dome extrusion measurement reader
///
/// The measurement file is delimited text (comma, tab, or whitespace) with
/// a header line and one row per photography date:
///
/// ```text
/// date        total_volume_change  volume_change_rate  extruded_volume  extrusion_rate
/// 2004-10-04  10.0                 2.5                 5.0              1.2
/// ```
///
/// Lines starting with `#` are comments.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;

use crate::analysis::extrusion::{ExtrusionRecord, ExtrusionSeries};
use crate::model::{AnalysisError, Result};

const VALUE_FIELDS: [&str; 4] = [
    "total_volume_change",
    "volume_change_rate",
    "extruded_volume",
    "extrusion_rate",
];

/// Read extrusion measurements from `path`, sorted by date.
pub fn read_extrusion(path: &Path) -> Result<ExtrusionSeries> {
    let text = fs::read_to_string(path).map_err(|e| AnalysisError::io(path, e))?;
    parse_extrusion(&text)
}

/// Parse extrusion measurements from already-loaded text.
pub fn parse_extrusion(text: &str) -> Result<ExtrusionSeries> {
    let mut records = Vec::new();
    let mut seen_header = false;

    for (i, raw) in text.lines().enumerate() {
        let line = i + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if !seen_header {
            seen_header = true;
            continue;
        }

        let fields: Vec<&str> = trimmed
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|f| !f.is_empty())
            .collect();

        let date = fields
            .first()
            .and_then(|f| NaiveDate::parse_from_str(f, "%Y-%m-%d").ok())
            .ok_or_else(|| AnalysisError::InvalidTimestamp {
                line,
                value: fields.first().unwrap_or(&"").to_string(),
            })?;

        let mut values = [f64::NAN; 4];
        for (slot, column) in VALUE_FIELDS.iter().enumerate() {
            let cell = fields.get(slot + 1).copied().unwrap_or("");
            values[slot] = if cell.is_empty() {
                f64::NAN
            } else {
                cell.parse().map_err(|_| AnalysisError::NonNumericValue {
                    column: column.to_string(),
                    line,
                    value: cell.to_string(),
                })?
            };
        }

        records.push(ExtrusionRecord {
            date,
            total_volume_change: values[0],
            volume_change_rate: values[1],
            extruded_volume: values[2],
            extrusion_rate: values[3],
        });
    }

    Ok(ExtrusionSeries::new(records))
}
