/// File readers for the seismic stacking pipeline
///
/// - `csv_table`: station readings indexed by a `time` column
/// - `extrusion`: lava-dome extrusion measurements by photography date

pub mod csv_table;
pub mod extrusion;
