/// End-to-end tests for the batch pipeline
///
/// These tests verify:
/// 1. A multi-year, multi-station CSV goes through every stage and all
///    artifacts land in the output directory
/// 2. A failing dataset is recorded in the batch report without stopping
///    the others
/// 3. The extrusion correlation is taken on the deseasonalized residual,
///    not on the raw readings
/// 4. Stacking in space drops February 29 and lines years up by offset
///
/// Everything runs against scratch directories; no network or fixtures.

use std::fs;
use std::path::Path;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use tempfile::tempdir;

use seismic_stack::analysis::spatial::{stack_in_space, SPATIAL_MEAN_COLUMN};
use seismic_stack::analysis::yearly::yearly_params;
use seismic_stack::config::Config;
use seismic_stack::export::{artifact_path, Artifact};
use seismic_stack::ingest::csv_table::read_data;
use seismic_stack::ingest::extrusion::read_extrusion;
use seismic_stack::model::{AnalysisError, Stat};
use seismic_stack::pipeline::{self, DatasetOutcome, BATCH_REPORT_FILE};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

fn day(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
}

/// Writes a daily station CSV with `days` rows from `start`. Station `k`
/// reads `k + day number`, and EDM is missing every fifth day.
fn write_daily_csv(path: &Path, start: NaiveDateTime, days: i64) {
    let mut text = String::from("time,SEP,YEL,EDM\n");
    for d in 0..days {
        let ts = start + Duration::days(d);
        let edm = if d % 5 == 0 { String::new() } else { (3 + d).to_string() };
        text.push_str(&format!(
            "{}+00:00,{},{},{}\n",
            ts.format("%Y-%m-%d %H:%M:%S"),
            1 + d,
            2 + d,
            edm
        ));
    }
    fs::write(path, text).unwrap();
}

/// Writes two years of daily readings from 2005-01-01 that fall steadily
/// through each calendar year. In 2006 only, a step anomaly of 0, 10 and
/// 20 is added over the three 30-day intervals starting March 1.
fn write_seasonal_csv(path: &Path) {
    let mut text = String::from("time,SEP,YEL,EDM\n");
    for d in 0..730 {
        let ts = day(2005, 1, 1) + Duration::days(d);
        let doy = ts.ordinal0() as f64;
        let mut value = 5000.5 - 10.0 * doy;
        if ts.year() == 2006 && (59..149).contains(&ts.ordinal0()) {
            value += 10.0 * ((ts.ordinal0() - 59) / 30) as f64;
        }
        text.push_str(&format!(
            "{},{},{},{}\n",
            ts.format("%Y-%m-%d %H:%M:%S"),
            value,
            value + 1.0,
            value + 2.0
        ));
    }
    fs::write(path, text).unwrap();
}

fn write_extrusion(path: &Path, year: i32) {
    let text = format!(
        "# dome growth\n\
         date total_volume_change volume_change_rate extruded_volume extrusion_rate\n\
         {year}-03-01 10 1 10 1\n\
         {year}-03-31 20 2 20 2\n\
         {year}-04-30 40 3 40 3\n\
         {year}-05-30 70 4 70 4\n"
    );
    fs::write(path, text).unwrap();
}

fn line_count(path: &Path) -> usize {
    fs::read_to_string(path).unwrap().lines().count()
}

// ---------------------------------------------------------------------------
// Full batch
// ---------------------------------------------------------------------------

#[test]
fn test_batch_writes_every_artifact_and_isolates_failures() {
    let dir = tempdir().unwrap();
    write_daily_csv(&dir.path().join("rsam.csv"), day(2005, 1, 1), 730);
    // Ends in early February, so 2006 is shorter than 2005.
    write_daily_csv(&dir.path().join("dsar.csv"), day(2005, 1, 1), 400);
    write_extrusion(&dir.path().join("extrusion.txt"), 2005);

    let text = r#"
output_dir = "out"

[masking]
enabled = false

[[dataset]]
parameter = "rsam"
path = "rsam.csv"
columns = ["SEP", "YEL", "EDM"]
extrusion = "extrusion.txt"

[[dataset]]
parameter = "dsar"
path = "dsar.csv"

[[dataset]]
parameter = "pga"
path = "missing.csv"
"#;
    let config = Config::from_toml_str(text, dir.path()).unwrap();
    let out = dir.path().join("out");

    let report = pipeline::run_batch(&config).unwrap();

    assert_eq!(report.datasets.len(), 3);
    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.failed(), 2);

    match &report.datasets[0] {
        DatasetOutcome::Succeeded(r) => {
            assert_eq!(r.years, vec![2005, 2006]);
            assert_eq!(r.rows, 730);
            assert_eq!(r.outputs.len(), Artifact::ALL.len());
            // Residuals of a linear ramp are constant within 2005, so there
            // is no variance to correlate.
            assert_eq!(r.extrusion_correlation, None);
        }
        other => panic!("rsam should succeed: {other:?}"),
    }
    match &report.datasets[1] {
        DatasetOutcome::Failed(f) => {
            assert_eq!(f.stage, "STACK-SPACE");
            assert_eq!(f.failure_type, "EXPECTED");
        }
        other => panic!("dsar should fail: {other:?}"),
    }
    match &report.datasets[2] {
        DatasetOutcome::Failed(f) => {
            assert_eq!(f.stage, "INGEST");
            assert_eq!(f.failure_type, "UNEXPECTED");
        }
        other => panic!("pga should fail: {other:?}"),
    }

    for artifact in Artifact::ALL {
        assert!(artifact_path(&out, "rsam", artifact).is_file(), "{:?} missing", artifact);
    }
    assert!(!artifact_path(&out, "dsar", Artifact::YearlyParam).exists());

    assert_eq!(line_count(&artifact_path(&out, "rsam", Artifact::StackSpaceYear)), 366);
    assert_eq!(line_count(&artifact_path(&out, "rsam", Artifact::YearlyParam)), 5);
    assert_eq!(line_count(&artifact_path(&out, "rsam", Artifact::Filtered)), 731);

    let seasonal = read_data(&artifact_path(&out, "rsam", Artifact::Seasonal), None).unwrap();
    assert_eq!(seasonal.len(), 365);
    assert_eq!(seasonal.index()[0], day(2000, 1, 1));

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join(BATCH_REPORT_FILE)).unwrap()).unwrap();
    assert_eq!(json["datasets"].as_array().unwrap().len(), 3);
    assert_eq!(json["datasets"][0]["status"], "succeeded");
    assert_eq!(json["datasets"][2]["status"], "failed");
}

#[test]
fn test_deseasonalized_output_matches_input_shape() {
    let dir = tempdir().unwrap();
    write_daily_csv(&dir.path().join("rms.csv"), day(2005, 1, 1), 730);
    let text = "[[dataset]]\nparameter = \"rms\"\npath = \"rms.csv\"\ncolumns = 0\n";
    let config = Config::from_toml_str(text, dir.path()).unwrap();

    let report = pipeline::run_batch(&config).unwrap();
    assert_eq!(report.failed(), 0);

    let out = dir.path().join("output");
    let input = read_data(&dir.path().join("rms.csv"), None).unwrap();
    let residual = read_data(&artifact_path(&out, "rms", Artifact::Deseasonalized), None).unwrap();
    assert_eq!(residual.columns(), &["SEP"]);
    assert_eq!(residual.index(), input.index());

    // SEP climbs by exactly 365 between matching days of 2005 and 2006.
    let sep = residual.column("SEP").unwrap();
    assert!((sep[0] + 182.5).abs() < 1e-9);
    assert!((sep[365] - 182.5).abs() < 1e-9);
}

// ---------------------------------------------------------------------------
// Extrusion correlation
// ---------------------------------------------------------------------------

#[test]
fn test_extrusion_correlation_uses_deseasonalized_residual() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("rsam.csv");
    let extrusion = dir.path().join("extrusion.txt");
    write_seasonal_csv(&input);
    write_extrusion(&extrusion, 2006);

    let text = "[[dataset]]\nparameter = \"rsam\"\npath = \"rsam.csv\"\nextrusion = \"extrusion.txt\"\n";
    let config = Config::from_toml_str(text, dir.path()).unwrap();
    let report = pipeline::run_batch(&config).unwrap();

    let residual_r = match &report.datasets[0] {
        DatasetOutcome::Succeeded(r) => r.extrusion_correlation.expect("three intervals overlap 2006"),
        other => panic!("rsam should succeed: {other:?}"),
    };
    // The seasonal fall cancels between years; only the 2006 step is left.
    assert!((residual_r - 1.0).abs() < 1e-9, "residual r = {residual_r}");

    // On the raw readings the seasonal fall outweighs the step.
    let table = read_data(&input, None).unwrap();
    let spatial = stack_in_space(&table).unwrap();
    let raw_r = read_extrusion(&extrusion)
        .unwrap()
        .correlate_with(&spatial.spatial_mean, SPATIAL_MEAN_COLUMN)
        .unwrap();
    assert!((raw_r + 1.0).abs() < 1e-9, "raw r = {raw_r}");
}

// ---------------------------------------------------------------------------
// Leap years
// ---------------------------------------------------------------------------

#[test]
fn test_hundred_days_of_2004_stack_into_one_year_without_leap_day() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pga.csv");
    write_daily_csv(&path, day(2004, 1, 1), 100);

    let table = read_data(&path, None).unwrap();
    let stack = stack_in_space(&table).unwrap();

    assert_eq!(stack.by_year.years(), &[2004]);
    assert_eq!(stack.by_year.len(), 99);
    assert!(stack.spatial_mean.index().iter().all(|ts| ts.format("%m-%d").to_string() != "02-29"));
    assert!(!stack.by_year.labels().iter().any(|l| l.starts_with("02/29")));

    let param = yearly_params(&stack.by_year);
    assert_eq!(param.years, vec![2004]);
    assert!(param.get(Stat::Max, 2004).unwrap() > param.get(Stat::Min, 2004).unwrap());
}

#[test]
fn test_partial_second_year_is_a_length_mismatch() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("rsam.csv");
    write_daily_csv(&path, day(2005, 1, 1), 400);

    let table = read_data(&path, None).unwrap();
    match stack_in_space(&table) {
        Err(AnalysisError::YearLengthMismatch { year, expected, found }) => {
            assert_eq!(year, 2006);
            assert_eq!(expected, 365);
            assert_eq!(found, 35);
        }
        other => panic!("expected a year length mismatch, got {other:?}"),
    }
}
