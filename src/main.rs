use std::process::ExitCode;

use seismic_stack::config::{self, Config};
use seismic_stack::logging::{self, Stage};
use seismic_stack::pipeline;

fn main() -> ExitCode {
    dotenv::dotenv().ok();

    let arg = std::env::args().nth(1);
    let path = config::config_path(arg.as_deref());

    let config = match Config::load(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("✗ Failed to load {}: {}", path.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let level = match config.log_level() {
        Ok(level) => level,
        Err(e) => {
            eprintln!("✗ {}", e);
            return ExitCode::FAILURE;
        }
    };
    let log_file = config.log_file.as_ref().map(|p| p.to_string_lossy().into_owned());
    logging::init_logger(level, log_file.as_deref(), false);

    logging::info(
        Stage::System,
        None,
        &format!("Stacking {} dataset(s) from {}", config.datasets.len(), path.display()),
    );

    match pipeline::run_batch(&config) {
        Ok(report) => {
            pipeline::print_summary(&report);
            if report.failed() == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            logging::error(Stage::Export, None, &format!("could not write batch report: {}", e));
            ExitCode::FAILURE
        }
    }
}
