use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use clap::Parser;

use river_route::config::load_config;
use river_route::driver::run;
use river_route::error::report_error;

#[derive(Parser)]
#[command(name = "river-route")]
#[command(about = "Matrix-based Muskingum river discharge routing")]
#[command(version)]
struct Cli {
    /// Path to the YAML namelist describing this run
    #[arg(short = 'n', long = "namelist", alias = "nl")]
    namelist: PathBuf,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = match load_config(&cli.namelist) {
        Ok(c) => c,
        Err(e) => {
            report_error(&e);
            return ExitCode::FAILURE;
        }
    };

    // No interactive session hands this run a cancellation request, so the
    // flag stays unset for the lifetime of the process; `run` still takes
    // it by `Arc` so the same driver also serves callers (e.g. a future
    // stdio session) that do set it from another thread.
    let cancel = Arc::new(AtomicBool::new(false));

    match run(&config, cancel) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e);
            ExitCode::FAILURE
        }
    }
}
