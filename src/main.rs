use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;

use sdd2dataset::{process_dataset, Args, FfmpegExtractor, VideoPlan};

fn main() -> ExitCode {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let dirname = PathBuf::from(&args.dataset_path);
    if !dirname.exists() {
        error!(
            "The specified dataset_path does not exist: {}",
            args.dataset_path
        );
        return ExitCode::FAILURE;
    }

    let plan = match VideoPlan::load(&args.plan) {
        Ok(plan) => plan,
        Err(e) => {
            error!("Failed to load video plan: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Starting the conversion of {} videos...", plan.len());

    let extractor = FfmpegExtractor::new(&args.ffmpeg);
    match process_dataset(&args, &plan, &extractor) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Failed to process dataset: {}", e);
            ExitCode::FAILURE
        }
    }
}
