use clap::Parser;
use log::{error, info};
use roilog::{CaptureLoop, StopReason};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Periodically OCR configured screen regions and log the readings to CSV.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Region config file, one `top,left,width,height` line per region
    #[arg(long, default_value = "rois.txt")]
    regions: PathBuf,

    /// CSV file the readings are appended to
    #[arg(long, default_value = "readings.csv")]
    log: PathBuf,

    /// Flag file polled for a cooperative stop request
    #[arg(long, default_value = "stop_logging.txt")]
    stop_flag: PathBuf,

    /// Delay between capture cycles, in milliseconds
    #[arg(long, default_value_t = 500)]
    interval_ms: u64,

    /// Directory containing tesseract traineddata (defaults to the
    /// executable's directory)
    #[arg(long)]
    tessdata: Option<PathBuf>,

    /// Tesseract language code
    #[arg(long, default_value = "eng")]
    language: String,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = interrupted.clone();
        if let Err(e) = ctrlc::set_handler(move || interrupted.store(true, Ordering::SeqCst)) {
            error!("failed to install interrupt handler: {}", e);
            return ExitCode::FAILURE;
        }
    }

    let mut capture_loop = CaptureLoop::new();
    capture_loop
        .set_regions_file(args.regions)
        .set_log_file(args.log)
        .set_stop_flag_file(args.stop_flag)
        .set_interval(Duration::from_millis(args.interval_ms))
        .set_language(args.language)
        .set_interrupt_flag(interrupted);
    if let Some(tessdata) = args.tessdata {
        capture_loop.set_tessdata_dir(tessdata);
    }

    match capture_loop.run() {
        Ok(StopReason::FlagHonored) => {
            info!("stopping capture process");
            ExitCode::SUCCESS
        }
        Ok(StopReason::Interrupted) => {
            info!("terminating due to interrupt");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
