use clap::Parser;
use std::path::PathBuf;

// Build version with engine info
const VERSION_INFO: &str = const_format::concatcp!(
    env!("CARGO_PKG_VERSION"), "\n",
    "Engine: simulated (virtual clock)\n",
    "Target: ", std::env::consts::ARCH, "-", std::env::consts::OS
);

/// Headless video-player control surface running against a simulated engine
#[derive(Parser, Debug)]
#[command(author, version = VERSION_INFO, about, long_about = None)]
pub struct Args {
    /// Media locator to load
    #[arg(value_name = "LOCATOR", default_value = "sim://sample")]
    pub locator: String,

    /// Media duration in seconds
    #[arg(short = 'd', long = "duration", value_name = "SECONDS", default_value_t = 120.0)]
    pub duration: f64,

    /// Resolve the source as not playable
    #[arg(long = "unplayable")]
    pub unplayable: bool,

    /// Make metadata loading fail
    #[arg(long = "fail-load")]
    pub fail_load: bool,

    /// Length of the simulated session
    #[arg(short = 'r', long = "run", value_name = "SECONDS", default_value_t = 10.0)]
    pub run_secs: f64,

    /// Virtual clock step
    #[arg(long = "step-ms", value_name = "MS", default_value_t = 50)]
    pub step_ms: u64,

    /// Scrub to this fraction of the duration (0.0..=1.0)
    #[arg(long = "scrub-to", value_name = "FRACTION")]
    pub scrub_to: Option<f32>,

    /// Session time at which the scrub happens
    #[arg(long = "scrub-at", value_name = "SECONDS", default_value_t = 1.0)]
    pub scrub_at: f64,

    /// Loop playback (overrides settings)
    #[arg(short = 'o', long = "loop")]
    pub loop_playback: bool,

    /// Send the app to background at this session time (and back 1s later)
    #[arg(long = "background-at", value_name = "SECONDS")]
    pub background_at: Option<f64>,

    /// Enable debug logging to file (default: vidctl.log)
    #[arg(short = 'l', long = "log", value_name = "LOG_FILE")]
    pub log_file: Option<Option<PathBuf>>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,

    /// Custom configuration directory (overrides default platform paths)
    #[arg(short = 'c', long = "config-dir", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,
}
