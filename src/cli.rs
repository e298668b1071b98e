//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use olyshare_core::transport::constants::{
    CONNECT_TIMEOUT_SECS, DEFAULT_CAMERA_URL, DEFAULT_IMAGE_DIR, READ_TIMEOUT_SECS,
};
use olyshare_core::{DEFAULT_RETENTION_DAYS, DEFAULT_WORKERS};

/// Import recent photos from a Wi-Fi camera.
///
/// Lists the camera's image folder, skips files already in the output
/// directory, downloads the rest newest first and stops at the first file
/// older than the retention window.
#[derive(Parser, Debug)]
#[command(name = "olyshare")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Camera base URL
    #[arg(long, default_value = DEFAULT_CAMERA_URL)]
    pub cam_ip: String,

    /// Image folder on the camera
    #[arg(long, default_value = DEFAULT_IMAGE_DIR)]
    pub image_dir: String,

    /// Directory for cached camera responses
    #[arg(long, default_value = ".cache")]
    pub cache_dir: PathBuf,

    /// Disable the response cache
    #[arg(long)]
    pub no_cache: bool,

    /// Directory imported files are written to
    #[arg(long, default_value = "output")]
    pub out_dir: PathBuf,

    /// Import files captured within this many days (0 or less imports everything)
    #[arg(long, default_value_t = DEFAULT_RETENTION_DAYS, allow_negative_numbers = true)]
    pub copy_days: i64,

    /// Concurrent import workers (values outside 1-4 are clamped)
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    pub import_routines: usize,

    /// Skip movie files (QuickTime, AVI)
    #[arg(long)]
    pub skip_movie: bool,

    /// Skip raw files (ORF)
    #[arg(long)]
    pub skip_raw: bool,

    /// Skip files with this content type (repeatable)
    #[arg(long = "skip-type", value_name = "MIME")]
    pub skip_types: Vec<String>,

    /// Skip files without a readable capture time instead of failing
    #[arg(long)]
    pub skip_undated: bool,

    /// HTTP connect timeout in seconds (1-3600)
    #[arg(long, default_value_t = CONNECT_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub connect_timeout: u64,

    /// HTTP request timeout in seconds (1-3600)
    #[arg(long, default_value_t = READ_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub read_timeout: u64,

    /// Config file (defaults to $XDG_CONFIG_HOME/olyshare/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}
