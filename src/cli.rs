use clap::Parser;

use crate::destination::TargetEndpoint;
use crate::vk::AlbumKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "vk-photo-backup", about = "Backup photo to local or Google disk")]
pub struct Cli {
    /// VK user ID or screen name
    #[arg(long)]
    pub vk_id: String,

    /// VK access token
    #[arg(long, env = "VK_TOKEN", hide_env_values = true)]
    pub vk_token: String,

    /// Save photos to local or Google disk
    #[arg(long, alias = "target_endpoint", value_enum, default_value = "local")]
    pub target_endpoint: TargetEndpoint,

    /// Count of last photos to save
    #[arg(long, default_value_t = 5)]
    pub deep: usize,

    /// Photo collection: wall, profile or a numeric album id
    #[arg(long, default_value = "profile", allow_hyphen_values = true)]
    pub ttype: AlbumKind,

    /// Base directory for the run folder and the upload staging folder
    #[arg(long, default_value = ".")]
    pub output_dir: String,

    /// OAuth client secrets for Google Drive
    #[arg(long, default_value = "credentials.json")]
    pub credentials: String,

    /// Where the Google OAuth token is kept between runs
    #[arg(long, default_value = "token.json")]
    pub token_file: String,

    /// Transfer report written at the end of a run
    #[arg(long, default_value = "result.json")]
    pub result_file: String,

    /// Per-request timeout for all HTTP calls
    #[arg(long, default_value_t = 60)]
    pub timeout_secs: u64,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Disable progress bar
    #[arg(long)]
    pub no_progress_bar: bool,

    /// Print the user's albums and exit
    #[arg(long)]
    pub list_albums: bool,
}
