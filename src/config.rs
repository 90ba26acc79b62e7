use std::path::PathBuf;
use std::time::Duration;

use crate::cli::Cli;
use crate::destination::TargetEndpoint;
use crate::vk::{self, AlbumKind};

/// Resolved settings for one run.
pub struct Config {
    pub vk_id: String,
    pub vk_token: String,
    pub vk_base_url: String,
    pub album: AlbumKind,
    pub target: TargetEndpoint,
    pub deep: usize,
    pub output_dir: PathBuf,
    pub credentials_path: PathBuf,
    pub token_path: PathBuf,
    pub result_path: PathBuf,
    pub timeout: Duration,
    pub show_progress: bool,
    pub list_albums: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("vk_id", &self.vk_id)
            .field("vk_token", &"<redacted>")
            .field("vk_base_url", &self.vk_base_url)
            .field("album", &self.album)
            .field("target", &self.target)
            .field("deep", &self.deep)
            .field("output_dir", &self.output_dir)
            .finish_non_exhaustive()
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Config {
    /// Build the run configuration. `VK_API_BASE_URL` overrides the VK
    /// endpoint, e.g. for a proxy.
    pub fn from_cli(cli: Cli) -> Self {
        let vk_base_url =
            std::env::var("VK_API_BASE_URL").unwrap_or_else(|_| vk::DEFAULT_BASE_URL.into());

        Config {
            vk_id: cli.vk_id,
            vk_token: cli.vk_token,
            vk_base_url,
            album: cli.ttype,
            target: cli.target_endpoint,
            deep: cli.deep,
            output_dir: expand_tilde(&cli.output_dir),
            credentials_path: expand_tilde(&cli.credentials),
            token_path: expand_tilde(&cli.token_file),
            result_path: expand_tilde(&cli.result_file),
            timeout: Duration::from_secs(cli.timeout_secs),
            show_progress: !cli.no_progress_bar,
            list_albums: cli.list_albums,
        }
    }
}
