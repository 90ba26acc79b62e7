// Entrypoint for the backup CLI.
// - Parses arguments, sets up logging and picks the destination once.
// - Returns `anyhow::Result`: setup failures exit non-zero, a completed run
//   exits 0 even when nothing was transferred.

use anyhow::Context;
use clap::Parser;
use reqwest::blocking::Client;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use vk_photo_backup::cli::Cli;
use vk_photo_backup::config::Config;
use vk_photo_backup::destination::{Destination, GoogleDrive, LocalFolder, TargetEndpoint};
use vk_photo_backup::oauth::GoogleSession;
use vk_photo_backup::pipeline::{self, RunContext};
use vk_photo_backup::ui;
use vk_photo_backup::vk::VkClient;

fn list_albums(vk: &mut VkClient) -> anyhow::Result<()> {
    let owner = vk.resolve_owner().context("Failed to fetch user info")?;
    let status = match vk.status() {
        Ok(status) => Some(status),
        Err(e) => {
            tracing::warn!("Failed to fetch status: {}", e);
            None
        }
    };
    let albums = vk.albums().context("Failed to fetch albums")?;
    ui::print_albums(owner.as_ref(), status.as_ref(), &albums);
    Ok(())
}

fn build_destination(config: &Config, ctx: &RunContext) -> anyhow::Result<Box<dyn Destination>> {
    let folder_name = ctx.folder_name();
    match config.target {
        TargetEndpoint::Local => Ok(Box::new(LocalFolder::new(&config.output_dir, &folder_name))),
        TargetEndpoint::Google => {
            let http = Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .timeout(config.timeout)
                .build()
                .context("Failed to build HTTP client")?;
            let session = GoogleSession::connect(http, &config.credentials_path, &config.token_path)
                .context("Google authorization failed")?;
            Ok(Box::new(GoogleDrive::new(session, &config.output_dir, &folder_name)))
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_filter())),
        )
        .init();

    let config = Config::from_cli(cli);
    tracing::debug!("{:?}", config);

    let mut vk = VkClient::new(
        &config.vk_base_url,
        &config.vk_token,
        &config.vk_id,
        config.album,
        config.timeout,
    )
    .context("Failed to build VK client")?;

    if config.list_albums {
        return list_albums(&mut vk);
    }

    match vk.resolve_owner() {
        Ok(Some(user)) => tracing::info!(
            "Backing up {} photos of {} {}",
            config.album,
            user.first_name,
            user.last_name
        ),
        Ok(None) => tracing::warn!("VK user {} not found", config.vk_id),
        Err(e) => tracing::warn!("Failed to fetch user info: {}", e),
    }

    let mut ctx = RunContext::new(config.deep, config.result_path.clone());
    ctx.show_progress = config.show_progress;

    let mut destination = build_destination(&config, &ctx)?;
    let results = pipeline::run(&ctx, &vk, destination.as_mut()).context("Backup failed")?;

    tracing::info!(
        "Transferred {} photo(s) to {}",
        results.len(),
        destination.describe()
    );
    Ok(())
}
