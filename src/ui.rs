// Terminal output: the transfer progress bar and the few listings printed
// for the user. Diagnostics go through `tracing`; only what the user asked
// to see is printed to stdout.

use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;

use crate::destination::google::DriveFile;
use crate::vk::{Album, Status, User};

/// Progress bar over the transfer loop. Hidden when disabled or when stdout
/// is not a terminal.
pub fn transfer_progress(enabled: bool, total: u64) -> ProgressBar {
    if !enabled || !std::io::stdout().is_terminal() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}") {
        pb.set_style(style.progress_chars("=> "));
    }
    pb
}

pub fn print_authorization_prompt(url: &str) {
    println!("Please visit this URL to authorize this application: {}", url);
}

/// Listing printed after a Google Drive run.
pub fn print_drive_files(files: &[DriveFile]) {
    if files.is_empty() {
        println!("No files found.");
        return;
    }
    println!("Files:");
    for file in files {
        println!("{} ({})", file.name, file.id);
    }
}

/// Output of `--list-albums`.
pub fn print_albums(owner: Option<&User>, status: Option<&Status>, albums: &[Album]) {
    if let Some(user) = owner {
        println!("{} {} (id {})", user.first_name, user.last_name, user.id);
    }
    if let Some(status) = status.filter(|s| !s.text.is_empty()) {
        println!("Status: {}", status.text);
    }
    if albums.is_empty() {
        println!("No albums found.");
        return;
    }
    println!("Albums:");
    for album in albums {
        println!("{:>12}  {} ({} photos)", album.id, album.title, album.size);
    }
}
