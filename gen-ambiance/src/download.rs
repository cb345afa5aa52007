//! Artifact download with progress reporting.

use anyhow::{Context, Result};
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use log::debug;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Download-related errors.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("HTTP error: {status} for {url}")]
    HttpError { status: u16, url: String },

    #[error("Download from {0} was empty")]
    Empty(String),
}

/// Download an artifact URL to `destination`, returning the byte count.
pub async fn download_file(url: &str, destination: &Path, description: &str) -> Result<u64> {
    // Create parent directory if needed
    if let Some(parent) = destination.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(30))
        .timeout(Duration::from_secs(600))
        .build()
        .context("Failed to create HTTP client")?;

    debug!("Downloading {} to {}", url, destination.display());
    let response = client
        .get(url)
        .send()
        .await
        .context("Failed to connect")?;

    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::HttpError {
            status: status.as_u16(),
            url: url.to_string(),
        }
        .into());
    }

    let pb = progress_bar(response.content_length(), description)?;
    let partial = partial_path(destination);

    let written = write_stream(response, &partial, &pb).await;
    pb.finish_and_clear();

    let downloaded = match written {
        Ok(0) => Err(DownloadError::Empty(url.to_string()).into()),
        other => other,
    };
    match downloaded {
        Ok(bytes) => {
            std::fs::rename(&partial, destination)
                .context("Failed to move download into place")?;
            Ok(bytes)
        }
        Err(e) => {
            let _ = std::fs::remove_file(&partial);
            Err(e)
        }
    }
}

/// Sibling path the body is streamed to before it is complete
fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    destination.with_file_name(name)
}

async fn write_stream(response: reqwest::Response, path: &Path, pb: &ProgressBar) -> Result<u64> {
    let mut file = std::fs::File::create(path).context("Failed to create destination file")?;

    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.context("Error reading response")?;
        file.write_all(&chunk).context("Failed to write to file")?;
        downloaded += chunk.len() as u64;
        pb.set_position(downloaded);
    }

    file.flush().context("Failed to write to file")?;
    Ok(downloaded)
}

fn progress_bar(total_size: Option<u64>, description: &str) -> Result<ProgressBar> {
    let pb = match total_size {
        Some(size) => {
            let pb = ProgressBar::new(size);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template(
                        "  {msg}\n  {bar:40.cyan/blue} {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
                    )
                    .context("Invalid progress template")?
                    .progress_chars("=>-"),
            );
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("  {msg} {bytes} ({bytes_per_sec})")
                    .context("Invalid progress template")?,
            );
            pb
        }
    };
    pb.set_message(description.to_string());
    Ok(pb)
}

/// Format bytes for human-readable display.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
