//! Saving a finished video locally.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use tokio::io::AsyncWriteExt;

/// File name used when the URL does not end in one.
pub const DEFAULT_VIDEO_FILE_NAME: &str = "kiss-your-crush.mp4";

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("Video request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Video server returned status {0}")]
    Status(u16),

    #[error("Failed to write video: {0}")]
    Io(#[from] std::io::Error),
}

/// Stream the video at `url` into `dest`. Returns the number of bytes
/// written.
///
/// The file is written next to `dest` under a temporary name and moved
/// into place once complete.
pub async fn download_video(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
) -> Result<u64, DownloadError> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::Status(status.as_u16()));
    }

    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = dest.with_extension("part");
    let mut file = tokio::fs::File::create(&tmp).await?;
    let mut written = 0u64;

    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    drop(file);
    tokio::fs::rename(&tmp, dest).await?;

    tracing::info!(url, path = %dest.display(), bytes = written, "Video downloaded");
    Ok(written)
}

/// Local file name for `url`: its last path segment when it looks like a
/// file, otherwise [`DEFAULT_VIDEO_FILE_NAME`].
pub fn file_name_for(url: &str) -> PathBuf {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let without_query = without_scheme.split(['?', '#']).next().unwrap_or_default();
    let path = without_query.split_once('/').map_or("", |(_, path)| path);
    let name = path.rsplit('/').next().unwrap_or_default();
    if name.contains('.') && !name.starts_with('.') {
        PathBuf::from(name)
    } else {
        PathBuf::from(DEFAULT_VIDEO_FILE_NAME)
    }
}
