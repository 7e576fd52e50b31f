use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use log::{debug, info, warn};
use serde::Deserialize;
use tempfile::TempDir;
use tokio::process::Command;

/// The three input modalities a transcription request can carry.
#[derive(Debug)]
pub enum Source {
    Url(String),
    Audio { data: Vec<u8>, filename: String },
    Captions(String),
}

/// What URL resolution produced: either scraped caption text or a
/// downloaded audio file inside a request-scoped temp directory.
pub enum ResolvedUrl {
    Captions { title: String, text: String },
    Audio {
        title: String,
        dir: TempDir,
        path: PathBuf,
    },
}

#[derive(Debug, Deserialize)]
struct VideoInfo {
    title: Option<String>,
}

/// Reject anything that is not an http(s) URL before it reaches a
/// subprocess argument list.
pub fn validate_url(url: &str) -> Result<()> {
    let trimmed = url.trim();
    if trimmed.starts_with("https://") || trimmed.starts_with("http://") {
        Ok(())
    } else {
        Err(anyhow!(
            "Invalid URL (must start with http:// or https://): {trimmed}"
        ))
    }
}

/// Resolve a video URL into captions or an audio file.
///
/// Existing English captions are preferred: they are free and need no
/// speech-to-text call. Audio extraction runs only when the video has no
/// captions, and is skipped entirely when the caller has no API key to
/// transcribe the audio with (`want_audio` false).
pub async fn resolve_url(url: &str, want_audio: bool) -> Result<ResolvedUrl> {
    validate_url(url)?;
    check_yt_dlp().await?;

    let dir = TempDir::new().map_err(|e| anyhow!("Failed to create temp dir: {}", e))?;

    let title = probe_title(url).await;
    info!("Resolved video title: {title}");

    match fetch_captions(url, dir.path()).await {
        Ok(Some(text)) => {
            debug!("Using scraped captions ({} bytes)", text.len());
            return Ok(ResolvedUrl::Captions { title, text });
        }
        Ok(None) => debug!("No English captions available"),
        Err(e) => warn!("Caption scrape failed, falling back to audio: {e:#}"),
    }

    if !want_audio {
        return Err(anyhow!("No captions available for {url}"));
    }

    let path = download_audio(url, dir.path()).await?;
    Ok(ResolvedUrl::Audio { title, dir, path })
}

/// Write uploaded audio bytes into a request-scoped temp file.
pub async fn stage_upload(data: Vec<u8>, filename: &str) -> Result<(TempDir, PathBuf)> {
    let dir = TempDir::new().map_err(|e| anyhow!("Failed to create temp dir: {}", e))?;
    let safe_name = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload.mp3");
    let path = dir.path().join(safe_name);

    tokio::fs::write(&path, data)
        .await
        .map_err(|e| anyhow!("Failed to write uploaded audio: {}", e))?;

    debug!("Staged upload at {}", path.display());
    Ok((dir, path))
}

/// Best-effort temp dir removal. Failures are logged and swallowed.
pub fn cleanup(dir: TempDir) {
    if let Err(e) = dir.close() {
        warn!("Failed to remove temp dir: {e}");
    }
}

async fn check_yt_dlp() -> Result<()> {
    let check = Command::new("yt-dlp").arg("--version").output().await;
    match check {
        Ok(output) if output.status.success() => Ok(()),
        _ => Err(anyhow!(
            "yt-dlp is required for URL input. Please install it (pip install yt-dlp)."
        )),
    }
}

/// Fetch the video title without downloading anything. A probe failure is
/// not fatal; the transcript just gets a generic title.
async fn probe_title(url: &str) -> String {
    let output = Command::new("yt-dlp")
        .args(["--dump-json", "--no-download", "--no-playlist"])
        .arg(url)
        .output()
        .await;

    let info: Option<VideoInfo> = match output {
        Ok(out) if out.status.success() => serde_json::from_slice(&out.stdout).ok(),
        _ => None,
    };

    info.and_then(|i| i.title)
        .unwrap_or_else(|| "Unknown Video".to_string())
}

/// Scrape English captions (manual or auto-generated) as VTT. Returns None
/// when the video has none.
async fn fetch_captions(url: &str, dir: &Path) -> Result<Option<String>> {
    let template = output_template(dir)?;

    let output = Command::new("yt-dlp")
        .args([
            "--skip-download",
            "--write-subs",
            "--write-auto-subs",
            "--sub-langs",
            "en.*,en",
            "--sub-format",
            "vtt/best",
            "--no-playlist",
            "--output",
            &template,
        ])
        .arg(url)
        .output()
        .await
        .map_err(|e| anyhow!("Failed to run yt-dlp: {}", e))?;

    if !output.status.success() {
        let stderr = truncated_stderr(&output.stderr);
        return Err(anyhow!("yt-dlp caption scrape failed: {stderr}"));
    }

    match find_file_with_ext(dir, &["vtt", "srt"]) {
        Some(path) => {
            let text = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| anyhow!("Failed to read caption file: {}", e))?;
            Ok(Some(text))
        }
        None => Ok(None),
    }
}

/// Extract the audio track as mp3. Low quality on purpose: the original
/// service hit fewer 403 responses that way, and speech recognition does
/// not need more.
async fn download_audio(url: &str, dir: &Path) -> Result<PathBuf> {
    info!("Downloading audio for {url}");
    let template = output_template(dir)?;

    let output = Command::new("yt-dlp")
        .args([
            "--format",
            "worstaudio/worst",
            "--extract-audio",
            "--audio-format",
            "mp3",
            "--audio-quality",
            "128K",
            "--no-playlist",
            "--no-exec",
            "--output",
            &template,
            "--print",
            "after_move:filepath",
        ])
        .arg(url)
        .output()
        .await
        .map_err(|e| anyhow!("Failed to run yt-dlp: {}", e))?;

    if !output.status.success() {
        let stderr = truncated_stderr(&output.stderr);
        return Err(anyhow!("yt-dlp download failed: {stderr}"));
    }

    let printed = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let path = if printed.is_empty() {
        find_file_with_ext(dir, &["mp3", "m4a", "wav", "ogg", "opus"])
            .ok_or_else(|| anyhow!("No audio file found after download"))?
    } else {
        PathBuf::from(printed)
    };

    if !path.exists() {
        return Err(anyhow!("Downloaded file not found at {}", path.display()));
    }

    debug!("Audio downloaded to {}", path.display());
    Ok(path)
}

fn output_template(dir: &Path) -> Result<String> {
    dir.join("%(id)s.%(ext)s")
        .to_str()
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow!("Temp dir path contains invalid UTF-8"))
}

fn truncated_stderr(stderr: &[u8]) -> String {
    String::from_utf8_lossy(stderr).chars().take(1000).collect()
}

fn find_file_with_ext(dir: &Path, extensions: &[&str]) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    for entry in entries.flatten() {
        let path = entry.path();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            if extensions.contains(&ext) {
                return Some(path);
            }
        }
    }
    None
}
