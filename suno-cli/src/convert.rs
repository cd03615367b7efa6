//! MP3-to-MP4 conversion with a static cover frame.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{CliError, Result};
use crate::tags;

/// Seam over the external encoder so conversion logic is testable without
/// ffmpeg installed.
#[async_trait]
pub trait VideoEncoder: Send + Sync {
    async fn encode(&self, audio: &Path, cover: &Path, output: &Path) -> Result<()>;
}

pub struct FfmpegEncoder;

impl FfmpegEncoder {
    /// Cheap availability check so missing ffmpeg fails before any other
    /// work is done.
    pub async fn ensure_available() -> Result<()> {
        let status = Command::new("ffmpeg")
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(CliError::Convert(
                "ffmpeg not found; install it to use convert".to_owned(),
            )),
        }
    }
}

#[async_trait]
impl VideoEncoder for FfmpegEncoder {
    async fn encode(&self, audio: &Path, cover: &Path, output: &Path) -> Result<()> {
        let mut command = Command::new("ffmpeg");
        command
            .arg("-y")
            .args(["-loop", "1"])
            .arg("-i")
            .arg(cover)
            .arg("-i")
            .arg(audio)
            .args(["-c:v", "libx264", "-tune", "stillimage"])
            .args(["-c:a", "aac", "-b:a", "192k"])
            .args(["-pix_fmt", "yuv420p"])
            // Even dimensions are required by yuv420p.
            .args(["-vf", "scale=trunc(iw/2)*2:trunc(ih/2)*2"])
            .arg("-shortest")
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        debug!(?command, "running ffmpeg");

        let result = command.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CliError::Convert("ffmpeg not found; install it to use convert".to_owned())
            } else {
                CliError::Io(e)
            }
        })?;
        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
            return Err(CliError::Convert(format!(
                "ffmpeg exited with {}: {}",
                result.status,
                tail.into_iter().rev().collect::<Vec<_>>().join(" | ")
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ConvertRequest {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub cover: Option<PathBuf>,
    pub overwrite: bool,
}

/// Turn an MP3 into an MP4 whose single video frame is the cover image.
/// Without an explicit cover the image embedded in the MP3's ID3 tag is
/// used.
pub async fn convert(encoder: &dyn VideoEncoder, request: &ConvertRequest) -> Result<PathBuf> {
    if !request.input.exists() {
        return Err(CliError::InvalidInput(format!(
            "input file not found: {}",
            request.input.display()
        )));
    }
    let output = request
        .output
        .clone()
        .unwrap_or_else(|| request.input.with_extension("mp4"));
    if output.exists() && !request.overwrite {
        return Err(CliError::InvalidInput(format!(
            "{} already exists (use --overwrite to replace it)",
            output.display()
        )));
    }

    // The extracted cover must outlive the encoder run.
    let mut extracted: Option<tempfile::NamedTempFile> = None;
    let cover: PathBuf = match &request.cover {
        Some(path) => {
            if !path.exists() {
                return Err(CliError::InvalidInput(format!(
                    "cover image not found: {}",
                    path.display()
                )));
            }
            path.clone()
        }
        None => {
            let bytes = tags::extract_cover(&request.input).ok_or_else(|| {
                CliError::InvalidInput(format!(
                    "{} has no embedded cover; pass one with --cover",
                    request.input.display()
                ))
            })?;
            let suffix = if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
                ".png"
            } else {
                ".jpeg"
            };
            let file = tempfile::Builder::new().suffix(suffix).tempfile()?;
            std::fs::write(file.path(), &bytes)?;
            let path = file.path().to_path_buf();
            extracted = Some(file);
            path
        }
    };

    encoder.encode(&request.input, &cover, &output).await?;
    drop(extracted);
    info!(output = %output.display(), "video written");
    Ok(output)
}

/// Convert every MP3 directly inside `dir`, in name order. A file that
/// fails (no embedded cover, encoder error) is logged and skipped; the
/// directory conversion only fails when it produced nothing.
pub async fn convert_directory(
    encoder: &dyn VideoEncoder,
    dir: &Path,
    overwrite: bool,
) -> Result<Vec<PathBuf>> {
    let mut inputs = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.is_file()
            && path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("mp3"))
        {
            inputs.push(path);
        }
    }
    if inputs.is_empty() {
        return Err(CliError::InvalidInput(format!(
            "no .mp3 files in {}",
            dir.display()
        )));
    }
    inputs.sort();

    let mut outputs = Vec::new();
    for input in &inputs {
        let request = ConvertRequest {
            input: input.clone(),
            output: None,
            cover: None,
            overwrite,
        };
        match convert(encoder, &request).await {
            Ok(output) => outputs.push(output),
            Err(e) => warn!(file = %input.display(), error = %e, "conversion failed, continuing"),
        }
    }
    if outputs.is_empty() {
        return Err(CliError::Convert(format!(
            "none of the {} MP3s in {} could be converted",
            inputs.len(),
            dir.display()
        )));
    }
    Ok(outputs)
}
