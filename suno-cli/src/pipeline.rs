//! Single-job orchestration: submit, wait, download, tag, persist metadata.

use std::path::{Path, PathBuf};

use suno_api::{
    GenerateRequest, SunoApi, SunoError, TaskStatus, WaitOptions, extract_track_tags,
    wait_for_completion,
};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::error::Result;
use crate::filename::{self, FilenameParams};
use crate::tags::{self, TagParams};

/// Everything needed to run one generation job to completion. All
/// precedence between CLI flags, manifest defaults and config has already
/// been resolved by the time a `Job` exists.
#[derive(Debug, Clone)]
pub struct Job {
    pub request: GenerateRequest,
    pub output_dir: PathBuf,
    pub filename_format: String,
    pub artist: String,
    pub album: Option<String>,
    pub track: Option<u32>,
    pub embed_tags: bool,
    pub cover_file: Option<PathBuf>,
    pub generate_cover: bool,
    pub wait: WaitOptions,
}

#[derive(Debug)]
pub struct JobOutcome {
    pub task_id: String,
    pub files: Vec<PathBuf>,
    pub cover_path: Option<PathBuf>,
    pub metadata_path: PathBuf,
}

/// Submit and run to completion.
pub async fn run(api: &dyn SunoApi, job: &Job) -> Result<JobOutcome> {
    job.request.validate()?;
    let task_id = api.submit(&job.request).await?;
    info!(task_id, "generation task submitted");
    finish(api, &task_id, job).await
}

/// Run the post-submit half of a job: wait for the task, download every
/// variant, tag, and persist the metadata snapshot. Also the entry point
/// for downloading a previously submitted task.
///
/// Cover generation and tag embedding are best-effort: their failures are
/// logged and the job still succeeds. Download and wait failures fail the
/// job.
pub async fn finish(api: &dyn SunoApi, task_id: &str, job: &Job) -> Result<JobOutcome> {
    tokio::fs::create_dir_all(&job.output_dir).await?;

    let completed = wait_for_completion(api, task_id, &job.wait).await?;
    let track_tags = extract_track_tags(&completed.tracks);

    let generated_cover = if job.generate_cover {
        match generate_cover(api, task_id, &job.output_dir).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(task_id, error = %e, "cover generation failed, continuing without it");
                None
            }
        }
    } else {
        None
    };

    let downloadable: Vec<_> = completed
        .tracks
        .iter()
        .filter(|t| t.audio_url.as_deref().is_some_and(|u| !u.is_empty()))
        .collect();
    if downloadable.is_empty() {
        return Err(SunoError::NoResultData(task_id.to_owned()).into());
    }

    // Every variant shares the first variant's reported title, falling back
    // to the requested one. Without an explicit track number, multiple
    // variants get their 1-based index; a single variant stays unnumbered.
    let title = track_tags.title.as_deref().or(job.request.title.as_deref());
    let mut files = Vec::new();
    for (i, track) in downloadable.iter().enumerate() {
        let variant = i + 1;
        let track_no = job
            .track
            .or_else(|| (downloadable.len() > 1).then_some(variant as u32));
        let dest = filename::output_path(
            &job.output_dir,
            &job.filename_format,
            &FilenameParams {
                title,
                artist: Some(&job.artist),
                track: track_no,
                variant,
            },
        );
        let url = track.audio_url.as_deref().unwrap_or_default();
        api.fetch_asset(url, &dest).await?;
        info!(file = %dest.display(), "variant downloaded");
        files.push((dest, track_no));
    }

    let (cover_bytes, cover_path) = resolve_cover(
        api,
        job,
        generated_cover,
        track_tags.cover_url.as_deref(),
    )
    .await;

    if job.embed_tags {
        for (file, track_no) in &files {
            let params = TagParams {
                title: title.unwrap_or("Unknown"),
                artist: &job.artist,
                album: job.album.as_deref(),
                track: *track_no,
                genre: track_tags.genre.as_deref(),
            };
            if let Err(e) = tags::embed(file, &params, cover_bytes.as_deref()) {
                warn!(file = %file.display(), error = %e, "tagging failed, keeping untagged file");
            }
        }
    }

    let metadata_path = job.output_dir.join(format!("metadata-{task_id}.json"));
    tokio::fs::write(&metadata_path, serde_json::to_string_pretty(&completed.raw)?).await?;

    Ok(JobOutcome {
        task_id: task_id.to_owned(),
        files: files.into_iter().map(|(path, _)| path).collect(),
        cover_path,
        metadata_path,
    })
}

/// Cover precedence: a user-supplied file, then an API-generated cover,
/// then the cover URL of the result payload. A source that cannot be read
/// degrades to the next one with a warning; cover problems never fail a
/// job whose audio already landed.
async fn resolve_cover(
    api: &dyn SunoApi,
    job: &Job,
    generated: Option<PathBuf>,
    cover_url: Option<&str>,
) -> (Option<Vec<u8>>, Option<PathBuf>) {
    if let Some(path) = &job.cover_file {
        match tokio::fs::read(path).await {
            Ok(bytes) => return (Some(bytes), Some(path.clone())),
            Err(e) => {
                warn!(file = %path.display(), error = %e, "cover file unreadable, falling back")
            }
        }
    }
    if let Some(path) = generated {
        match tokio::fs::read(&path).await {
            Ok(bytes) => return (Some(bytes), Some(path)),
            Err(e) => warn!(file = %path.display(), error = %e, "generated cover unreadable"),
        }
    }
    if let Some(url) = cover_url.filter(|u| !u.is_empty()) {
        let dest = job.output_dir.join(cover_filename(url));
        match api.fetch_asset(url, &dest).await {
            Ok(()) => match tokio::fs::read(&dest).await {
                Ok(bytes) => return (Some(bytes), Some(dest)),
                Err(e) => warn!(error = %e, "downloaded cover unreadable"),
            },
            Err(e) => warn!(url, error = %e, "cover download failed, continuing without it"),
        }
    }
    (None, None)
}

/// Submit a follow-up cover job and download every resulting image as
/// `cover_{n}`. Returns the first image's path.
async fn generate_cover(
    api: &dyn SunoApi,
    task_id: &str,
    output_dir: &Path,
) -> Result<PathBuf> {
    let cover_task = api.request_cover(task_id).await?;
    info!(cover_task, "cover generation requested");
    let urls = wait_for_cover(api, &cover_task, &WaitOptions::cover()).await?;

    let mut first = None;
    for (i, url) in urls.iter().enumerate() {
        let dest = output_dir.join(format!("cover_{}.{}", i + 1, cover_ext(url)));
        api.fetch_asset(url, &dest).await?;
        first.get_or_insert(dest);
    }
    first.ok_or_else(|| SunoError::NoResultData(cover_task).into())
}

/// Cover jobs report image URLs rather than audio, so they get their own
/// small wait loop instead of [`wait_for_completion`].
async fn wait_for_cover(
    api: &dyn SunoApi,
    task_id: &str,
    options: &WaitOptions,
) -> Result<Vec<String>> {
    let started = Instant::now();
    loop {
        let snapshot = api.poll_once(task_id).await?;
        if snapshot.status.is_success() {
            let urls = cover_image_urls(&snapshot.tracks);
            if urls.is_empty() {
                return Err(SunoError::NoResultData(task_id.to_owned()).into());
            }
            return Ok(urls);
        }
        if snapshot.status == TaskStatus::Failed {
            return Err(SunoError::GenerationFailed(
                snapshot.error.unwrap_or_else(|| "cover generation failed".to_owned()),
            )
            .into());
        }
        let waited = started.elapsed();
        if waited >= options.max_wait {
            return Err(SunoError::Timeout {
                task_id: task_id.to_owned(),
                waited,
            }
            .into());
        }
        tokio::time::sleep(options.poll_interval).await;
    }
}

/// Cover results have been observed under both `imageUrl` and `audioUrl`,
/// so either key counts.
fn cover_image_urls(tracks: &[suno_api::Track]) -> Vec<String> {
    tracks
        .iter()
        .filter_map(|t| {
            t.image_url
                .clone()
                .filter(|u| !u.is_empty())
                .or_else(|| t.audio_url.clone().filter(|u| !u.is_empty()))
        })
        .collect()
}

fn cover_ext(url: &str) -> &str {
    Path::new(url.split('?').next().unwrap_or(url))
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| matches!(*e, "png" | "jpg" | "jpeg" | "gif" | "webp"))
        .unwrap_or("jpg")
}

fn cover_filename(url: &str) -> String {
    format!("cover.{}", cover_ext(url))
}
