//! Batch manifests and multi-job orchestration.
//!
//! A manifest is a TOML document with an optional `[defaults]` table and a
//! `[[songs]]` array. Per-song values override manifest defaults, which
//! override config-file values, which override the built-in fallbacks.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::future::join_all;
use inquire::InquireError;
use serde::Deserialize;
use suno_api::{GenerateRequest, Model, SunoApi, VocalGender, WaitOptions, load_content};
use tracing::{error, info, warn};

use crate::config::{
    AppConfig, DEFAULT_ARTIST, DEFAULT_FILENAME_FORMAT, DEFAULT_MAX_WAIT, DEFAULT_POLL_INTERVAL,
};
use crate::error::{CliError, Result};
use crate::filename;
use crate::pipeline::{self, Job};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Manifest {
    /// Base directory for the whole batch; overridable from the CLI.
    pub output_base: Option<PathBuf>,
    /// Give each song its own subdirectory (default true).
    pub use_subdirectories: Option<bool>,
    pub defaults: SongDefaults,
    pub songs: Vec<SongEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SongDefaults {
    pub model: Option<Model>,
    pub gender: Option<VocalGender>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub style: Option<String>,
    pub instrumental: Option<bool>,
    pub generate_cover: Option<bool>,
    pub filename_format: Option<String>,
    pub duration: Option<u32>,
    pub cover: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SongEntry {
    /// Subdirectory name; falls back to the title, then to the position.
    pub name: Option<String>,
    /// Lyrics/prompt: file path, URL, or direct string. Required.
    pub prompt: String,
    pub title: Option<String>,
    pub style: Option<String>,
    pub model: Option<Model>,
    pub gender: Option<VocalGender>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub track: Option<u32>,
    pub instrumental: Option<bool>,
    pub generate_cover: Option<bool>,
    pub cover: Option<PathBuf>,
    pub duration: Option<u32>,
    /// Explicit output directory for this song, bypassing the base dir.
    pub output: Option<PathBuf>,
}

impl Manifest {
    /// Load from a path or URL and validate its shape. Content problems are
    /// pre-flight: they abort the batch before anything is submitted.
    pub async fn load(client: &reqwest::Client, source: &str) -> Result<Self> {
        let raw = load_content(client, source, "manifest").await?;
        let manifest: Manifest =
            toml::from_str(&raw).map_err(|e| CliError::Manifest(e.to_string()))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Batch songs always run in custom mode, so title, prompt and style
    /// (per song or from `[defaults]`) are all mandatory.
    fn validate(&self) -> Result<()> {
        if self.songs.is_empty() {
            return Err(CliError::Manifest("no songs defined".to_owned()));
        }
        for (i, song) in self.songs.iter().enumerate() {
            let position = i + 1;
            if song.prompt.trim().is_empty() {
                return Err(CliError::Manifest(format!(
                    "song {position} has an empty prompt"
                )));
            }
            if song.title.as_deref().is_none_or(|t| t.trim().is_empty()) {
                return Err(CliError::Manifest(format!("song {position} has no title")));
            }
            if song.style.is_none() && self.defaults.style.is_none() {
                return Err(CliError::Manifest(format!(
                    "song {position} has no style and [defaults] defines none"
                )));
            }
        }
        Ok(())
    }
}

/// First layer that carries a value wins.
fn resolve<T: Clone>(layers: &[Option<&T>], fallback: T) -> T {
    resolve_opt(layers).unwrap_or(fallback)
}

fn resolve_opt<T: Clone>(layers: &[Option<&T>]) -> Option<T> {
    layers.iter().find_map(|layer| layer.cloned())
}

#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// CLI override; the manifest and config file are the fallbacks.
    pub output_base: Option<PathBuf>,
    pub filename_format: Option<String>,
}

/// One prepared job with its display name.
#[derive(Debug, Clone)]
pub struct NamedJob {
    pub name: String,
    pub job: Job,
}

/// Resolve every song into a ready-to-run [`Job`], loading prompt and style
/// content up front. Any validation failure here aborts the whole batch.
pub async fn prepare_jobs(
    client: &reqwest::Client,
    manifest: &Manifest,
    config: &AppConfig,
    options: &BatchOptions,
) -> Result<Vec<NamedJob>> {
    let defaults = &manifest.defaults;
    let output_base = resolve_opt(&[
        options.output_base.as_ref(),
        manifest.output_base.as_ref(),
        config.output_dir.as_ref(),
    ])
    .ok_or_else(|| {
        CliError::InvalidInput(
            "no output directory; pass -o/--output-base, set output_base in the manifest, \
             or output_dir in the config file"
                .to_owned(),
        )
    })?;
    let use_subdirectories = manifest.use_subdirectories.unwrap_or(true);
    let filename_format = resolve(
        &[
            options.filename_format.as_ref(),
            defaults.filename_format.as_ref(),
            config.filename_format.as_ref(),
        ],
        DEFAULT_FILENAME_FORMAT.to_owned(),
    );
    let wait = WaitOptions {
        poll_interval: Duration::from_secs(
            config.poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL),
        ),
        max_wait: Duration::from_secs(config.max_wait.unwrap_or(DEFAULT_MAX_WAIT)),
    };

    let mut jobs = Vec::with_capacity(manifest.songs.len());
    for (i, song) in manifest.songs.iter().enumerate() {
        let position = i + 1;
        let name = song
            .name
            .clone()
            .or_else(|| song.title.clone())
            .unwrap_or_else(|| format!("song-{position}"));

        let prompt = load_content(client, &song.prompt, "prompt").await?;
        let style_source = resolve_opt(&[song.style.as_ref(), defaults.style.as_ref()]);
        let style = match style_source {
            Some(source) => Some(load_content(client, &source, "style").await?),
            None => None,
        };

        let request = GenerateRequest {
            prompt,
            title: song.title.clone(),
            style,
            model: resolve(
                &[song.model.as_ref(), defaults.model.as_ref(), config.model.as_ref()],
                Model::default(),
            ),
            vocal_gender: resolve(
                &[song.gender.as_ref(), defaults.gender.as_ref(), config.gender.as_ref()],
                VocalGender::default(),
            ),
            instrumental: resolve(
                &[song.instrumental.as_ref(), defaults.instrumental.as_ref()],
                false,
            ),
            duration: resolve_opt(&[song.duration.as_ref(), defaults.duration.as_ref()]),
            custom_mode: true,
        };
        request.validate().map_err(|e| {
            CliError::Manifest(format!("song {position} ({name}): {e}"))
        })?;

        // A relative per-song output lands under the batch base dir.
        let output_dir = match &song.output {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => output_base.join(path),
            None if use_subdirectories => output_base.join(filename::sanitize(&name)),
            None => output_base.clone(),
        };
        let job = Job {
            request,
            output_dir,
            filename_format: filename_format.clone(),
            artist: resolve(
                &[song.artist.as_ref(), defaults.artist.as_ref(), config.artist.as_ref()],
                DEFAULT_ARTIST.to_owned(),
            ),
            album: resolve_opt(&[
                song.album.as_ref(),
                defaults.album.as_ref(),
                config.album.as_ref(),
            ]),
            track: Some(song.track.unwrap_or(position as u32)),
            embed_tags: true,
            cover_file: resolve_opt(&[song.cover.as_ref(), defaults.cover.as_ref()]),
            generate_cover: resolve(
                &[song.generate_cover.as_ref(), defaults.generate_cover.as_ref()],
                false,
            ),
            wait: wait.clone(),
        };
        jobs.push(NamedJob { name, job });
    }
    Ok(jobs)
}

/// Aggregate counters shared with the interrupt handler so a partial run
/// can still be reported.
#[derive(Debug, Default)]
pub struct BatchCounters {
    submitted: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
    skipped: AtomicUsize,
}

impl BatchCounters {
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    pub fn skipped(&self) -> usize {
        self.skipped.load(Ordering::SeqCst)
    }

    pub fn submitted(&self) -> usize {
        self.submitted.load(Ordering::SeqCst)
    }

    pub fn summary(&self) -> String {
        format!(
            "{} completed, {} failed, {} skipped",
            self.completed(),
            self.failed(),
            self.skipped()
        )
    }

    /// Summary plus the batch's wall-clock duration.
    pub fn report(&self, elapsed: Duration) -> String {
        format!("{} in {:.1}s", self.summary(), elapsed.as_secs_f64())
    }
}

/// Submit every job up front, then wait for all of them concurrently.
/// Submissions stay serial so per-job errors attribute cleanly; a rejected
/// submission fails that job and the rest continue.
pub async fn run_parallel(
    api: &dyn SunoApi,
    jobs: &[NamedJob],
    counters: &BatchCounters,
) {
    let mut pending = Vec::new();
    for named in jobs {
        match api.submit(&named.job.request).await {
            Ok(task_id) => {
                info!(song = %named.name, task_id, "submitted");
                counters.submitted.fetch_add(1, Ordering::SeqCst);
                pending.push((named, task_id));
            }
            Err(e) => {
                error!(song = %named.name, error = %e, "submission failed");
                counters.failed.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    let waits = pending.iter().map(|(named, task_id)| async move {
        (named, pipeline::finish(api, task_id, &named.job).await)
    });
    for (named, result) in join_all(waits).await {
        record_outcome(&named.name, result, counters);
    }
}

/// Run jobs one at a time, pausing between them and optionally asking
/// whether to continue after each finished song. Answering no stops the
/// batch while keeping everything already produced; the remaining songs
/// count as skipped.
pub async fn run_sequential(
    api: &dyn SunoApi,
    jobs: &[NamedJob],
    counters: &BatchCounters,
    interactive: bool,
    delay: Duration,
) -> Result<()> {
    let mut ask = interactive && jobs.len() > 1;
    for (i, named) in jobs.iter().enumerate() {
        counters.submitted.fetch_add(1, Ordering::SeqCst);
        let result = pipeline::run(api, &named.job).await;
        record_outcome(&named.name, result, counters);

        let remaining = jobs.len() - (i + 1);
        if remaining == 0 {
            break;
        }
        if ask {
            match confirm_continue(remaining).await? {
                Decision::Yes => {}
                Decision::YesToAll => ask = false,
                Decision::No => {
                    info!(remaining, "stopping early, keeping finished results");
                    counters.skipped.fetch_add(remaining, Ordering::SeqCst);
                    break;
                }
            }
        }
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
    Ok(())
}

fn record_outcome(
    name: &str,
    result: Result<pipeline::JobOutcome>,
    counters: &BatchCounters,
) {
    match result {
        Ok(outcome) => {
            info!(song = name, files = outcome.files.len(), "completed");
            counters.completed.fetch_add(1, Ordering::SeqCst);
        }
        Err(e) => {
            warn!(song = name, error = %e, "failed");
            counters.failed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Yes,
    No,
    YesToAll,
}

/// Terminal prompts block, so they run on the blocking pool. Esc or ctrl-c
/// at the prompt cancels the batch.
async fn confirm_continue(remaining: usize) -> Result<Decision> {
    let message = format!("Continue with the next song? ({remaining} left)");
    let answer = tokio::task::spawn_blocking(move || {
        inquire::Select::new(&message, vec!["yes", "no", "yes to all"]).prompt()
    })
    .await
    .map_err(|e| CliError::InvalidInput(format!("prompt task failed: {e}")))?;

    match answer {
        Ok("yes") => Ok(Decision::Yes),
        Ok("no") => Ok(Decision::No),
        Ok(_) => Ok(Decision::YesToAll),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => {
            Err(CliError::Interrupted)
        }
        Err(e) => Err(CliError::InvalidInput(format!("prompt failed: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{FakeApi, JobScript};

    const MANIFEST: &str = r#"
[defaults]
model = "V5"
artist = "Batch Artist"
style = "synthwave"

[[songs]]
title = "First"
prompt = "lyrics for the first song"

[[songs]]
name = "second-song"
title = "Second"
prompt = "lyrics for the second song"
style = "jazz"
gender = "female"
track = 12

[[songs]]
title = "Rainfall"
prompt = "an instrumental about rain"
instrumental = true
"#;

    fn options(base: &std::path::Path) -> BatchOptions {
        BatchOptions {
            output_base: Some(base.to_path_buf()),
            filename_format: None,
        }
    }

    async fn prepared(base: &std::path::Path) -> Vec<NamedJob> {
        let manifest: Manifest = toml::from_str(MANIFEST).unwrap();
        manifest.validate().unwrap();
        prepare_jobs(
            &reqwest::Client::new(),
            &manifest,
            &AppConfig::default(),
            &options(base),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn precedence_runs_song_then_defaults_then_config() {
        let dir = tempfile::tempdir().unwrap();
        let jobs = prepared(dir.path()).await;
        assert_eq!(jobs.len(), 3);

        // Song one inherits the manifest defaults.
        assert_eq!(jobs[0].job.request.model, Model::V5);
        assert_eq!(jobs[0].job.request.style.as_deref(), Some("synthwave"));
        assert_eq!(jobs[0].job.artist, "Batch Artist");
        assert_eq!(jobs[0].job.request.vocal_gender, VocalGender::Male);

        // Song two overrides style and gender.
        assert_eq!(jobs[1].job.request.style.as_deref(), Some("jazz"));
        assert_eq!(jobs[1].job.request.vocal_gender, VocalGender::Female);
    }

    #[tokio::test]
    async fn precedence_matrix_covers_every_overridable_field() {
        let manifest: Manifest = toml::from_str(
            r#"
[defaults]
model = "V4_5"
gender = "female"
artist = "Default Artist"
album = "Default Album"
style = "default style"
instrumental = false
generate_cover = false
filename_format = "default-{title}.mp3"
duration = 90
cover = "/covers/default.png"

[[songs]]
title = "Overrides"
prompt = "p1"
model = "V5"
gender = "male"
artist = "Song Artist"
album = "Song Album"
style = "song style"
instrumental = true
generate_cover = true
duration = 120
cover = "/covers/song.png"

[[songs]]
title = "Inherits"
prompt = "p2"
"#,
        )
        .unwrap();
        let config = AppConfig {
            model: Some(Model::V4),
            gender: Some(VocalGender::Male),
            artist: Some("Config Artist".to_owned()),
            album: Some("Config Album".to_owned()),
            filename_format: Some("config-{title}.mp3".to_owned()),
            ..Default::default()
        };
        let dir = tempfile::tempdir().unwrap();
        let jobs = prepare_jobs(
            &reqwest::Client::new(),
            &manifest,
            &config,
            &options(dir.path()),
        )
        .await
        .unwrap();

        // Song tier beats defaults and config.
        let song = &jobs[0].job;
        assert_eq!(song.request.model, Model::V5);
        assert_eq!(song.request.vocal_gender, VocalGender::Male);
        assert_eq!(song.request.style.as_deref(), Some("song style"));
        assert_eq!(song.request.duration, Some(120));
        assert!(song.request.instrumental);
        assert_eq!(song.artist, "Song Artist");
        assert_eq!(song.album.as_deref(), Some("Song Album"));
        assert!(song.generate_cover);
        assert_eq!(
            song.cover_file.as_deref(),
            Some(std::path::Path::new("/covers/song.png"))
        );

        // Defaults tier beats config; config fills what defaults omit.
        let inherited = &jobs[1].job;
        assert_eq!(inherited.request.model, Model::V4_5);
        assert_eq!(inherited.request.vocal_gender, VocalGender::Female);
        assert_eq!(inherited.request.style.as_deref(), Some("default style"));
        assert_eq!(inherited.request.duration, Some(90));
        assert!(!inherited.request.instrumental);
        assert_eq!(inherited.artist, "Default Artist");
        assert_eq!(inherited.album.as_deref(), Some("Default Album"));
        assert!(!inherited.generate_cover);
        assert_eq!(
            inherited.cover_file.as_deref(),
            Some(std::path::Path::new("/covers/default.png"))
        );
        assert_eq!(inherited.filename_format, "default-{title}.mp3");

        // Config tier wins only when both manifest tiers are silent.
        let silent: Manifest =
            toml::from_str("[[songs]]\ntitle = \"T\"\nprompt = \"p\"\nstyle = \"s\"\n").unwrap();
        let jobs = prepare_jobs(
            &reqwest::Client::new(),
            &silent,
            &config,
            &options(dir.path()),
        )
        .await
        .unwrap();
        let job = &jobs[0].job;
        assert_eq!(job.request.model, Model::V4);
        assert_eq!(job.artist, "Config Artist");
        assert_eq!(job.album.as_deref(), Some("Config Album"));
        assert_eq!(job.filename_format, "config-{title}.mp3");
    }

    #[tokio::test]
    async fn track_defaults_to_manifest_position() {
        let dir = tempfile::tempdir().unwrap();
        let jobs = prepared(dir.path()).await;
        assert_eq!(jobs[0].job.track, Some(1));
        assert_eq!(jobs[1].job.track, Some(12));
        assert_eq!(jobs[2].job.track, Some(3));
    }

    #[tokio::test]
    async fn names_fall_back_from_name_to_title() {
        let dir = tempfile::tempdir().unwrap();
        let jobs = prepared(dir.path()).await;
        assert_eq!(jobs[0].name, "First");
        assert_eq!(jobs[1].name, "second-song");
        assert_eq!(jobs[2].name, "Rainfall");
        assert_eq!(jobs[1].job.output_dir, dir.path().join("second-song"));
    }

    #[tokio::test]
    async fn batch_songs_always_run_in_custom_mode() {
        let dir = tempfile::tempdir().unwrap();
        let jobs = prepared(dir.path()).await;
        assert!(jobs.iter().all(|j| j.job.request.custom_mode));
        assert!(jobs[2].job.request.instrumental);
    }

    #[tokio::test]
    async fn disabling_subdirectories_shares_the_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut manifest: Manifest = toml::from_str(MANIFEST).unwrap();
        manifest.use_subdirectories = Some(false);
        let jobs = prepare_jobs(
            &reqwest::Client::new(),
            &manifest,
            &AppConfig::default(),
            &options(dir.path()),
        )
        .await
        .unwrap();
        assert!(jobs.iter().all(|j| j.job.output_dir == dir.path()));
    }

    #[tokio::test]
    async fn per_song_output_joins_the_base_unless_absolute() {
        let dir = tempfile::tempdir().unwrap();
        let manifest: Manifest = toml::from_str(
            r#"
[defaults]
style = "pop"

[[songs]]
title = "Relative"
prompt = "p"
output = "custom/spot"

[[songs]]
title = "Absolute"
prompt = "p"
output = "/elsewhere/spot"
"#,
        )
        .unwrap();
        let jobs = prepare_jobs(
            &reqwest::Client::new(),
            &manifest,
            &AppConfig::default(),
            &options(dir.path()),
        )
        .await
        .unwrap();
        assert_eq!(jobs[0].job.output_dir, dir.path().join("custom/spot"));
        assert_eq!(jobs[1].job.output_dir, PathBuf::from("/elsewhere/spot"));
    }

    #[tokio::test]
    async fn cli_output_base_overrides_the_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let mut manifest: Manifest = toml::from_str(MANIFEST).unwrap();
        manifest.output_base = Some(PathBuf::from("/from-manifest"));

        let jobs = prepare_jobs(
            &reqwest::Client::new(),
            &manifest,
            &AppConfig::default(),
            &options(dir.path()),
        )
        .await
        .unwrap();
        assert_eq!(jobs[0].job.output_dir, dir.path().join("First"));

        let jobs = prepare_jobs(
            &reqwest::Client::new(),
            &manifest,
            &AppConfig::default(),
            &BatchOptions::default(),
        )
        .await
        .unwrap();
        assert_eq!(
            jobs[0].job.output_dir,
            PathBuf::from("/from-manifest").join("First")
        );
    }

    #[tokio::test]
    async fn empty_manifest_is_rejected() {
        let manifest: Manifest = toml::from_str("[defaults]\nmodel = \"V4\"\n").unwrap();
        assert!(matches!(
            manifest.validate(),
            Err(CliError::Manifest(_))
        ));
    }

    #[tokio::test]
    async fn songs_missing_title_or_style_abort_pre_flight() {
        let untitled: Manifest =
            toml::from_str("[[songs]]\nprompt = \"x\"\nstyle = \"pop\"\n").unwrap();
        assert!(matches!(
            untitled.validate(),
            Err(CliError::Manifest(msg)) if msg.contains("title")
        ));

        let styleless: Manifest =
            toml::from_str("[[songs]]\ntitle = \"T\"\nprompt = \"x\"\n").unwrap();
        assert!(matches!(
            styleless.validate(),
            Err(CliError::Manifest(msg)) if msg.contains("style")
        ));
    }

    #[tokio::test]
    async fn unknown_manifest_keys_are_rejected() {
        let result = toml::from_str::<Manifest>("[[songs]]\nprompt = \"x\"\nbogus = 1\n");
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn parallel_run_isolates_failures() {
        let dir = tempfile::tempdir().unwrap();
        let jobs = prepared(dir.path()).await;
        let api = FakeApi::new()
            .script("Second", JobScript::FailSubmit)
            .script(
                "Rainfall",
                JobScript::Fail {
                    message: "flagged".to_owned(),
                },
            );
        let counters = BatchCounters::default();

        run_parallel(&api, &jobs, &counters).await;

        assert_eq!(counters.submitted(), 2);
        assert_eq!(counters.completed(), 1);
        assert_eq!(counters.failed(), 2);
        assert_eq!(counters.summary(), "1 completed, 2 failed, 0 skipped");
        assert_eq!(
            counters.report(Duration::from_millis(12_340)),
            "1 completed, 2 failed, 0 skipped in 12.3s"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn parallel_run_times_out_stuck_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let jobs = prepared(dir.path()).await;
        let api = FakeApi::new().script("Second", JobScript::NeverFinish);
        let counters = BatchCounters::default();

        run_parallel(&api, &jobs, &counters).await;

        assert_eq!(counters.submitted(), 3);
        assert_eq!(counters.completed(), 2);
        assert_eq!(counters.failed(), 1);
        // The healthy jobs still produced their files.
        assert!(dir.path().join("First").join("metadata-task-1.json").exists());
    }

    #[tokio::test]
    async fn sequential_run_continues_past_failures() {
        let dir = tempfile::tempdir().unwrap();
        let jobs = prepared(dir.path()).await;
        let api = FakeApi::new().script(
            "First",
            JobScript::Fail {
                message: "flagged".to_owned(),
            },
        );
        let counters = BatchCounters::default();

        run_sequential(&api, &jobs, &counters, false, Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(counters.completed(), 2);
        assert_eq!(counters.failed(), 1);
        assert!(dir.path().join("second-song").exists());
    }
}
