//! Subcommand implementations.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use suno_api::{GenerateRequest, SunoApi, SunoClient, WaitOptions, load_content};
use tracing::{info, warn};

use crate::batch::{self, BatchCounters, BatchOptions, Manifest};
use crate::cli::{
    Args, BatchArgs, Commands, ConvertArgs, DownloadArgs, GenerateArgs, InitConfigArgs,
    StatusArgs,
};
use crate::config::{
    self, AppConfig, DEFAULT_ARTIST, DEFAULT_FILENAME_FORMAT, DEFAULT_MAX_WAIT,
    DEFAULT_POLL_INTERVAL,
};
use crate::convert::{ConvertRequest, FfmpegEncoder};
use crate::error::{CliError, Result};
use crate::pipeline::{self, Job};

pub async fn dispatch(args: Args) -> Result<()> {
    let config = AppConfig::load(args.config.as_deref())?;
    match args.command {
        Commands::Generate(cmd) => generate(&config, cmd).await,
        Commands::Download(cmd) => download(&config, cmd).await,
        Commands::Batch(cmd) => run_batch(&config, cmd).await,
        Commands::Status(cmd) => status(&config, cmd).await,
        Commands::InitConfig(cmd) => init_config(cmd).await,
        Commands::Convert(cmd) => convert(cmd).await,
    }
}

fn require_api_key(flag: Option<String>, config: &AppConfig) -> Result<String> {
    flag.filter(|k| !k.is_empty())
        .or_else(|| config.api_key().map(str::to_owned))
        .ok_or_else(|| {
            CliError::Config(
                "no API key; pass --api-key, set SUNO_API_KEY, or add api_key to the config file"
                    .to_owned(),
            )
        })
}

fn require_output_dir(flag: Option<PathBuf>, config: &AppConfig) -> Result<PathBuf> {
    flag.or_else(|| config.output_dir.clone()).ok_or_else(|| {
        CliError::InvalidInput(
            "no output directory; pass -o/--output or set output_dir in the config file"
                .to_owned(),
        )
    })
}

fn wait_options(
    poll_interval: Option<u64>,
    max_wait: Option<u64>,
    config: &AppConfig,
) -> WaitOptions {
    WaitOptions {
        poll_interval: Duration::from_secs(
            poll_interval
                .or(config.poll_interval)
                .unwrap_or(DEFAULT_POLL_INTERVAL),
        ),
        max_wait: Duration::from_secs(max_wait.or(config.max_wait).unwrap_or(DEFAULT_MAX_WAIT)),
    }
}

fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed}]")
            .expect("static template"),
    );
    bar.set_message(message.to_owned());
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

async fn generate(config: &AppConfig, args: GenerateArgs) -> Result<()> {
    let api_key = require_api_key(args.api_key, config)?;
    let output_dir = require_output_dir(args.output, config)?;
    let callback = args.callback_url.or_else(|| config.callback_url.clone());
    let client = SunoClient::new(&api_key, callback.as_deref())?;

    let content_client = reqwest::Client::new();
    let prompt = load_content(&content_client, &args.prompt, "prompt").await?;
    let style = match &args.style {
        Some(source) => Some(load_content(&content_client, source, "style").await?),
        None => None,
    };
    if let Some(path) = &args.cover
        && !path.exists()
    {
        return Err(CliError::InvalidInput(format!(
            "cover image not found: {}",
            path.display()
        )));
    }

    let custom_mode = args.title.is_some() || style.is_some();
    let job = Job {
        request: GenerateRequest {
            prompt,
            title: args.title,
            style,
            model: args.model.or(config.model).unwrap_or_default(),
            vocal_gender: args.gender.or(config.gender).unwrap_or_default(),
            instrumental: args.instrumental,
            duration: args.duration,
            custom_mode,
        },
        output_dir,
        filename_format: args
            .filename_format
            .or_else(|| config.filename_format.clone())
            .unwrap_or_else(|| DEFAULT_FILENAME_FORMAT.to_owned()),
        artist: args
            .artist
            .or_else(|| config.artist.clone())
            .unwrap_or_else(|| DEFAULT_ARTIST.to_owned()),
        album: args.album.or_else(|| config.album.clone()),
        track: args.track,
        embed_tags: !args.no_tags,
        cover_file: args.cover,
        generate_cover: args.generate_cover,
        wait: wait_options(args.poll_interval, args.max_wait, config),
    };

    let bar = spinner("Generating song...");
    let result = pipeline::run(&client, &job).await;
    bar.finish_and_clear();
    let outcome = result?;

    println!("Task {} completed.", outcome.task_id);
    report_outcome_files(&outcome);
    Ok(())
}

async fn download(config: &AppConfig, args: DownloadArgs) -> Result<()> {
    let api_key = require_api_key(args.api_key, config)?;
    let output_dir = require_output_dir(args.output, config)?;
    let client = SunoClient::new(&api_key, config.callback_url.as_deref())?;

    let job = Job {
        request: GenerateRequest::default(),
        output_dir,
        filename_format: args
            .filename_format
            .or_else(|| config.filename_format.clone())
            .unwrap_or_else(|| DEFAULT_FILENAME_FORMAT.to_owned()),
        artist: config
            .artist
            .clone()
            .unwrap_or_else(|| DEFAULT_ARTIST.to_owned()),
        album: config.album.clone(),
        track: None,
        embed_tags: true,
        cover_file: None,
        generate_cover: false,
        wait: wait_options(None, None, config),
    };

    let bar = spinner("Fetching task...");
    let result = pipeline::finish(&client, &args.task_id, &job).await;
    bar.finish_and_clear();
    let outcome = result?;

    report_outcome_files(&outcome);
    Ok(())
}

fn report_outcome_files(outcome: &pipeline::JobOutcome) {
    for file in &outcome.files {
        println!("  {}", file.display());
    }
    if let Some(cover) = &outcome.cover_path {
        println!("  {}", cover.display());
    }
    println!("  {}", outcome.metadata_path.display());
}

async fn status(config: &AppConfig, args: StatusArgs) -> Result<()> {
    let api_key = require_api_key(args.api_key, config)?;
    let client = SunoClient::new(&api_key, config.callback_url.as_deref())?;

    let snapshot = client.poll_once(&args.task_id).await?;
    println!("Task:    {}", args.task_id);
    println!("Status:  {}", snapshot.status);
    if let Some(error) = &snapshot.error {
        println!("Error:   {error}");
    }
    for (i, track) in snapshot.tracks.iter().enumerate() {
        let title = track.title.as_deref().unwrap_or("(untitled)");
        let ready = track.audio_url.as_deref().is_some_and(|u| !u.is_empty());
        println!(
            "Variant {}: {title}{}",
            i + 1,
            if ready { "" } else { " (no audio yet)" }
        );
    }
    Ok(())
}

async fn init_config(args: InitConfigArgs) -> Result<()> {
    let path = match args.path.or_else(AppConfig::default_path) {
        Some(p) => p,
        None => {
            return Err(CliError::Config(
                "could not determine a home directory; pass --path".to_owned(),
            ));
        }
    };
    if path.exists() && !args.force {
        let message = format!("{} already exists. Overwrite?", path.display());
        let answer = tokio::task::spawn_blocking(move || {
            inquire::Confirm::new(&message).with_default(false).prompt()
        })
        .await
        .map_err(|e| CliError::InvalidInput(format!("prompt task failed: {e}")))?;
        match answer {
            Ok(true) => {}
            Ok(false) => {
                println!("Leaving the existing config in place.");
                return Ok(());
            }
            Err(
                inquire::InquireError::OperationCanceled
                | inquire::InquireError::OperationInterrupted,
            ) => return Err(CliError::Interrupted),
            Err(e) => return Err(CliError::InvalidInput(format!("prompt failed: {e}"))),
        }
    }
    config::write_template(&path)?;
    println!("Config written to {}", path.display());
    println!("Edit it to set your API key, or export SUNO_API_KEY.");
    Ok(())
}

async fn run_batch(config: &AppConfig, args: BatchArgs) -> Result<()> {
    let api_key = require_api_key(args.api_key, config)?;
    let client = SunoClient::new(&api_key, config.callback_url.as_deref())?;

    let content_client = reqwest::Client::new();
    let manifest = Manifest::load(&content_client, &args.manifest).await?;
    let jobs = batch::prepare_jobs(
        &content_client,
        &manifest,
        config,
        &BatchOptions {
            output_base: args.output_base,
            filename_format: args.filename_format,
        },
    )
    .await?;
    info!(songs = jobs.len(), parallel = args.parallel, "starting batch");

    let started = std::time::Instant::now();
    let counters = Arc::new(BatchCounters::default());
    let run = async {
        if args.parallel {
            if args.interactive {
                warn!("--interactive has no effect in parallel mode");
            }
            batch::run_parallel(&client, &jobs, &counters).await;
            Ok(())
        } else {
            batch::run_sequential(
                &client,
                &jobs,
                &counters,
                args.interactive,
                Duration::from_secs(args.delay),
            )
            .await
        }
    };

    let result = tokio::select! {
        result = run => result,
        _ = tokio::signal::ctrl_c() => {
            eprintln!();
            Err(CliError::Interrupted)
        }
    };
    if let Err(e) = result {
        if e.is_interrupted() {
            eprintln!("Interrupted: {}", counters.report(started.elapsed()));
        }
        return Err(e);
    }

    println!("Batch finished: {}", counters.report(started.elapsed()));
    if counters.completed() == 0 {
        return Err(CliError::InvalidInput(
            "no songs completed successfully".to_owned(),
        ));
    }
    Ok(())
}

async fn convert(args: ConvertArgs) -> Result<()> {
    FfmpegEncoder::ensure_available().await?;
    if args.input.is_dir() {
        let outputs =
            crate::convert::convert_directory(&FfmpegEncoder, &args.input, args.overwrite)
                .await?;
        for output in &outputs {
            println!("Video written to {}", output.display());
        }
        return Ok(());
    }
    let output = crate::convert::convert(
        &FfmpegEncoder,
        &ConvertRequest {
            input: args.input,
            output: args.output,
            cover: args.cover,
            overwrite: args.overwrite,
        },
    )
    .await?;
    println!("Video written to {}", output.display());
    Ok(())
}
