use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use suno_api::{Model, VocalGender};

#[derive(Debug, Parser)]
#[command(
    name = "suno",
    version,
    about = "Generate songs with Suno AI from the command line",
    long_about = "Generate songs with Suno AI from the command line.\n\n\
        Set your API key in the config file or via the SUNO_API_KEY environment variable."
)]
pub struct Args {
    /// Path to config file (default: ~/.suno-cli/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate music (simple mode with just a prompt, custom mode with title and style)
    Generate(GenerateArgs),
    /// Download a previously generated song by task id
    Download(DownloadArgs),
    /// Generate multiple songs from a batch manifest
    Batch(BatchArgs),
    /// Check the status of a generation task
    Status(StatusArgs),
    /// Create a default config file
    InitConfig(InitConfigArgs),
    /// Convert MP3s to MP4 videos with a static cover image (requires ffmpeg)
    Convert(ConvertArgs),
}

#[derive(Debug, ClapArgs)]
pub struct GenerateArgs {
    /// Lyrics/prompt (file path, URL, or direct string)
    #[arg(short, long)]
    pub prompt: String,

    /// Song title (max 80 chars) - required for custom mode
    #[arg(short, long)]
    pub title: Option<String>,

    /// Music style/genre (file path, URL, or direct string) - required for custom mode
    #[arg(short, long)]
    pub style: Option<String>,

    /// Output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// AI model (V5, V4_5PLUS, V4_5ALL, V4_5, V4)
    #[arg(short, long)]
    pub model: Option<Model>,

    /// Generate instrumental only (no vocals)
    #[arg(long)]
    pub instrumental: bool,

    /// Vocal gender (male, female)
    #[arg(short, long)]
    pub gender: Option<VocalGender>,

    /// Callback URL for task completion notifications
    #[arg(long)]
    pub callback_url: Option<String>,

    /// [Experimental] Song duration in seconds
    #[arg(short, long)]
    pub duration: Option<u32>,

    /// Custom cover image file (overrides the API cover)
    #[arg(short, long)]
    pub cover: Option<PathBuf>,

    /// Generate cover art via the API (costs extra credits)
    #[arg(long)]
    pub generate_cover: bool,

    /// Artist name for ID3 tags
    #[arg(long)]
    pub artist: Option<String>,

    /// Album name for ID3 tags
    #[arg(long)]
    pub album: Option<String>,

    /// Track number for ID3 tags
    #[arg(long)]
    pub track: Option<u32>,

    /// Skip ID3 tag embedding
    #[arg(long)]
    pub no_tags: bool,

    /// Filename template; placeholders: {track}, {artist}, {title}, {variant}
    #[arg(long)]
    pub filename_format: Option<String>,

    /// Suno API key
    #[arg(long, env = "SUNO_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Seconds between status polls
    #[arg(long)]
    pub poll_interval: Option<u64>,

    /// Maximum seconds to wait for completion
    #[arg(long)]
    pub max_wait: Option<u64>,
}

#[derive(Debug, ClapArgs)]
pub struct DownloadArgs {
    /// Task id from a previous generation
    pub task_id: String,

    /// Output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Filename template; placeholders: {track}, {artist}, {title}, {variant}
    #[arg(long)]
    pub filename_format: Option<String>,

    /// Suno API key
    #[arg(long, env = "SUNO_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

#[derive(Debug, ClapArgs)]
pub struct BatchArgs {
    /// Path or URL of the batch manifest (TOML)
    pub manifest: String,

    /// Base output directory (each song gets a subdirectory)
    #[arg(short, long)]
    pub output_base: Option<PathBuf>,

    /// Submit all songs first, then wait for all of them
    #[arg(short, long)]
    pub parallel: bool,

    /// Ask before processing each song (sequential mode only)
    #[arg(short, long)]
    pub interactive: bool,

    /// Seconds to wait between songs (sequential mode only)
    #[arg(short, long, default_value_t = 0)]
    pub delay: u64,

    /// Filename template; placeholders: {track}, {artist}, {title}, {variant}
    #[arg(long)]
    pub filename_format: Option<String>,

    /// Suno API key
    #[arg(long, env = "SUNO_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

#[derive(Debug, ClapArgs)]
pub struct StatusArgs {
    /// Task id to check
    pub task_id: String,

    /// Suno API key
    #[arg(long, env = "SUNO_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

#[derive(Debug, ClapArgs)]
pub struct InitConfigArgs {
    /// Where to write the config file (default: ~/.suno-cli/config.toml)
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Overwrite an existing config file without asking
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, ClapArgs)]
pub struct ConvertArgs {
    /// Input MP3 file, or a directory to convert every MP3 inside
    pub input: PathBuf,

    /// Output MP4 path (single file only; default: input with .mp4 extension)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Cover image (default: extracted from the MP3's ID3 tags)
    #[arg(short, long)]
    pub cover: Option<PathBuf>,

    /// Overwrite an existing output file
    #[arg(short = 'y', long)]
    pub overwrite: bool,
}
