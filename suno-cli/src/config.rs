//! TOML configuration with `${VAR}` environment interpolation.
//!
//! File values override hardcoded defaults and are themselves overridden by
//! explicit per-invocation or per-job values.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Deserialize;
use suno_api::{Model, VocalGender};

use crate::error::CliError;

pub const DEFAULT_ARTIST: &str = "Suno AI";
pub const DEFAULT_FILENAME_FORMAT: &str = "{track} - {artist} - {title} ({variant}).mp3";
pub const DEFAULT_POLL_INTERVAL: u64 = 10;
pub const DEFAULT_MAX_WAIT: u64 = 600;

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("static pattern"));

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub model: Option<Model>,
    pub gender: Option<VocalGender>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub filename_format: Option<String>,
    pub api_key: Option<String>,
    pub callback_url: Option<String>,
    pub poll_interval: Option<u64>,
    pub max_wait: Option<u64>,
}

impl AppConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".suno-cli").join("config.toml"))
    }

    /// Load from an explicit path or the default location. A missing file
    /// yields the built-in defaults; a malformed file is an error so the
    /// caller decides whether to warn or abort.
    pub fn load(path: Option<&Path>) -> Result<Self, CliError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&path)
            .map_err(|e| CliError::Config(format!("failed to read {}: {e}", path.display())))?;
        let interpolated = interpolate_env(&raw);
        toml::from_str(&interpolated)
            .map_err(|e| CliError::Config(format!("invalid TOML in {}: {e}", path.display())))
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.is_empty())
    }
}

/// Replace `${VAR}` with the environment variable's value; unknown
/// variables are left verbatim.
fn interpolate_env(raw: &str) -> String {
    ENV_VAR
        .replace_all(raw, |caps: &Captures<'_>| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_owned())
        })
        .into_owned()
}

pub const CONFIG_TEMPLATE: &str = r#"# suno-cli configuration file
# Place this at ~/.suno-cli/config.toml

# Default AI model to use
# Options: V5, V4_5PLUS, V4_5ALL, V4_5, V4
model = "V4_5ALL"

# Default vocal gender
# Options: male, female
gender = "male"

# Default output directory (optional)
# If not set, you must specify -o/--output for each command
# output_dir = "~/Music/generated"

# Default artist name for ID3 tags
artist = "Suno AI"

# Default album name for ID3 tags (optional)
# album = "My Album"

# Filename template (optional)
# Placeholders: {track}, {artist}, {title}, {variant}
# filename_format = "{track} - {artist} - {title} ({variant}).mp3"

# API key (supports environment variable substitution)
# You can also set the SUNO_API_KEY environment variable directly
api_key = "${SUNO_API_KEY}"

# Optional callback URL for async notifications
# callback_url = "https://example.com/callback"

# Polling settings
poll_interval = 10  # seconds between status checks
max_wait = 600      # maximum wait time in seconds
"#;

/// Write the commented template, creating parent directories as needed.
pub fn write_template(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, CONFIG_TEMPLATE)
}
