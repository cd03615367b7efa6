//! Filename rendering from a placeholder template.

use std::path::{Path, PathBuf};

/// Parameters available to the filename template.
#[derive(Debug, Clone, Default)]
pub struct FilenameParams<'a> {
    pub title: Option<&'a str>,
    pub artist: Option<&'a str>,
    pub track: Option<u32>,
    pub variant: usize,
}

/// Render `format` by substituting `{track}`, `{artist}`, `{title}` and
/// `{variant}`, then sanitize the result for the filesystem.
///
/// Missing title or artist become "Unknown"; a missing track renders as the
/// empty string. Track numbers under 100 are zero-padded to two digits.
pub fn render(format: &str, params: &FilenameParams<'_>) -> String {
    let track = match params.track {
        Some(n) if n < 100 => format!("{n:02}"),
        Some(n) => n.to_string(),
        None => String::new(),
    };
    let rendered = format
        .replace("{track}", &track)
        .replace("{artist}", params.artist.unwrap_or("Unknown"))
        .replace("{title}", params.title.unwrap_or("Unknown"))
        .replace("{variant}", &params.variant.to_string());
    sanitize(&rendered)
}

/// Replace characters that are unsafe in filenames on common filesystems.
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            other => other,
        })
        .collect::<String>()
        .trim()
        .to_owned()
}

/// Full output path for one variant within the output directory.
pub fn output_path(dir: &Path, format: &str, params: &FilenameParams<'_>) -> PathBuf {
    dir.join(render(format, params))
}
