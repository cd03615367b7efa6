//! ID3v2 tag embedding for downloaded MP3s.

use std::path::Path;

use chrono::Datelike;
use id3::frame::{Picture, PictureType};
use id3::{Tag, TagLike, Version};
use tracing::debug;

use crate::error::{CliError, Result};

/// Text metadata for one track. The cover image travels separately since
/// resolving it may involve network or filesystem work.
#[derive(Debug, Clone, Default)]
pub struct TagParams<'a> {
    pub title: &'a str,
    pub artist: &'a str,
    pub album: Option<&'a str>,
    pub track: Option<u32>,
    pub genre: Option<&'a str>,
}

/// Write an ID3v2.3 tag to `path`, replacing any existing tag. The year is
/// always the current one; absent fields are simply not written.
pub fn embed(path: &Path, params: &TagParams<'_>, cover: Option<&[u8]>) -> Result<()> {
    let mut tag = Tag::new();
    tag.set_title(params.title);
    tag.set_artist(params.artist);
    tag.set_year(chrono::Utc::now().year());
    if let Some(album) = params.album {
        tag.set_album(album);
        tag.set_album_artist(params.artist);
    }
    if let Some(track) = params.track {
        tag.set_track(track);
    }
    if let Some(genre) = params.genre {
        tag.set_genre(genre);
    }
    if let Some(data) = cover {
        tag.add_frame(Picture {
            mime_type: sniff_image_mime(data).to_owned(),
            picture_type: PictureType::CoverFront,
            description: String::new(),
            data: data.to_vec(),
        });
    }

    tag.write_to_path(path, Version::Id3v23)
        .map_err(|e| CliError::InvalidInput(format!("tagging {} failed: {e}", path.display())))?;
    debug!(file = %path.display(), title = params.title, "ID3 tags written");
    Ok(())
}

/// Front cover bytes from an MP3's existing tag, if any.
pub fn extract_cover(path: &Path) -> Option<Vec<u8>> {
    let tag = Tag::read_from_path(path).ok()?;
    tag.pictures()
        .find(|p| p.picture_type == PictureType::CoverFront)
        .or_else(|| tag.pictures().next())
        .map(|p| p.data.clone())
}

fn sniff_image_mime(data: &[u8]) -> &'static str {
    if data.starts_with(&[0x89, b'P', b'N', b'G']) {
        "image/png"
    } else if data.starts_with(b"GIF8") {
        "image/gif"
    } else {
        // JPEG is the API's usual cover format, so it doubles as the fallback.
        "image/jpeg"
    }
}
