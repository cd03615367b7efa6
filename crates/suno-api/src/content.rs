//! Resolve a parameter that may be a URL, a local file path, or a literal
//! string into text content.

use std::path::Path;

use reqwest::Client;
use tracing::{debug, info};

use crate::error::{Result, SunoError};

/// Classification is by priority: URL scheme prefix first, then an existing
/// local file, and anything else is taken as the literal content. Only the
/// first two can fail.
pub async fn load_content(client: &Client, source: &str, label: &str) -> Result<String> {
    if source.starts_with("http://") || source.starts_with("https://") {
        info!(url = source, "fetching {label} from URL");
        let response = client
            .get(source)
            .send()
            .await
            .map_err(|e| SunoError::content(label, e))?;
        if !response.status().is_success() {
            return Err(SunoError::content(
                label,
                format!("HTTP {} from {source}", response.status()),
            ));
        }
        let text = response
            .text()
            .await
            .map_err(|e| SunoError::content(label, e))?;
        return Ok(text.trim().to_owned());
    }

    let path = Path::new(source);
    if path.exists() {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SunoError::content(label, format!("{}: {e}", path.display())))?;
        info!(file = %path.display(), "loaded {label} from file");
        return Ok(text.trim().to_owned());
    }

    debug!(chars = source.len(), "using literal {label} string");
    Ok(source.to_owned())
}
