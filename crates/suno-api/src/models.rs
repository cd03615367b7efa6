//! Wire schemas for the sunoapi.org endpoints.
//!
//! The vendor's response shapes are loosely specified; where the field
//! placement varies in practice (`taskId` at top level or under `data`,
//! audio URLs under several key spellings) the schemas carry explicit
//! fallbacks rather than ad-hoc lookups.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SunoError};

/// Generation model identifiers accepted by the API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Model {
    V5,
    #[serde(rename = "V4_5PLUS")]
    V4_5Plus,
    #[default]
    #[serde(rename = "V4_5ALL")]
    V4_5All,
    V4_5,
    V4,
}

impl Model {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V5 => "V5",
            Self::V4_5Plus => "V4_5PLUS",
            Self::V4_5All => "V4_5ALL",
            Self::V4_5 => "V4_5",
            Self::V4 => "V4",
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Model {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "V5" => Ok(Self::V5),
            "V4_5PLUS" => Ok(Self::V4_5Plus),
            "V4_5ALL" => Ok(Self::V4_5All),
            "V4_5" => Ok(Self::V4_5),
            "V4" => Ok(Self::V4),
            other => Err(format!(
                "unknown model '{other}' (expected V5, V4_5PLUS, V4_5ALL, V4_5 or V4)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VocalGender {
    #[default]
    Male,
    Female,
}

impl fmt::Display for VocalGender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Male => f.write_str("male"),
            Self::Female => f.write_str("female"),
        }
    }
}

impl FromStr for VocalGender {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            other => Err(format!("unknown vocal gender '{other}' (expected male or female)")),
        }
    }
}

/// One song generation request.
///
/// Custom mode requires a non-empty title (the API caps it at 80 chars) and
/// style; in simple mode the remote system infers both from the prompt.
#[derive(Debug, Clone, Default)]
pub struct GenerateRequest {
    pub prompt: String,
    pub title: Option<String>,
    pub style: Option<String>,
    pub model: Model,
    pub vocal_gender: VocalGender,
    pub instrumental: bool,
    pub duration: Option<u32>,
    pub custom_mode: bool,
}

impl GenerateRequest {
    /// Mode invariant check, performed before any remote call.
    pub fn validate(&self) -> Result<()> {
        if self.custom_mode {
            let has_title = self.title.as_deref().is_some_and(|t| !t.trim().is_empty());
            let has_style = self.style.as_deref().is_some_and(|s| !s.trim().is_empty());
            if !has_title || !has_style {
                return Err(SunoError::InvalidRequest(
                    "custom mode requires both title and style".to_owned(),
                ));
            }
        }
        Ok(())
    }

    /// Build the wire payload. In simple mode `title` and `style` are sent
    /// as empty strings rather than omitted; `duration` is included only
    /// when provided.
    pub(crate) fn payload(&self, callback_url: &str) -> GeneratePayload {
        let (title, style) = if self.custom_mode {
            (
                self.title.clone().unwrap_or_default(),
                self.style.clone().unwrap_or_default(),
            )
        } else {
            (String::new(), String::new())
        };

        GeneratePayload {
            custom_mode: self.custom_mode,
            instrumental: self.instrumental,
            prompt: self.prompt.clone(),
            model: self.model,
            call_back_url: callback_url.to_owned(),
            vocal_gender: self.vocal_gender,
            title,
            style,
            duration: self.duration,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeneratePayload {
    pub custom_mode: bool,
    pub instrumental: bool,
    pub prompt: String,
    pub model: Model,
    pub call_back_url: String,
    pub vocal_gender: VocalGender,
    pub title: String,
    pub style: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
}

/// Response to a submit or cover request. The task id may sit at the top
/// level or nested under `data`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitResponse {
    #[serde(default, rename = "taskId")]
    task_id: Option<String>,
    #[serde(default)]
    data: Option<SubmitData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SubmitData {
    #[serde(default, rename = "taskId")]
    task_id: Option<String>,
}

impl SubmitResponse {
    pub fn task_id(self) -> Result<String> {
        if let Some(id) = self.task_id
            && !id.is_empty()
        {
            return Ok(id);
        }
        if let Some(data) = self.data
            && let Some(id) = data.task_id
            && !id.is_empty()
        {
            return Ok(id);
        }
        Err(SunoError::MissingTaskId)
    }
}

/// Remote job state. `SUCCESS` and `TEXT_SUCCESS` are both terminal
/// successes; anything unrecognized maps to `Unknown` and is treated as
/// still in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Pending,
    Success,
    TextSuccess,
    Failed,
    #[serde(other)]
    Unknown,
}

impl TaskStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success | Self::TextSuccess)
    }

    pub fn is_terminal(&self) -> bool {
        self.is_success() || matches!(self, Self::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Success => "SUCCESS",
            Self::TextSuccess => "TEXT_SUCCESS",
            Self::Failed => "FAILED",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct StatusResponse {
    data: Option<TaskData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct TaskData {
    status: TaskStatus,
    response: Option<TaskResponse>,
    error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct TaskResponse {
    #[serde(default, rename = "sunoData")]
    suno_data: Vec<Track>,
}

/// One generated variant of a job.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Track {
    #[serde(alias = "sourceAudioUrl", alias = "audio_url")]
    pub audio_url: Option<String>,
    pub title: Option<String>,
    pub tags: Option<String>,
    pub image_url: Option<String>,
    pub duration: Option<f64>,
}

/// Result of a single status poll: typed view plus the raw `data` object,
/// kept verbatim for the on-disk metadata snapshot.
#[derive(Debug, Clone)]
pub struct TaskSnapshot {
    pub status: TaskStatus,
    pub tracks: Vec<Track>,
    pub error: Option<String>,
    pub raw: serde_json::Value,
}

impl TaskSnapshot {
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let raw = value
            .get("data")
            .cloned()
            .unwrap_or(serde_json::Value::Null);
        let parsed: StatusResponse = serde_json::from_value(value)?;
        let data = parsed.data.unwrap_or_default();
        Ok(Self {
            status: data.status,
            tracks: data.response.map(|r| r.suno_data).unwrap_or_default(),
            error: data.error,
            raw,
        })
    }

    /// Audio URLs of all variants, skipping entries with no usable URL.
    pub fn audio_urls(&self) -> Vec<String> {
        self.tracks
            .iter()
            .filter_map(|t| t.audio_url.clone())
            .filter(|u| !u.is_empty())
            .collect()
    }
}

/// Normalized tag view of a result payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackTags {
    pub title: Option<String>,
    pub genre: Option<String>,
    pub cover_url: Option<String>,
}

/// Extract tags from the first variant only; remaining variants' tag data
/// is never surfaced. Missing fields stay absent — defaulting is the
/// caller's concern.
pub fn extract_track_tags(tracks: &[Track]) -> TrackTags {
    let Some(first) = tracks.first() else {
        return TrackTags::default();
    };
    TrackTags {
        title: first.title.clone(),
        genre: first.tags.clone(),
        cover_url: first.image_url.clone(),
    }
}
