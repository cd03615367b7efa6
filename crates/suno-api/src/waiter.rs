//! Poll a task until a terminal state or a wall-clock deadline.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::client::SunoApi;
use crate::error::{Result, SunoError};
use crate::models::{TaskStatus, Track};

/// Fixed-interval polling parameters. No backoff: the remote side tolerates
/// steady low-frequency polling, and a predictable cadence keeps the
/// timeout accounting simple.
#[derive(Debug, Clone)]
pub struct WaitOptions {
    pub poll_interval: Duration,
    pub max_wait: Duration,
}

impl WaitOptions {
    /// Defaults for song generation, which typically takes 2-3 minutes.
    pub fn song() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            max_wait: Duration::from_secs(600),
        }
    }

    /// Defaults for cover-art generation, which completes faster.
    pub fn cover() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            max_wait: Duration::from_secs(300),
        }
    }
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self::song()
    }
}

/// Outcome of a successful wait.
#[derive(Debug, Clone)]
pub struct Completed {
    pub audio_urls: Vec<String>,
    pub tracks: Vec<Track>,
    /// The raw `data` object of the final status response, persisted
    /// verbatim as the metadata snapshot.
    pub raw: serde_json::Value,
}

/// Poll `task_id` until it reaches a terminal state.
///
/// Terminal success with zero variants is itself a failure
/// ([`SunoError::NoResultData`]). A `FAILED` state carries the
/// remote-supplied message. While the task is `PENDING` or `UNKNOWN` the
/// loop sleeps for the configured interval between polls; once the elapsed
/// wall-clock time exceeds `max_wait` it gives up with
/// [`SunoError::Timeout`].
pub async fn wait_for_completion(
    api: &dyn SunoApi,
    task_id: &str,
    options: &WaitOptions,
) -> Result<Completed> {
    let started = Instant::now();

    loop {
        let snapshot = api.poll_once(task_id).await?;
        debug!(task_id, status = %snapshot.status, "poll");

        if snapshot.status.is_success() {
            let audio_urls = snapshot.audio_urls();
            if audio_urls.is_empty() {
                return Err(SunoError::NoResultData(task_id.to_owned()));
            }
            return Ok(Completed {
                audio_urls,
                tracks: snapshot.tracks,
                raw: snapshot.raw,
            });
        }

        if snapshot.status == TaskStatus::Failed {
            return Err(SunoError::GenerationFailed(
                snapshot.error.unwrap_or_else(|| "unknown error".to_owned()),
            ));
        }

        let waited = started.elapsed();
        if waited >= options.max_wait {
            return Err(SunoError::Timeout {
                task_id: task_id.to_owned(),
                waited,
            });
        }
        tokio::time::sleep(options.poll_interval).await;
    }
}
