//! HTTP client for the sunoapi.org endpoints.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Response};
use serde_json::json;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{Result, SunoError};
use crate::models::{GenerateRequest, SubmitResponse, TaskSnapshot};

pub const BASE_URL: &str = "https://api.sunoapi.org/api/v1";

/// The API requires a callback URL even when polling is used instead.
pub const DEFAULT_CALLBACK_URL: &str = "https://example.com/callback";

const API_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Remote job operations, as a seam so orchestrators can run against fakes.
#[async_trait]
pub trait SunoApi: Send + Sync {
    /// Submit a generation job; returns the task id for later polling.
    async fn submit(&self, request: &GenerateRequest) -> Result<String>;

    /// Fetch the current job state with a single request; never blocks
    /// beyond that request.
    async fn poll_once(&self, task_id: &str) -> Result<TaskSnapshot>;

    /// Stream a binary asset to disk. No retry.
    async fn fetch_asset(&self, url: &str, dest: &Path) -> Result<()>;

    /// Submit a follow-up cover-art job for a completed task. The remote
    /// system accepts this once per task and costs extra credits.
    async fn request_cover(&self, task_id: &str) -> Result<String>;
}

/// Client holding one authenticated connection for the lifetime of a
/// command invocation. Asset downloads go through a separate plain client
/// so the bearer token is never sent to CDN hosts.
#[derive(Debug, Clone)]
pub struct SunoClient {
    api: Client,
    assets: Client,
    base_url: String,
    callback_url: String,
}

impl SunoClient {
    pub fn new(api_key: &str, callback_url: Option<&str>) -> Result<Self> {
        Self::with_base_url(api_key, callback_url, BASE_URL)
    }

    pub fn with_base_url(
        api_key: &str,
        callback_url: Option<&str>,
        base_url: &str,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|_| {
            SunoError::InvalidRequest("API key contains invalid header characters".to_owned())
        })?;
        auth.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, auth);

        let api = Client::builder()
            .default_headers(headers)
            .timeout(API_TIMEOUT)
            .build()?;
        let assets = Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?;

        Ok(Self {
            api,
            assets,
            base_url: base_url.trim_end_matches('/').to_owned(),
            callback_url: callback_url.unwrap_or(DEFAULT_CALLBACK_URL).to_owned(),
        })
    }

    async fn error_for_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(SunoError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl SunoApi for SunoClient {
    async fn submit(&self, request: &GenerateRequest) -> Result<String> {
        request.validate()?;
        let payload = request.payload(&self.callback_url);
        debug!(model = %request.model, custom_mode = request.custom_mode, "submitting generation request");

        let response = self
            .api
            .post(format!("{}/generate", self.base_url))
            .json(&payload)
            .send()
            .await?;
        let response = Self::error_for_status(response).await?;
        let parsed: SubmitResponse = response.json().await?;
        parsed.task_id()
    }

    async fn poll_once(&self, task_id: &str) -> Result<TaskSnapshot> {
        let response = self
            .api
            .get(format!("{}/generate/record-info", self.base_url))
            .query(&[("taskId", task_id)])
            .send()
            .await?;
        let response = Self::error_for_status(response).await?;
        let value: serde_json::Value = response.json().await?;
        TaskSnapshot::from_value(value)
    }

    async fn fetch_asset(&self, url: &str, dest: &Path) -> Result<()> {
        let response = self.assets.get(url).send().await?;
        let response = Self::error_for_status(response).await?;

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;
        debug!(url, dest = %dest.display(), "asset downloaded");
        Ok(())
    }

    async fn request_cover(&self, task_id: &str) -> Result<String> {
        let payload = json!({
            "taskId": task_id,
            "callBackUrl": self.callback_url,
        });
        let response = self
            .api
            .post(format!("{}/generate/cover", self.base_url))
            .json(&payload)
            .send()
            .await?;
        let response = Self::error_for_status(response).await?;
        let parsed: SubmitResponse = response.json().await?;
        parsed.task_id()
    }
}
