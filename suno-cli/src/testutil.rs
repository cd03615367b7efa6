//! Shared in-process fake of the remote API for orchestration tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::json;
use suno_api::{GenerateRequest, Result, SunoApi, SunoError, TaskSnapshot};

/// Behavior of one job, keyed by the submitted request's title (or prompt
/// when the title is absent).
#[derive(Debug, Clone)]
pub enum JobScript {
    FailSubmit,
    Succeed { variants: Vec<String> },
    Fail { message: String },
    NeverFinish,
}

pub struct FakeApi {
    scripts: Mutex<HashMap<String, JobScript>>,
    tasks: Mutex<HashMap<String, JobScript>>,
    next_id: AtomicUsize,
    pub submitted: Mutex<Vec<GenerateRequest>>,
    pub cover_requests: Mutex<Vec<String>>,
    pub fetched: Mutex<Vec<String>>,
    /// When true, `request_cover` errors out.
    pub cover_fails: bool,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            tasks: Mutex::new(HashMap::new()),
            next_id: AtomicUsize::new(1),
            submitted: Mutex::new(Vec::new()),
            cover_requests: Mutex::new(Vec::new()),
            fetched: Mutex::new(Vec::new()),
            cover_fails: false,
        }
    }

    pub fn script(self, key: &str, script: JobScript) -> Self {
        self.scripts.lock().unwrap().insert(key.to_owned(), script);
        self
    }

    fn key_for(request: &GenerateRequest) -> String {
        request
            .title
            .clone()
            .unwrap_or_else(|| request.prompt.clone())
    }

    fn success_snapshot(task_id: &str, variants: &[String]) -> TaskSnapshot {
        let tracks: Vec<_> = variants
            .iter()
            .enumerate()
            .map(|(i, title)| {
                json!({
                    "audioUrl": format!("https://cdn.fake/{task_id}/{}.mp3", i + 1),
                    "title": title,
                    "tags": "pop, upbeat",
                    "imageUrl": format!("https://cdn.fake/{task_id}/cover.jpeg"),
                })
            })
            .collect();
        TaskSnapshot::from_value(json!({
            "data": {
                "taskId": task_id,
                "status": "SUCCESS",
                "response": {"sunoData": tracks},
            }
        }))
        .unwrap()
    }
}

#[async_trait]
impl SunoApi for FakeApi {
    async fn submit(&self, request: &GenerateRequest) -> Result<String> {
        request.validate()?;
        self.submitted.lock().unwrap().push(request.clone());

        let key = Self::key_for(request);
        let script = self
            .scripts
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or(JobScript::Succeed {
                variants: vec![key.clone()],
            });
        if matches!(script, JobScript::FailSubmit) {
            return Err(SunoError::Api {
                status: 429,
                message: "insufficient credits".to_owned(),
            });
        }

        let id = format!("task-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.tasks.lock().unwrap().insert(id.clone(), script);
        Ok(id)
    }

    async fn poll_once(&self, task_id: &str) -> Result<TaskSnapshot> {
        // Cover results come back under audioUrl, as the live API serves them.
        if let Some(base) = task_id.strip_suffix("-cover") {
            return Ok(TaskSnapshot::from_value(json!({
                "data": {
                    "status": "SUCCESS",
                    "response": {"sunoData": [
                        {"audioUrl": format!("https://cdn.fake/{base}/generated-cover.png")}
                    ]},
                }
            }))
            .unwrap());
        }

        let script = self
            .tasks
            .lock()
            .unwrap()
            .get(task_id)
            .cloned()
            .ok_or(SunoError::MissingTaskId)?;
        let snapshot = match script {
            JobScript::Succeed { variants } => Self::success_snapshot(task_id, &variants),
            JobScript::Fail { message } => TaskSnapshot::from_value(json!({
                "data": {"status": "FAILED", "error": message}
            }))
            .unwrap(),
            JobScript::NeverFinish => {
                TaskSnapshot::from_value(json!({"data": {"status": "PENDING"}})).unwrap()
            }
            JobScript::FailSubmit => unreachable!("never assigned a task id"),
        };
        Ok(snapshot)
    }

    async fn fetch_asset(&self, url: &str, dest: &Path) -> Result<()> {
        self.fetched.lock().unwrap().push(url.to_owned());
        let bytes: &[u8] = if url.ends_with(".png") {
            &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]
        } else if url.ends_with(".jpeg") || url.ends_with(".jpg") {
            &[0xFF, 0xD8, 0xFF, 0xE0]
        } else {
            &[0xFF, 0xFB, 0x90, 0x00]
        };
        tokio::fs::write(dest, bytes).await?;
        Ok(())
    }

    async fn request_cover(&self, task_id: &str) -> Result<String> {
        self.cover_requests.lock().unwrap().push(task_id.to_owned());
        if self.cover_fails {
            return Err(SunoError::Api {
                status: 400,
                message: "cover generation unavailable".to_owned(),
            });
        }
        Ok(format!("{task_id}-cover"))
    }
}
