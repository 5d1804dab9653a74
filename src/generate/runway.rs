use std::path::Path;
use std::time::Duration;

use anyhow::Context as _;
use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::foundation::error::{ReelError, ReelResult, ServiceStatus, Stage};
use crate::generate::provider::{
    GenerationRequest, PollError, TaskHandle, TaskStatus, VideoGenerator,
};
use crate::media::runner::ensure_parent_dir;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunwayConfig {
    pub base_url: String,
    pub api_version: String,
    pub start_timeout_sec: u64,
    pub status_timeout_sec: u64,
    pub download_timeout_sec: u64,
}

impl Default for RunwayConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.dev.runwayml.com/v1".to_string(),
            api_version: "2024-11-06".to_string(),
            start_timeout_sec: 60,
            status_timeout_sec: 30,
            download_timeout_sec: 300,
        }
    }
}

/// Blocking client for the Runway image-to-video API.
pub struct RunwayClient {
    http: Client,
    api_key: String,
    config: RunwayConfig,
}

impl std::fmt::Debug for RunwayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunwayClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RunwayClient {
    pub fn new(api_key: impl Into<String>, config: RunwayConfig) -> ReelResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ReelError::validation("video generation API key is not set"));
        }
        let http = Client::builder()
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            api_key,
            config,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.config.base_url.trim_end_matches('/'))
    }

    fn authed(&self, req: reqwest::blocking::RequestBuilder) -> reqwest::blocking::RequestBuilder {
        req.header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header("X-Runway-Version", &self.config.api_version)
    }
}

/// Request bodies in the order they are tried. Older API revisions reject the first shape.
pub fn payload_variants(request: &GenerationRequest) -> Vec<Value> {
    let image = &request.image_data_uri;
    let prompt = &request.prompt;
    let duration = request.duration_sec;
    vec![
        json!({
            "model": "gen4_turbo",
            "promptImage": image,
            "promptText": prompt,
            "ratio": "720:1280",
            "duration": duration,
        }),
        json!({
            "model": "gen4_turbo",
            "image": image,
            "prompt": prompt,
            "aspect_ratio": "9:16",
            "duration": duration,
        }),
        json!({
            "model": "gen3a_turbo",
            "image": image,
            "prompt": prompt,
            "aspect_ratio": "9:16",
            "duration": duration,
        }),
    ]
}

/// Task id from a start response: `id` or `task.id`.
pub fn task_id(body: &Value) -> Option<String> {
    body.get("id")
        .or_else(|| body.get("task").and_then(|t| t.get("id")))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Map a `/tasks/{id}` body to a [`TaskStatus`].
pub fn parse_task_status(body: &Value) -> Result<TaskStatus, PollError> {
    let status = body
        .get("status")
        .and_then(Value::as_str)
        .ok_or_else(|| PollError::Malformed("missing status".to_string()))?;
    Ok(match status {
        "SUCCEEDED" => {
            let outputs = body
                .get("output")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|item| {
                            item.as_str()
                                .or_else(|| item.get("url").and_then(Value::as_str))
                                .map(str::to_string)
                        })
                        .collect()
                })
                .unwrap_or_default();
            TaskStatus::Succeeded { outputs }
        }
        "FAILED" | "ERROR" | "CANCELED" => {
            let detail = ["failure", "failure_reason", "error", "message"]
                .iter()
                .find_map(|k| body.get(*k).and_then(Value::as_str))
                .unwrap_or_default();
            TaskStatus::Failed {
                reason: if detail.is_empty() {
                    status.to_string()
                } else {
                    format!("{status}: {detail}")
                },
            }
        }
        _ => TaskStatus::Running,
    })
}

impl VideoGenerator for RunwayClient {
    #[tracing::instrument(skip(self, request), fields(prompt_len = request.prompt.len()))]
    fn start(&self, request: &GenerationRequest) -> ReelResult<TaskHandle> {
        request.validate()?;
        let mut last_error = String::new();
        for payload in payload_variants(request) {
            let model = payload["model"].as_str().unwrap_or_default().to_string();
            let resp = self
                .authed(self.http.post(self.url("image_to_video")))
                .header(CONTENT_TYPE, "application/json")
                .timeout(Duration::from_secs(self.config.start_timeout_sec))
                .json(&payload)
                .send();
            let resp = match resp {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(%model, error = %e, "start request failed");
                    last_error = e.to_string();
                    continue;
                }
            };
            let status = resp.status();
            if !status.is_success() {
                let text = resp.text().unwrap_or_default();
                tracing::warn!(%model, %status, body = %text, "start rejected");
                last_error = format!("{status}: {text}");
                continue;
            }
            let body: Value = resp.json().map_err(|e| {
                ReelError::service(Stage::Generation, ServiceStatus::NoOutput, e.to_string())
            })?;
            let id = task_id(&body).ok_or_else(|| {
                ReelError::service(
                    Stage::Generation,
                    ServiceStatus::NoOutput,
                    "start response has no task id",
                )
            })?;
            tracing::info!(%model, task = %id, "generation started");
            return Ok(TaskHandle { id });
        }
        Err(ReelError::service(
            Stage::Generation,
            ServiceStatus::Rejected,
            format!("every payload variant was rejected; last: {last_error}"),
        ))
    }

    fn status(&self, task: &TaskHandle) -> Result<TaskStatus, PollError> {
        let resp = self
            .authed(self.http.get(self.url(&format!("tasks/{}", task.id))))
            .timeout(Duration::from_secs(self.config.status_timeout_sec))
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| PollError::Network(e.to_string()))?;
        let body: Value = resp
            .json()
            .map_err(|e| PollError::Malformed(e.to_string()))?;
        let status = parse_task_status(&body)?;
        tracing::debug!(task = %task.id, ?status, "poll");
        Ok(status)
    }

    #[tracing::instrument(skip(self), fields(dest = %dest.display()))]
    fn download(&self, url: &str, dest: &Path) -> ReelResult<()> {
        let network = |e: reqwest::Error| {
            ReelError::service(Stage::Download, ServiceStatus::Network, e.to_string())
        };
        let mut resp = self
            .http
            .get(url)
            .timeout(Duration::from_secs(self.config.download_timeout_sec))
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(network)?;
        ensure_parent_dir(dest)?;
        let mut file = std::fs::File::create(dest)
            .with_context(|| format!("create '{}'", dest.display()))?;
        resp.copy_to(&mut file).map_err(network)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/generate/runway.rs"]
mod tests;
