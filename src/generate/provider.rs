use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::foundation::error::{ReelError, ReelResult};

/// One image-to-video request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// `data:<mime>;base64,...` of the start frame.
    pub image_data_uri: String,
    pub prompt: String,
    pub duration_sec: u32,
}

impl GenerationRequest {
    pub fn validate(&self) -> ReelResult<()> {
        if !self.image_data_uri.starts_with("data:") || self.image_data_uri.len() < 64 {
            return Err(ReelError::validation("start frame data URI is empty or malformed"));
        }
        if self.prompt.trim().is_empty() {
            return Err(ReelError::validation("motion prompt is empty"));
        }
        if self.duration_sec == 0 {
            return Err(ReelError::validation("clip duration must be positive"));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskHandle {
    pub id: String,
}

/// Provider-side state of a generation task.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskStatus {
    Running,
    Succeeded { outputs: Vec<String> },
    Failed { reason: String },
}

/// A status request that did not yield a status. Both kinds are retried.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PollError {
    #[error("network error: {0}")]
    Network(String),
    #[error("unreadable status response: {0}")]
    Malformed(String),
}

/// Remote image-to-video service.
pub trait VideoGenerator: Send + Sync {
    fn start(&self, request: &GenerationRequest) -> ReelResult<TaskHandle>;

    fn status(&self, task: &TaskHandle) -> Result<TaskStatus, PollError>;

    /// Fetch an output URL into `dest`.
    fn download(&self, url: &str, dest: &Path) -> ReelResult<()>;
}
