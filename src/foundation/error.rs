use std::fmt;

pub type ReelResult<T> = Result<T, ReelError>;

/// Pipeline stage an error is attributed to.
///
/// The orchestrator uses the stage to tell the user what went wrong and what to try next.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Input,
    Cutout,
    Layout,
    Composite,
    Generation,
    Download,
    Probe,
    Stitch,
    Title,
    Concat,
    AmbientBackground,
    CornerWatermark,
    FullWatermark,
    Mux,
    Cleanup,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Cutout => "cutout",
            Self::Layout => "layout",
            Self::Composite => "composite",
            Self::Generation => "generation",
            Self::Download => "download",
            Self::Probe => "probe",
            Self::Stitch => "stitch",
            Self::Title => "title",
            Self::Concat => "concat",
            Self::AmbientBackground => "ambient-background",
            Self::CornerWatermark => "corner-watermark",
            Self::FullWatermark => "full-watermark",
            Self::Mux => "mux",
            Self::Cleanup => "cleanup",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Distinguishes why an external service call did not produce a usable result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceStatus {
    Timeout,
    Network,
    GenerationFailed,
    NoOutput,
    Rejected,
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Timeout => "timeout",
            Self::Network => "network error",
            Self::GenerationFailed => "generation failed",
            Self::NoOutput => "no output",
            Self::Rejected => "request rejected",
        })
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("external service error at {stage} ({status}): {message}")]
    ExternalService {
        stage: Stage,
        status: ServiceStatus,
        message: String,
    },

    #[error("media processing error at {stage}: {message}")]
    Media { stage: Stage, message: String },

    #[error("render error: {0}")]
    Render(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReelError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn service(stage: Stage, status: ServiceStatus, msg: impl Into<String>) -> Self {
        Self::ExternalService {
            stage,
            status,
            message: msg.into(),
        }
    }

    pub fn media(stage: Stage, msg: impl Into<String>) -> Self {
        Self::Media {
            stage,
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Stage the error is attributed to, when it carries one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Validation(_) => Some(Stage::Input),
            Self::ExternalService { stage, .. } | Self::Media { stage, .. } => Some(*stage),
            Self::Render(_) | Self::Serde(_) | Self::Other(_) => None,
        }
    }

    /// Short, user-facing suggestion for recovering from this error.
    pub fn remedy(&self) -> &'static str {
        match self {
            Self::Validation(_) => "check the photos, framing and files you selected",
            Self::ExternalService {
                stage: Stage::Cutout,
                ..
            } => "try a different photo with a clearly visible person",
            Self::ExternalService {
                status: ServiceStatus::Timeout | ServiceStatus::Network,
                ..
            } => "the service is busy, try again in a few minutes",
            Self::ExternalService { .. } => "try a different photo or a different background",
            Self::Media {
                stage: Stage::Mux, ..
            } => "try a different music file",
            Self::Media { .. } => "try again, or pick a different background",
            Self::Render(_) | Self::Serde(_) | Self::Other(_) => "try again later",
        }
    }

    /// Return `true` when the error came from a transient condition worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ExternalService {
                status: ServiceStatus::Timeout | ServiceStatus::Network,
                ..
            }
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
