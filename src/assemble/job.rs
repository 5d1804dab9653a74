use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::effects::watermark::WatermarkConfig;
use crate::foundation::error::{ReelError, ReelResult};
use crate::title::plan::TitleSpec;

/// A clip on disk and the duration it is expected to have.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClipRef {
    pub path: PathBuf,
    pub duration_sec: f64,
}

impl ClipRef {
    pub fn new(path: impl Into<PathBuf>, duration_sec: f64) -> Self {
        Self {
            path: path.into(),
            duration_sec,
        }
    }
}

/// Everything needed to turn generated clips into the deliverable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RenderJob {
    pub clips: Vec<ClipRef>,
    #[serde(default)]
    pub background_overlay: Option<PathBuf>,
    #[serde(default)]
    pub music: Option<PathBuf>,
    #[serde(default)]
    pub title: Option<TitleSpec>,
    /// Decoration for memorial cards.
    #[serde(default)]
    pub decoration: Option<PathBuf>,
    /// Full-frame watermark; `None` for paid scenes.
    #[serde(default)]
    pub watermark: Option<WatermarkConfig>,
    pub output: PathBuf,
}

impl RenderJob {
    pub fn new(clips: Vec<ClipRef>, output: impl Into<PathBuf>) -> Self {
        Self {
            clips,
            background_overlay: None,
            music: None,
            title: None,
            decoration: None,
            watermark: None,
            output: output.into(),
        }
    }

    pub fn validate(&self) -> ReelResult<()> {
        if self.clips.is_empty() {
            return Err(ReelError::validation("render job has no clips"));
        }
        for clip in &self.clips {
            require_file(&clip.path, "clip")?;
            if !(clip.duration_sec.is_finite() && clip.duration_sec >= 0.0) {
                return Err(ReelError::validation(format!(
                    "clip '{}' has an invalid duration {}",
                    clip.path.display(),
                    clip.duration_sec
                )));
            }
        }
        if let Some(p) = &self.background_overlay {
            require_file(p, "background overlay")?;
        }
        if let Some(p) = &self.music {
            require_file(p, "music")?;
        }
        if let Some(w) = &self.watermark {
            w.validate()?;
        }
        Ok(())
    }
}

fn require_file(path: &Path, what: &str) -> ReelResult<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ReelError::validation(format!(
            "{what} file '{}' not found",
            path.display()
        )))
    }
}
