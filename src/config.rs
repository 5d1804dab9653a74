use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::assemble::overlay::AssemblyParams;
use crate::cutout::provider::{AlphaPassthrough, BestOfCutout, CommandCutoutProvider, CutoutProvider};
use crate::effects::watermark::WatermarkConfig;
use crate::foundation::error::{ReelError, ReelResult};
use crate::generate::payload::PayloadPolicy;
use crate::generate::poll::PollPolicy;
use crate::generate::runway::RunwayConfig;
use crate::layout::engine::{LayoutEngine, LayoutParams};
use crate::media::runner::FfmpegRunner;
use crate::orchestrate::orchestrator::OrchestratorSettings;
use crate::orchestrate::workspace::RetentionPolicy;
use crate::render::compositor::{CompositeParams, CompositeRenderer};

/// External segmentation programs. With no `command`, photos are expected to carry their
/// own alpha channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CutoutConfig {
    /// Command line with `{input}` and `{output}` placeholders.
    pub command: Option<String>,
    /// Tried when the primary matte covers too little of the photo.
    pub rescue: Vec<String>,
    pub min_area_frac: f64,
    pub refine: bool,
}

impl Default for CutoutConfig {
    fn default() -> Self {
        Self {
            command: None,
            rescue: Vec::new(),
            min_area_frac: BestOfCutout::DEFAULT_MIN_AREA_FRAC,
            refine: true,
        }
    }
}

/// Whole-pipeline configuration. `{}` yields the production defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReelConfig {
    pub workspace_root: PathBuf,
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    pub layout: LayoutParams,
    pub composite: CompositeParams,
    pub assembly: AssemblyParams,
    /// Applied to free-tier videos.
    pub free_tier_watermark: WatermarkConfig,
    pub cutout: CutoutConfig,
    pub payload: PayloadPolicy,
    pub poll: PollPolicy,
    pub runway: RunwayConfig,
    pub retention: RetentionPolicy,
}

impl Default for ReelConfig {
    fn default() -> Self {
        Self {
            workspace_root: PathBuf::from("."),
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            layout: LayoutParams::default(),
            composite: CompositeParams::default(),
            assembly: AssemblyParams::default(),
            free_tier_watermark: WatermarkConfig::default(),
            cutout: CutoutConfig::default(),
            payload: PayloadPolicy::default(),
            poll: PollPolicy::default(),
            runway: RunwayConfig::default(),
            retention: RetentionPolicy::default(),
        }
    }
}

impl ReelConfig {
    pub fn from_json(s: &str) -> ReelResult<Self> {
        let cfg: Self = serde_json::from_str(s).map_err(|e| ReelError::serde(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: &Path) -> ReelResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> ReelResult<()> {
        self.layout.validate()?;
        self.free_tier_watermark.validate()?;
        if self.layout.canvas != self.assembly.canvas {
            return Err(ReelError::validation(format!(
                "layout canvas {}x{} differs from assembly canvas {}x{}",
                self.layout.canvas.width,
                self.layout.canvas.height,
                self.assembly.canvas.width,
                self.assembly.canvas.height
            )));
        }
        if !(self.assembly.crossfade_sec.is_finite() && self.assembly.crossfade_sec >= 0.0) {
            return Err(ReelError::validation("crossfade must be a non-negative number of seconds"));
        }
        if !(0.0..=4.0).contains(&self.assembly.music_volume) {
            return Err(ReelError::validation("music volume must be within 0..=4"));
        }
        Ok(())
    }

    pub fn orchestrator_settings(&self) -> ReelResult<OrchestratorSettings> {
        Ok(OrchestratorSettings {
            layout: LayoutEngine::new(self.layout.clone())?,
            compositor: CompositeRenderer::new(self.composite.clone()),
            assembly: self.assembly.clone(),
            payload: self.payload.clone(),
            poll: self.poll.clone(),
            retention: self.retention.clone(),
        })
    }

    /// `ffmpeg`/`ffprobe` runner that keeps its logs in `log_dir`.
    pub fn media_runner(&self, log_dir: &Path) -> FfmpegRunner {
        FfmpegRunner::new(&self.ffmpeg, &self.ffprobe).with_log_dir(log_dir)
    }

    /// Provider chain built from [`CutoutConfig`]; scratch files go to `work_dir`.
    pub fn cutout_provider(&self, work_dir: &Path) -> ReelResult<Arc<dyn CutoutProvider>> {
        let cfg = &self.cutout;
        let Some(command) = &cfg.command else {
            return Ok(Arc::new(AlphaPassthrough));
        };
        let primary: Vec<Box<dyn CutoutProvider>> = vec![Box::new(
            CommandCutoutProvider::from_command_line("primary", command, work_dir)?,
        )];
        let rescue = cfg
            .rescue
            .iter()
            .enumerate()
            .map(|(i, line)| {
                CommandCutoutProvider::from_command_line(format!("rescue-{i}"), line, work_dir)
                    .map(|p| Box::new(p) as Box<dyn CutoutProvider>)
            })
            .collect::<ReelResult<Vec<_>>>()?;
        Ok(Arc::new(
            BestOfCutout::new(primary)
                .with_rescue(rescue)
                .with_min_area_frac(cfg.min_area_frac)
                .with_refine(cfg.refine),
        ))
    }
}
