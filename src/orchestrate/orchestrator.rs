use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::assemble::job::{ClipRef, RenderJob};
use crate::assemble::overlay::{AssemblyParams, AssemblyReport, OverlayPipeline};
use crate::cutout::matte::Cutout;
use crate::cutout::provider::CutoutProvider;
use crate::effects::watermark::WatermarkConfig;
use crate::foundation::error::{ReelError, ReelResult, ServiceStatus, Stage};
use crate::foundation::naming::timestamped_name;
use crate::generate::payload::{PayloadPolicy, encode_start_frame};
use crate::generate::poll::{PollClock, PollPolicy, SystemClock, await_task};
use crate::generate::provider::{GenerationRequest, VideoGenerator};
use crate::layout::engine::{LayoutEngine, LayoutOverrides};
use crate::layout::framing::FramingMode;
use crate::layout::metrics::LayoutMetrics;
use crate::media::runner::MediaRunner;
use crate::orchestrate::locks::RenderLocks;
use crate::orchestrate::workspace::{RetentionPolicy, Workspace, cleanup_artifacts};
use crate::raster::decode::load_rgba;
use crate::render::compositor::CompositeRenderer;
use crate::title::plan::TitleSpec;

/// One animated scene: a start frame composed over `background`, then sent for generation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneRequest {
    pub key: String,
    pub background: PathBuf,
    pub prompt: String,
    pub duration_sec: u32,
    #[serde(default)]
    pub framing: FramingMode,
    #[serde(default)]
    pub overrides: LayoutOverrides,
}

/// Everything a user asked for in one video.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VideoRequest {
    pub user: String,
    /// One or two portrait photos.
    pub photos: Vec<PathBuf>,
    pub scenes: Vec<SceneRequest>,
    #[serde(default)]
    pub music: Option<PathBuf>,
    #[serde(default)]
    pub background_overlay: Option<PathBuf>,
    #[serde(default)]
    pub title: Option<TitleSpec>,
    #[serde(default)]
    pub decoration: Option<PathBuf>,
    /// Full-frame watermark for free-tier videos.
    #[serde(default)]
    pub watermark: Option<WatermarkConfig>,
}

impl VideoRequest {
    pub fn validate(&self) -> ReelResult<()> {
        if self.user.trim().is_empty() {
            return Err(ReelError::validation("request has no user id"));
        }
        if !(1..=2).contains(&self.photos.len()) {
            return Err(ReelError::validation(format!(
                "expected one or two photos, got {}",
                self.photos.len()
            )));
        }
        if self.scenes.is_empty() {
            return Err(ReelError::validation("no scenes selected"));
        }
        Ok(())
    }
}

/// A composed start frame on disk.
#[derive(Clone, Debug)]
pub struct PreparedFrame {
    pub path: PathBuf,
    pub metrics_path: PathBuf,
    pub metrics: LayoutMetrics,
    /// Human readable notes for the requester, e.g. a width mismatch.
    pub warnings: Vec<String>,
}

/// A scene that could not be produced; the rest of the video goes on without it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SceneFailure {
    pub scene: String,
    pub stage: Option<Stage>,
    pub message: String,
    pub remedy: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VideoOutcome {
    pub assembly: AssemblyReport,
    pub failures: Vec<SceneFailure>,
}

/// Stage settings for an [`Orchestrator`].
#[derive(Clone, Debug, Default)]
pub struct OrchestratorSettings {
    pub layout: LayoutEngine,
    pub compositor: CompositeRenderer,
    pub assembly: AssemblyParams,
    pub payload: PayloadPolicy,
    pub poll: PollPolicy,
    pub retention: RetentionPolicy,
}

/// Sequences cutout, layout, composite, generation and assembly for a request.
pub struct Orchestrator {
    cutout: Arc<dyn CutoutProvider>,
    generator: Arc<dyn VideoGenerator>,
    runner: Arc<dyn MediaRunner>,
    workspace: Workspace,
    settings: OrchestratorSettings,
    locks: RenderLocks,
}

impl Orchestrator {
    pub fn new(
        cutout: Arc<dyn CutoutProvider>,
        generator: Arc<dyn VideoGenerator>,
        runner: Arc<dyn MediaRunner>,
        workspace: Workspace,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            cutout,
            generator,
            runner,
            workspace,
            settings,
            locks: RenderLocks::new(),
        }
    }

    /// Share exclusion state with other orchestrators serving the same users.
    pub fn with_locks(mut self, locks: RenderLocks) -> Self {
        self.locks = locks;
        self
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn locks(&self) -> &RenderLocks {
        &self.locks
    }

    /// Cut out each photo, place the people and composite them over the scene background.
    ///
    /// The frame and its metrics are written into `scratch`, the calling job's own directory.
    #[tracing::instrument(skip(self, photos, scene, scratch), fields(scene = %scene.key, framing = %scene.framing))]
    pub fn prepare_start_frame(
        &self,
        photos: &[PathBuf],
        scene: &SceneRequest,
        scratch: &Path,
    ) -> ReelResult<PreparedFrame> {
        if !scene.background.is_file() {
            return Err(ReelError::validation(format!(
                "background '{}' not found",
                scene.background.display()
            )));
        }
        let cutouts = photos
            .iter()
            .map(|path| self.cut(path))
            .collect::<ReelResult<Vec<_>>>()?;
        let footprints: Vec<_> = cutouts.iter().map(Cutout::footprint).collect();

        let layout = &self.settings.layout;
        let spec = layout.framing(scene.framing, cutouts.len())?;
        let outcome = layout.place_with(&footprints, &spec, &scene.overrides)?;
        let background = load_rgba(&scene.background)?;
        let start = self.settings.compositor.render(&background, &cutouts, &outcome)?;

        let path = scratch.join(timestamped_name(&format!("start_{}", scene.key), "png"));
        let metrics_path = path.with_extension("json");
        start.save_png(&path)?;
        start.save_metrics_json(&metrics_path)?;

        let mut warnings = Vec::new();
        if let Some(ratio) = start.metrics.width_mismatch() {
            tracing::warn!(ratio, "photos differ strongly in width");
            warnings.push(format!(
                "The two photos differ a lot in width (x{ratio:.2}); the people may look \
                 different in size. Similar crops give a better result."
            ));
        }
        Ok(PreparedFrame {
            path,
            metrics_path,
            metrics: start.metrics,
            warnings,
        })
    }

    fn cut(&self, path: &Path) -> ReelResult<Cutout> {
        let photo = load_rgba(path)
            .map_err(|e| ReelError::validation(format!("photo '{}': {e}", path.display())))?;
        let image = self.cutout.cut(&photo)?;
        Cutout::new(image, Some(path.to_path_buf()))
    }

    pub fn generate_scene(&self, frame: &PreparedFrame, scene: &SceneRequest) -> ReelResult<ClipRef> {
        self.generate_scene_with(frame, scene, &mut SystemClock::start())
    }

    /// Upload the start frame, wait for the task and download the first output.
    #[tracing::instrument(skip(self, frame, scene, clock), fields(scene = %scene.key))]
    pub fn generate_scene_with(
        &self,
        frame: &PreparedFrame,
        scene: &SceneRequest,
        clock: &mut dyn PollClock,
    ) -> ReelResult<ClipRef> {
        let payload = encode_start_frame(&frame.path, &self.settings.payload)?;
        let request = GenerationRequest {
            image_data_uri: payload.data_uri,
            prompt: scene.prompt.clone(),
            duration_sec: scene.duration_sec,
        };
        let task = self.generator.start(&request)?;
        let outputs = await_task(self.generator.as_ref(), &task, &self.settings.poll, clock)?;
        let url = outputs
            .first()
            .ok_or_else(|| {
                ReelError::service(
                    Stage::Generation,
                    ServiceStatus::NoOutput,
                    format!("task {} finished without outputs", task.id),
                )
            })?;
        let dest = self.workspace.render_path(&format!("scene_{}", scene.key), "mp4");
        self.generator.download(url, &dest)?;
        Ok(ClipRef::new(dest, f64::from(scene.duration_sec)))
    }

    /// Assemble the clips into the final video, then drop `scratch` and apply retention.
    #[tracing::instrument(skip(self, request, clips, scratch), fields(user = %request.user, clips = clips.len()))]
    pub fn finalize(
        &self,
        request: &VideoRequest,
        clips: Vec<ClipRef>,
        scratch: &Path,
    ) -> ReelResult<AssemblyReport> {
        let job = RenderJob {
            clips,
            background_overlay: request.background_overlay.clone(),
            music: request.music.clone(),
            title: request.title.clone(),
            decoration: request.decoration.clone(),
            watermark: request.watermark.clone(),
            output: self
                .workspace
                .render_path(&format!("{}_final", file_safe(&request.user)), "mp4"),
        };
        let pipeline = OverlayPipeline::new(self.runner.clone(), self.settings.assembly.clone());
        let result = pipeline.run(&job, scratch);
        self.cleanup(scratch);
        result
    }

    fn cleanup(&self, scratch: &Path) {
        if let Err(e) = cleanup_artifacts(&self.workspace, &self.settings.retention, scratch) {
            tracing::warn!(error = %e, "cleanup failed");
        }
    }

    /// Whole request under the per-user lock. Failed scenes are skipped; if none succeed
    /// the last scene error is returned.
    #[tracing::instrument(skip(self, request), fields(user = %request.user, scenes = request.scenes.len()))]
    pub fn run(&self, request: &VideoRequest) -> ReelResult<VideoOutcome> {
        request.validate()?;
        let _lease = self.locks.try_acquire(&request.user)?;
        self.workspace.ensure()?;
        let scratch = self.workspace.job_temp(&file_safe(&request.user));

        let mut clips = Vec::new();
        let mut failures = Vec::new();
        let mut last_error = None;
        for scene in &request.scenes {
            let produced = self
                .prepare_start_frame(&request.photos, scene, &scratch)
                .and_then(|frame| self.generate_scene(&frame, scene));
            match produced {
                Ok(clip) => clips.push(clip),
                Err(e) => {
                    tracing::warn!(
                        scene = %scene.key,
                        stage = ?e.stage(),
                        remedy = e.remedy(),
                        error = %e,
                        "scene skipped"
                    );
                    failures.push(SceneFailure {
                        scene: scene.key.clone(),
                        stage: e.stage(),
                        message: e.to_string(),
                        remedy: e.remedy().to_string(),
                    });
                    last_error = Some(e);
                }
            }
        }
        if clips.is_empty() {
            self.cleanup(&scratch);
            return Err(last_error.unwrap_or_else(|| ReelError::validation("no scenes produced")));
        }

        let assembly = self.finalize(request, clips, &scratch)?;
        Ok(VideoOutcome { assembly, failures })
    }
}

/// Keep ASCII alphanumerics, `-` and `_` so a user id can prefix a file name.
fn file_safe(s: &str) -> String {
    let cleaned: String = s
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "user".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
#[path = "../../tests/unit/orchestrate/orchestrator.rs"]
mod tests;
