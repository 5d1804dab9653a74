use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::assemble::job::RenderJob;
use crate::assemble::stitch::SegmentStitcher;
use crate::effects::ambient::AmbientBackground;
use crate::effects::watermark::{CornerWatermark, FullFrameWatermark};
use crate::foundation::core::Canvas;
use crate::foundation::error::{ReelError, ReelResult, Stage};
use crate::foundation::math::fmt_num;
use crate::foundation::naming::unique_suffix;
use crate::media::command::{EncodeProfile, FfmpegCommand};
use crate::media::graph::Filter;
use crate::media::runner::{MediaRunner, ensure_parent_dir};
use crate::title::fonts::FontConfig;
use crate::title::generator::TitleCardGenerator;
use crate::title::plan::TitleParams;

/// Tunables for the assembly stages. `{}` deserializes to the production defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyParams {
    pub canvas: Canvas,
    pub crossfade_sec: f64,
    pub music_volume: f64,
    pub profile: EncodeProfile,
    pub ambient: AmbientBackground,
    /// `None` disables the corner mark entirely.
    pub corner_watermark: Option<CornerWatermark>,
    pub full_watermark_image: PathBuf,
    pub title: TitleParams,
    pub fonts: FontConfig,
}

impl Default for AssemblyParams {
    fn default() -> Self {
        Self {
            canvas: Canvas::default(),
            crossfade_sec: 0.7,
            music_volume: 0.6,
            profile: EncodeProfile::default(),
            ambient: AmbientBackground::default(),
            corner_watermark: Some(CornerWatermark::default()),
            full_watermark_image: PathBuf::from("assets/watermark_full.png"),
            title: TitleParams::default(),
            fonts: FontConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum StageOutcome {
    Applied,
    /// The stage produced output through its fallback path.
    Fallback { reason: String },
    Skipped { reason: String },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StageRecord {
    pub stage: Stage,
    #[serde(flatten)]
    pub outcome: StageOutcome,
}

/// What each stage did, in execution order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AssemblyReport {
    pub output: PathBuf,
    /// Stitched clips plus the title clip, from declared durations.
    pub planned_duration_sec: f64,
    pub stages: Vec<StageRecord>,
}

impl AssemblyReport {
    fn new(output: PathBuf) -> Self {
        Self {
            output,
            planned_duration_sec: 0.0,
            stages: Vec::new(),
        }
    }

    fn record(&mut self, stage: Stage, outcome: StageOutcome) {
        self.stages.push(StageRecord { stage, outcome });
    }

    pub fn outcome(&self, stage: Stage) -> Option<&StageOutcome> {
        self.stages
            .iter()
            .find(|r| r.stage == stage)
            .map(|r| &r.outcome)
    }
}

/// Turns a [`RenderJob`] into the final video.
///
/// Stages run in order, each consuming the previous output: stitch, title, concat,
/// ambient background, corner watermark, full-frame watermark, music mux. Optional
/// stages that fail are skipped with a warning; concat falls back to a re-encode once;
/// the mux is fatal.
#[derive(Clone)]
pub struct OverlayPipeline {
    runner: Arc<dyn MediaRunner>,
    params: AssemblyParams,
}

impl OverlayPipeline {
    pub fn new(runner: Arc<dyn MediaRunner>, params: AssemblyParams) -> Self {
        Self { runner, params }
    }

    pub fn params(&self) -> &AssemblyParams {
        &self.params
    }

    #[tracing::instrument(
        skip(self, job),
        fields(clips = job.clips.len(), output = %job.output.display())
    )]
    pub fn run(&self, job: &RenderJob, temp_dir: &Path) -> ReelResult<AssemblyReport> {
        job.validate()?;
        std::fs::create_dir_all(temp_dir)
            .with_context(|| format!("create temp dir '{}'", temp_dir.display()))?;
        let runner = self.runner.as_ref();
        let tmp = TempNames::new(temp_dir);
        let mut report = AssemblyReport::new(job.output.clone());

        let stitcher = SegmentStitcher::new(self.params.crossfade_sec, self.params.profile.clone());
        let stitched = stitcher.stitch(runner, &job.clips, temp_dir)?;
        report.planned_duration_sec = stitcher.planned_duration(&job.clips);
        report.record(
            Stage::Stitch,
            if job.clips.len() > 1 {
                StageOutcome::Applied
            } else {
                StageOutcome::Skipped {
                    reason: "single clip".to_string(),
                }
            },
        );

        let mut segments = vec![stitched.path];
        match self.title_clip(job, &tmp) {
            Ok(Some(clip)) => {
                segments.push(clip);
                report.planned_duration_sec += self.params.title.duration_sec;
                report.record(Stage::Title, StageOutcome::Applied);
            }
            Ok(None) => report.record(Stage::Title, not_requested()),
            Err(e) => {
                tracing::warn!(error = %e, "title card skipped");
                report.record(
                    Stage::Title,
                    StageOutcome::Skipped {
                        reason: e.to_string(),
                    },
                );
            }
        }

        let mut current = self.concat(&segments, &tmp, &mut report)?;

        current = optional_stage(&mut report, Stage::AmbientBackground, current, |input| {
            let Some(image) = &job.background_overlay else {
                return Ok(None);
            };
            let out = tmp.file("with_bg_anim", "mp4");
            let cmd = self.params.ambient.command(
                input,
                image,
                &out,
                self.params.canvas,
                &self.params.profile,
            );
            runner.run(Stage::AmbientBackground, &cmd)?;
            Ok(Some(out))
        });

        current = optional_stage(&mut report, Stage::CornerWatermark, current, |input| {
            let Some(corner) = self.params.corner_watermark.as_ref() else {
                return Ok(None);
            };
            if !corner.path.is_file() {
                tracing::debug!(path = %corner.path.display(), "corner watermark image missing");
                return Ok(None);
            }
            let out = tmp.file("with_corner", "mp4");
            runner.run(
                Stage::CornerWatermark,
                &corner.command(input, &out, &self.params.profile),
            )?;
            Ok(Some(out))
        });

        current = optional_stage(&mut report, Stage::FullWatermark, current, |input| {
            let Some(config) = &job.watermark else {
                return Ok(None);
            };
            let mark_path = &self.params.full_watermark_image;
            let mark = image::image_dimensions(mark_path).map_err(|e| {
                ReelError::media(
                    Stage::FullWatermark,
                    format!("watermark image '{}': {e}", mark_path.display()),
                )
            })?;
            let frame = self.frame_size(input);
            let out = tmp.file("with_watermark", "mp4");
            let cmd = FullFrameWatermark::new(mark_path, config.clone()).command(
                input,
                &out,
                frame,
                mark,
                &self.params.profile,
            )?;
            runner.run(Stage::FullWatermark, &cmd)?;
            Ok(Some(out))
        });

        self.finish(job, &current, &tmp, &mut report)?;
        tracing::info!(
            output = %job.output.display(),
            planned_sec = report.planned_duration_sec,
            "assembly finished"
        );
        Ok(report)
    }

    fn title_clip(&self, job: &RenderJob, tmp: &TempNames) -> ReelResult<Option<PathBuf>> {
        let Some(spec) = &job.title else {
            return Ok(None);
        };
        let generator = TitleCardGenerator::new(
            self.params.canvas,
            self.params.title.clone(),
            self.params.fonts.clone(),
            self.params.profile.clone(),
        );
        let clip = generator.generate(
            self.runner.as_ref(),
            spec,
            job.decoration.as_deref(),
            self.params.corner_watermark.as_ref(),
            &tmp.file("title", "png"),
            &tmp.file("title_video", "mp4"),
        )?;
        Ok(Some(clip))
    }

    /// Byte-copy concat first, full re-encode if the copy is rejected.
    fn concat(
        &self,
        segments: &[PathBuf],
        tmp: &TempNames,
        report: &mut AssemblyReport,
    ) -> ReelResult<PathBuf> {
        let [first, rest @ ..] = segments else {
            return Err(ReelError::validation("nothing to concatenate"));
        };
        if rest.is_empty() {
            report.record(
                Stage::Concat,
                StageOutcome::Skipped {
                    reason: "nothing to append".to_string(),
                },
            );
            return Ok(first.clone());
        }

        let list = tmp.file("concat_list", "txt");
        write_concat_list(segments, &list)?;
        let out = tmp.file("concat_video", "mp4");
        let copy = FfmpegCommand::new("concat_copy", &out)
            .concat_list(&list)
            .copy_streams()
            .faststart();
        match self.runner.run(Stage::Concat, &copy) {
            Ok(()) => report.record(Stage::Concat, StageOutcome::Applied),
            Err(e) => {
                tracing::warn!(error = %e, "concat copy failed, re-encoding");
                let profile = &self.params.profile;
                let reencode = FfmpegCommand::new("concat_reencode", &out)
                    .concat_list(&list)
                    .rate(profile.fps)
                    .encode_video(profile)
                    .encode_audio(profile)
                    .faststart();
                self.runner.run(Stage::Concat, &reencode)?;
                report.record(
                    Stage::Concat,
                    StageOutcome::Fallback {
                        reason: e.to_string(),
                    },
                );
            }
        }
        Ok(out)
    }

    /// Mux looped music, or remux for progressive playback when there is none.
    fn finish(
        &self,
        job: &RenderJob,
        current: &Path,
        tmp: &TempNames,
        report: &mut AssemblyReport,
    ) -> ReelResult<()> {
        ensure_parent_dir(&job.output)?;
        if let Some(music) = &job.music {
            self.runner
                .run(Stage::Mux, &self.music_command(music, current, &job.output))?;
            report.record(Stage::Mux, StageOutcome::Applied);
            return Ok(());
        }

        let fast = tmp.file("faststart", "mp4");
        let remux = FfmpegCommand::new("faststart_copy", &fast)
            .input(current)
            .copy_streams()
            .faststart();
        let (source, outcome) = match self.runner.run(Stage::Mux, &remux) {
            Ok(()) => (fast.as_path(), StageOutcome::Applied),
            Err(e) => {
                tracing::warn!(error = %e, "faststart pass failed, copying as is");
                (
                    current,
                    StageOutcome::Fallback {
                        reason: e.to_string(),
                    },
                )
            }
        };
        std::fs::copy(source, &job.output).map_err(|e| {
            ReelError::media(
                Stage::Mux,
                format!(
                    "copy '{}' to '{}': {e}",
                    source.display(),
                    job.output.display()
                ),
            )
        })?;
        report.record(Stage::Mux, outcome);
        Ok(())
    }

    pub fn music_command(&self, music: &Path, video: &Path, output: &Path) -> FfmpegCommand {
        let profile = &self.params.profile;
        FfmpegCommand::new("mux_music", output)
            .stream_loop(music)
            .input(video)
            .map("1:v")
            .map("0:a")
            .args(["-c:v", "copy", "-c:a", profile.audio_codec.as_str()])
            .args(["-ar".to_string(), profile.audio_sample_rate.to_string()])
            .shortest()
            .args([
                "-af".to_string(),
                Filter::new("volume")
                    .arg(fmt_num(self.params.music_volume))
                    .to_string(),
            ])
            .faststart()
    }

    /// Probed frame size, or the canvas when the probe is inconclusive.
    fn frame_size(&self, video: &Path) -> (u32, u32) {
        let canvas = self.params.canvas;
        match self.runner.probe(video) {
            Ok(info) => (
                info.width.unwrap_or(canvas.width),
                info.height.unwrap_or(canvas.height),
            ),
            Err(e) => {
                tracing::debug!(error = %e, "probe failed, assuming canvas size");
                (canvas.width, canvas.height)
            }
        }
    }
}

impl std::fmt::Debug for OverlayPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayPipeline")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

fn not_requested() -> StageOutcome {
    StageOutcome::Skipped {
        reason: "not requested".to_string(),
    }
}

/// Run an optional stage: `Ok(None)` means not requested; errors are logged and skipped.
fn optional_stage(
    report: &mut AssemblyReport,
    stage: Stage,
    input: PathBuf,
    f: impl FnOnce(&Path) -> ReelResult<Option<PathBuf>>,
) -> PathBuf {
    match f(&input) {
        Ok(Some(out)) => {
            report.record(stage, StageOutcome::Applied);
            out
        }
        Ok(None) => {
            report.record(stage, not_requested());
            input
        }
        Err(e) => {
            tracing::warn!(%stage, error = %e, "stage skipped");
            report.record(
                stage,
                StageOutcome::Skipped {
                    reason: e.to_string(),
                },
            );
            input
        }
    }
}

/// `file '<absolute path>'` with single quotes escaped for the concat demuxer.
pub fn concat_list_entry(path: &Path) -> ReelResult<String> {
    let abs = std::path::absolute(path)
        .with_context(|| format!("resolve '{}'", path.display()))?;
    let escaped = abs.to_string_lossy().replace('\'', r"'\''");
    Ok(format!("file '{escaped}'"))
}

pub fn write_concat_list(paths: &[PathBuf], list: &Path) -> ReelResult<()> {
    let mut body = String::new();
    for p in paths {
        body.push_str(&concat_list_entry(p)?);
        body.push('\n');
    }
    ensure_parent_dir(list)?;
    std::fs::write(list, body).with_context(|| format!("write '{}'", list.display()))?;
    Ok(())
}

/// Per-run file names in the temp dir, so concurrent jobs never collide.
struct TempNames {
    dir: PathBuf,
    suffix: String,
}

impl TempNames {
    fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            suffix: unique_suffix(),
        }
    }

    fn file(&self, stem: &str, ext: &str) -> PathBuf {
        self.dir.join(format!("{stem}_{}.{ext}", self.suffix))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assemble/overlay.rs"]
mod tests;
