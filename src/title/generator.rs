use std::path::{Path, PathBuf};

use crate::effects::watermark::CornerWatermark;
use crate::foundation::core::Canvas;
use crate::foundation::error::{ReelResult, Stage};
use crate::media::command::{EncodeProfile, FfmpegCommand};
use crate::media::runner::MediaRunner;
use crate::raster::decode::load_rgba;
use crate::title::fit::TextMeasure;
use crate::title::fonts::{FontConfig, FontSet, ParleyText};
use crate::title::paint::paint_card;
use crate::title::plan::{CardPlan, TitleParams, TitleSpec, plan_memorial_card, plan_plain_title};

/// Renders the closing card and turns it into a short clip.
#[derive(Clone, Debug, Default)]
pub struct TitleCardGenerator {
    pub canvas: Canvas,
    pub params: TitleParams,
    pub fonts: FontConfig,
    pub profile: EncodeProfile,
}

impl TitleCardGenerator {
    pub fn new(canvas: Canvas, params: TitleParams, fonts: FontConfig, profile: EncodeProfile) -> Self {
        Self {
            canvas,
            params,
            fonts,
            profile,
        }
    }

    pub fn plan(
        &self,
        measure: &mut dyn TextMeasure,
        spec: &TitleSpec,
        decoration: Option<(u32, u32)>,
        safe_top: u32,
    ) -> ReelResult<CardPlan> {
        match spec {
            TitleSpec::Plain { text } => plan_plain_title(measure, self.canvas, text, &self.params),
            TitleSpec::Memorial(m) => {
                plan_memorial_card(measure, self.canvas, m, decoration, safe_top, &self.params)
            }
        }
    }

    /// Paint the still to `out`. An unreadable decoration is dropped with a warning.
    #[tracing::instrument(skip(self, spec, corner), fields(out = %out.display()))]
    pub fn render_still(
        &self,
        spec: &TitleSpec,
        decoration: Option<&Path>,
        corner: Option<&CornerWatermark>,
        out: &Path,
    ) -> ReelResult<CardPlan> {
        let fonts = FontSet::resolve(&self.fonts)?;
        let mut text = ParleyText::new(&fonts)?;
        let decoration = match (spec, decoration) {
            (TitleSpec::Memorial(_), Some(path)) => match load_rgba(path) {
                Ok(img) => Some(img),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "decoration skipped");
                    None
                }
            },
            _ => None,
        };
        let safe_top = corner.map_or(0, CornerWatermark::safe_top_px);
        let plan = self.plan(
            &mut text,
            spec,
            decoration.as_ref().map(|d| d.dimensions()),
            safe_top,
        )?;
        let frame = paint_card(&plan, &mut text, decoration.as_ref())?;
        frame.save_png(out)?;
        Ok(plan)
    }

    /// Fixed-length clip of a still at the pipeline frame rate.
    pub fn clip_command(&self, still: &Path, out: &Path) -> FfmpegCommand {
        FfmpegCommand::new("title_video", out)
            .looped_image(still)
            .duration(self.params.duration_sec)
            .rate(self.profile.fps)
            .encode_video(&self.profile)
            .faststart()
    }

    /// Still plus clip; returns the clip path.
    pub fn generate(
        &self,
        runner: &dyn MediaRunner,
        spec: &TitleSpec,
        decoration: Option<&Path>,
        corner: Option<&CornerWatermark>,
        still: &Path,
        clip: &Path,
    ) -> ReelResult<PathBuf> {
        self.render_still(spec, decoration, corner, still)?;
        runner.run(Stage::Title, &self.clip_command(still, clip))?;
        Ok(clip.to_path_buf())
    }
}
