use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::foundation::core::Canvas;
use crate::foundation::math::fmt_num;
use crate::media::command::{EncodeProfile, FfmpegCommand};
use crate::media::graph::{Filter, FilterChain, FilterGraph, Pad};

/// Slowly panning, heavily blurred, faint copy of the background laid over the whole video.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbientBackground {
    pub blur_radius: u32,
    pub blur_power: u32,
    pub alpha: f64,
    /// Horizontal drift in pixels per second.
    pub pan_px_per_sec: f64,
}

impl Default for AmbientBackground {
    fn default() -> Self {
        Self {
            blur_radius: 25,
            blur_power: 1,
            alpha: 0.08,
            pan_px_per_sec: 2.0,
        }
    }
}

impl AmbientBackground {
    pub fn graph(&self, canvas: Canvas) -> FilterGraph {
        FilterGraph::new()
            .with(
                FilterChain::new([Pad::video(1)])
                    .then(Filter::new("scale").arg(canvas.width).arg(canvas.height))
                    .then(
                        Filter::new("boxblur")
                            .arg(self.blur_radius)
                            .arg(self.blur_power),
                    )
                    .then(Filter::new("format").arg("rgba"))
                    .then(Filter::new("colorchannelmixer").kv("aa", fmt_num(self.alpha)))
                    .then(Filter::new("setsar").arg(1))
                    .to([Pad::new("ov")]),
            )
            .with(
                FilterChain::new([Pad::video(0), Pad::new("ov")])
                    .then(
                        Filter::new("overlay")
                            .kv("x", format!("'t*{}'", fmt_num(self.pan_px_per_sec)))
                            .kv("y", 0)
                            .kv("shortest", 1),
                    )
                    .then(Filter::new("format").arg("yuv420p"))
                    .to([Pad::new("v")]),
            )
    }

    /// Overlay `image` on `input`, keeping the input's audio if it has any.
    pub fn command(
        &self,
        input: &Path,
        image: &Path,
        output: &Path,
        canvas: Canvas,
        profile: &EncodeProfile,
    ) -> FfmpegCommand {
        FfmpegCommand::new("bg_overlay", output)
            .input(input)
            .looped_image(image)
            .filter_graph(self.graph(canvas))
            .map("[v]")
            .map("0:a?")
            .encode_video(profile)
            .args(["-c:a", "copy"])
            .faststart()
    }
}
