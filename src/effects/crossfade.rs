use std::path::Path;

use crate::foundation::core::Fps;
use crate::foundation::math::fmt_num;
use crate::media::command::{EncodeProfile, FfmpegCommand};
use crate::media::graph::{Filter, FilterChain, FilterGraph, Pad};

/// Time in the left clip where the dissolve starts.
pub fn crossfade_offset(left_duration: f64, fade: f64) -> f64 {
    (left_duration - fade).max(0.0)
}

/// Duration after folding `durations` left-to-right with a dissolve of `fade` seconds.
///
/// Each fold yields `offset + right`, so for clips longer than the fade this is
/// `Σd − (N−1)·fade`.
pub fn chained_duration(durations: &[f64], fade: f64) -> f64 {
    let mut iter = durations.iter().copied();
    let Some(first) = iter.next() else {
        return 0.0;
    };
    iter.fold(first, |acc, d| crossfade_offset(acc, fade) + d)
}

/// Normalize both inputs to `fps`/yuv420p and dissolve the tail of input 0 into input 1.
pub fn crossfade_graph(offset: f64, fade: f64, fps: Fps) -> FilterGraph {
    let normalize = |index: usize, label: &str| {
        FilterChain::new([Pad::video(index)])
            .then(Filter::new("fps").arg(fps))
            .then(Filter::new("format").arg("yuv420p"))
            .to([Pad::new(label)])
    };
    FilterGraph::new()
        .with(normalize(0, "v0"))
        .with(normalize(1, "v1"))
        .with(
            FilterChain::new([Pad::new("v0"), Pad::new("v1")])
                .then(
                    Filter::new("xfade")
                        .kv("transition", "fade")
                        .kv("duration", fmt_num(fade))
                        .kv("offset", fmt_num(offset)),
                )
                .then(Filter::new("format").arg("yuv420p"))
                .to([Pad::new("v")]),
        )
}

/// Video-only crossfade of two files; audio is added once at the end of the pipeline.
pub fn crossfade_command(
    left: &Path,
    right: &Path,
    output: &Path,
    offset: f64,
    fade: f64,
    profile: &EncodeProfile,
) -> FfmpegCommand {
    FfmpegCommand::new("xfade", output)
        .input(left)
        .input(right)
        .filter_graph(crossfade_graph(offset, fade, profile.fps))
        .map("[v]")
        .no_audio()
        .rate(profile.fps)
        .encode_video(profile)
        .faststart()
}

#[cfg(test)]
#[path = "../../tests/unit/effects/crossfade.rs"]
mod tests;
