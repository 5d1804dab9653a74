use std::path::Path;

use crate::assemble::job::ClipRef;
use crate::effects::crossfade::{chained_duration, crossfade_command, crossfade_offset};
use crate::foundation::error::{ReelError, ReelResult, Stage};
use crate::foundation::naming::unique_suffix;
use crate::media::command::EncodeProfile;
use crate::media::runner::MediaRunner;

/// Folds clips left-to-right with a dissolve between each pair.
#[derive(Clone, Debug)]
pub struct SegmentStitcher {
    fade_sec: f64,
    profile: EncodeProfile,
}

impl SegmentStitcher {
    pub fn new(fade_sec: f64, profile: EncodeProfile) -> Self {
        Self { fade_sec, profile }
    }

    /// Expected duration of the stitched result from declared durations.
    pub fn planned_duration(&self, clips: &[ClipRef]) -> f64 {
        let durations: Vec<f64> = clips.iter().map(|c| c.duration_sec).collect();
        chained_duration(&durations, self.fade_sec)
    }

    /// Stitch `clips` into one file under `temp_dir`. A single clip is returned unchanged.
    #[tracing::instrument(skip(self, runner, clips), fields(clips = clips.len()))]
    pub fn stitch(
        &self,
        runner: &dyn MediaRunner,
        clips: &[ClipRef],
        temp_dir: &Path,
    ) -> ReelResult<ClipRef> {
        let (first, rest) = clips
            .split_first()
            .ok_or_else(|| ReelError::validation("nothing to stitch"))?;
        let mut acc = first.clone();
        for (i, next) in rest.iter().enumerate() {
            let left = self.measured_duration(runner, &acc);
            let offset = crossfade_offset(left, self.fade_sec);
            let out = temp_dir.join(format!("xfade_{}_{}.mp4", i + 1, unique_suffix()));
            let cmd = crossfade_command(
                &acc.path,
                &next.path,
                &out,
                offset,
                self.fade_sec,
                &self.profile,
            );
            runner.run(Stage::Stitch, &cmd)?;
            tracing::debug!(step = i + 1, left, offset, out = %out.display(), "crossfade");
            acc = ClipRef::new(out, offset + next.duration_sec);
        }
        Ok(acc)
    }

    /// Probed duration, or the declared one when probing fails.
    fn measured_duration(&self, runner: &dyn MediaRunner, clip: &ClipRef) -> f64 {
        match runner.probe(&clip.path) {
            Ok(info) => info.duration_sec.unwrap_or(clip.duration_sec),
            Err(e) => {
                tracing::warn!(
                    clip = %clip.path.display(),
                    error = %e,
                    fallback = clip.duration_sec,
                    "probe failed, using declared duration"
                );
                clip.duration_sec
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assemble/stitch.rs"]
mod tests;
