//! Filter graphs for each video effect, independent of ffmpeg execution.
pub(crate) mod ambient;
pub(crate) mod crossfade;
pub(crate) mod watermark;
