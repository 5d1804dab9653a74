//! Final video assembly: crossfade stitching and the overlay pipeline.
pub(crate) mod job;
pub(crate) mod overlay;
pub(crate) mod stitch;
