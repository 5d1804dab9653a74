//! Start-frame layout: where one or two cutouts go on the canvas.
//!
//! Layout is pure geometry over [`geometry::Footprint`]s (image size plus visible bbox). No pixels
//! are touched here; the compositor resizes each cutout exactly once using the chosen scale.
pub(crate) mod engine;
pub(crate) mod framing;
pub(crate) mod geometry;
pub(crate) mod metrics;
pub(crate) mod pair;
pub(crate) mod single;
