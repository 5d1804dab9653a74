//! Start-frame compositing: background, shadows, cutouts and floor fog.
pub(crate) mod compositor;
pub(crate) mod debug;
