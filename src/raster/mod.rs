//! CPU raster primitives: premultiplied frames, blending, blur and image decoding.
pub(crate) mod blur;
pub(crate) mod composite;
pub(crate) mod decode;
pub(crate) mod frame;
